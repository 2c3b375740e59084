//! Lecture catalog: the classes, chapters and subtopics offered in the menu.
//!
//! Stored as TOML in the config directory and edited by hand:
//!
//! ```toml
//! [[class]]
//! name = "Algebra"
//!
//! [[class.chapter]]
//! name = "Quadratics"
//! subtopics = ["Main", "Factoring"]
//! ```

use crate::{AppError, AppResult};

use class_recorder_core::DEFAULT_SUBTOPIC;

use std::{fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// One chapter and its subtopics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogChapter {
    /// Chapter name.
    pub name: String,
    /// Subtopic names; never empty once normalized.
    #[serde(default)]
    pub subtopics: Vec<String>,
}

/// One class and its chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogClass {
    /// Class name.
    pub name: String,
    /// Chapters in menu order.
    #[serde(default, rename = "chapter")]
    pub chapters: Vec<CatalogChapter>,
}

/// Operator-maintained list of lectures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Classes in menu order.
    #[serde(default, rename = "class")]
    pub classes: Vec<CatalogClass>,
}

impl Catalog {
    /// Parse and normalize catalog TOML.
    #[track_caller]
    pub fn parse(contents: &str) -> AppResult<Self> {
        let catalog: Catalog = toml::from_str(contents)
            .map_err(|e| AppError::config(format!("Failed to parse catalog: {}", e)))?;
        Ok(catalog.normalized())
    }

    /// Read the catalog at `path`, writing an empty one first if it is missing.
    #[track_caller]
    #[instrument]
    pub fn load_or_create(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            info!(path = ?path, "No catalog found, creating an empty one");
            let catalog = Catalog::default();
            catalog.save(path)?;
            return Ok(catalog);
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read catalog: {}", e)))?;
        let catalog = Self::parse(&contents)?;

        info!(path = ?path, classes = catalog.classes.len(), "Catalog loaded");

        Ok(catalog)
    }

    /// Save using the temp-file-then-rename pattern.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AppError::config(format!("Failed to serialize catalog: {}", e)))?;

        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path)
            .map_err(|e| AppError::config(format!("Failed to create temp catalog file: {}", e)))?;
        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::config(format!("Failed to write temp catalog file: {}", e)))?;
        temp_file
            .sync_all()
            .map_err(|e| AppError::config(format!("Failed to sync temp catalog file: {}", e)))?;

        fs::rename(&temp_path, path).map_err(|e| {
            AppError::config(format!("Failed to rename temp catalog to final: {}", e))
        })?;

        info!(path = ?path, "Catalog saved (atomic write)");

        Ok(())
    }

    /// Trim names, drop blanks and repeats, and give every chapter at least
    /// the default subtopic.
    pub fn normalized(self) -> Self {
        let mut classes: Vec<CatalogClass> = Vec::new();

        for class in self.classes {
            let name = class.name.trim().to_string();
            if name.is_empty() {
                warn!("Skipping class with an empty name");
                continue;
            }
            if classes.iter().any(|c| c.name == name) {
                warn!(class = %name, "Skipping repeated class");
                continue;
            }

            let mut chapters: Vec<CatalogChapter> = Vec::new();
            for chapter in class.chapters {
                let chapter_name = chapter.name.trim().to_string();
                if chapter_name.is_empty() || chapters.iter().any(|c| c.name == chapter_name) {
                    warn!(class = %name, chapter = %chapter_name, "Skipping blank or repeated chapter");
                    continue;
                }

                let mut subtopics: Vec<String> = Vec::new();
                for subtopic in chapter.subtopics {
                    let subtopic = subtopic.trim().to_string();
                    if !subtopic.is_empty() && !subtopics.contains(&subtopic) {
                        subtopics.push(subtopic);
                    }
                }
                if subtopics.is_empty() {
                    subtopics.push(DEFAULT_SUBTOPIC.to_string());
                }

                chapters.push(CatalogChapter {
                    name: chapter_name,
                    subtopics,
                });
            }

            classes.push(CatalogClass { name, chapters });
        }

        Catalog { classes }
    }

    /// Class names in menu order.
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }

    /// Chapter names of `class`; empty for unknown classes.
    pub fn chapter_names(&self, class: &str) -> Vec<&str> {
        self.class(class)
            .map(|c| c.chapters.iter().map(|ch| ch.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Subtopics of `class`/`chapter`, or just the default subtopic when the
    /// chapter is unknown.
    pub fn subtopic_names(&self, class: &str, chapter: &str) -> Vec<&str> {
        self.chapter(class, chapter)
            .map(|ch| ch.subtopics.iter().map(String::as_str).collect())
            .unwrap_or_else(|| vec![DEFAULT_SUBTOPIC])
    }

    fn class(&self, class: &str) -> Option<&CatalogClass> {
        self.classes.iter().find(|c| c.name == class)
    }

    fn chapter(&self, class: &str, chapter: &str) -> Option<&CatalogChapter> {
        self.class(class)?.chapters.iter().find(|ch| ch.name == chapter)
    }
}
