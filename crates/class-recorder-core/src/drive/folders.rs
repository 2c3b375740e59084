use crate::{CoreError, CoreResult, drive::DriveApi};

use std::fmt;

use tracing::{debug, info, instrument, warn};

/// Subtopic used when the operator has not picked one.
pub const DEFAULT_SUBTOPIC: &str = "Main";

/// Class, chapter and subtopic names of one lecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath {
    /// Class name, e.g. `"Algebra"`.
    pub class: String,
    /// Chapter name within the class.
    pub chapter: String,
    /// Subtopic name within the chapter.
    pub subtopic: String,
}

impl FolderPath {
    /// Build a path from its three names.
    pub fn new(
        class: impl Into<String>,
        chapter: impl Into<String>,
        subtopic: impl Into<String>,
    ) -> Self {
        Self {
            class: class.into(),
            chapter: chapter.into(),
            subtopic: subtopic.into(),
        }
    }

    /// Names in nesting order.
    pub fn segments(&self) -> [&str; 3] {
        [&self.class, &self.chapter, &self.subtopic]
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.class, self.chapter, self.subtopic)
    }
}

/// Drive folder ids for a resolved [`FolderPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolders {
    /// Root folder the chain hangs from.
    pub root_id: String,
    /// Ids of the class, chapter and subtopic folders.
    pub chain: [String; 3],
}

impl ResolvedFolders {
    /// Class folder id.
    pub fn class_id(&self) -> &str {
        &self.chain[0]
    }

    /// Chapter folder id.
    pub fn chapter_id(&self) -> &str {
        &self.chain[1]
    }

    /// Innermost (subtopic) folder id.
    pub fn leaf(&self) -> &str {
        &self.chain[2]
    }
}

/// Looks up or creates the class/chapter/subtopic folder chain.
pub struct FolderResolver<'a> {
    drive: &'a dyn DriveApi,
}

impl<'a> FolderResolver<'a> {
    /// Resolver over `drive`.
    pub fn new(drive: &'a dyn DriveApi) -> Self {
        Self { drive }
    }

    /// Resolve `path` under `root_id`, creating missing folders.
    ///
    /// Resolving the same path twice yields the same ids; folders are only
    /// created when absent. Folders created before a failure are left in
    /// place and reused by the next attempt.
    ///
    /// # Errors
    ///
    /// `DriveAccessError` naming the segment that failed.
    #[instrument(skip(self))]
    pub async fn resolve_path(&self, root_id: &str, path: &FolderPath) -> CoreResult<ResolvedFolders> {
        let mut parent = root_id.to_string();
        let mut chain: [String; 3] = Default::default();

        for (slot, segment) in chain.iter_mut().zip(path.segments()) {
            parent = self.resolve_segment(&parent, segment).await?;
            slot.clone_from(&parent);
        }

        info!(path = %path, folder_id = %chain[2], "Folder chain resolved");

        Ok(ResolvedFolders {
            root_id: root_id.to_string(),
            chain,
        })
    }

    async fn resolve_segment(&self, parent_id: &str, name: &str) -> CoreResult<String> {
        if name.trim().is_empty() {
            return Err(CoreError::drive(name, "folder name is empty"));
        }

        let matches = self
            .drive
            .find_folders(parent_id, name)
            .await
            .map_err(|e| segment_error(name, e))?;

        if let Some(existing) = matches.first() {
            if matches.len() > 1 {
                warn!(
                    name,
                    parent_id,
                    duplicates = matches.len(),
                    chosen = %existing.id,
                    "Duplicate sibling folders, using the first one Drive returned"
                );
            }
            debug!(name, folder_id = %existing.id, "Reusing folder");
            return Ok(existing.id.clone());
        }

        let created = self
            .drive
            .create_folder(parent_id, name)
            .await
            .map_err(|e| segment_error(name, e))?;

        Ok(created.id)
    }

    /// Count files ending in `.{extension}` anywhere below `folder_id`.
    #[instrument(skip(self))]
    pub async fn count_files(&self, folder_id: &str, extension: &str) -> CoreResult<usize> {
        let suffix = format!(".{}", extension.to_ascii_lowercase());
        let mut pending = vec![folder_id.to_string()];
        let mut count = 0;

        while let Some(current) = pending.pop() {
            let children = self
                .drive
                .list_children(&current)
                .await
                .map_err(|e| segment_error(&current, e))?;

            for child in children {
                if child.is_folder() {
                    pending.push(child.id);
                } else if child.name.to_ascii_lowercase().ends_with(&suffix) {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

#[track_caller]
fn segment_error(segment: &str, error: CoreError) -> CoreError {
    match error {
        CoreError::DriveAccessError { reason, .. } => CoreError::drive(segment, reason),
        other => CoreError::drive(segment, other),
    }
}
