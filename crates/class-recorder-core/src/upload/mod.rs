mod orchestrator;
mod policy;
mod task;

pub use {
    orchestrator::{UploadOrchestrator, UploadRequest},
    policy::{
        AllowedTypes, UploadPolicy, ValidatedFile, extension_of, normalize_extension,
    },
    task::{UploadEvent, UploadResult, UploadTask, ValidationStatus},
};
