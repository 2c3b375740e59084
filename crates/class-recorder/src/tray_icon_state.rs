/// Tray icon states corresponding to application workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Ready to record or upload.
    Idle,
    /// OBS is recording.
    Recording,
    /// A recording is being sent to Drive.
    Uploading,
}
