use thiserror::Error;

use super::WindowId;

/// Failures reported by a rendering backend.
///
/// Errors returned from record, submit and present are fatal for the frame
/// loop; everything else is logged by the caller and the operation skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("failed to create window: {0}")]
    WindowCreation(String),

    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(String),

    #[error("failed to create GPU device: {0}")]
    DeviceRequest(String),

    #[error("window {0:?} is not known to the backend")]
    UnknownWindow(WindowId),

    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    #[error("GPU out of memory")]
    OutOfMemory,
}

/// High-level response after a surface acquisition error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
