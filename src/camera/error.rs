use thiserror::Error;

use crate::camera::asi::types::AsiError;

/// Camera subsystem errors.
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("ASI SDK call {call} failed: {code}")]
    Sdk { call: &'static str, code: AsiError },

    #[error("frame capture failed: {0}")]
    Capture(AsiError),

    #[error("resource allocation failed: {0}")]
    Resource(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("control query failed: {0}")]
    ControlQuery(String),

    #[error("control write failed: {0}")]
    ControlWrite(String),

    #[error("settings I/O failed: {0}")]
    Settings(String),
}

impl CameraError {
    /// Build an `Sdk` error for a named vendor call.
    pub fn sdk(call: &'static str, code: AsiError) -> Self {
        Self::Sdk { call, code }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;
