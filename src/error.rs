use std::path::PathBuf;

use crate::backend::{RenderTargetHandle, ShaderHandle};

/// Errors produced while loading or validating [`ShadowSettings`](crate::shadows::ShadowSettings)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("shadow map resolution must be between 1 and {max}, got {value}")]
    Resolution { value: u32, max: u32 },
    #[error("shader name for '{0}' must not be empty")]
    EmptyShaderName(&'static str),
}

/// Errors returned by a [`RenderBackend`](crate::backend::RenderBackend) command
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("render target {0:?} does not exist")]
    UnknownTarget(RenderTargetHandle),
    #[error("shader {0:?} is not registered")]
    UnknownShader(ShaderHandle),
    #[error("render target '{label}' of {width}x{height} is outside 1..={max}")]
    TargetSize {
        label: String,
        width: u32,
        height: u32,
        max: u32,
    },
    #[error("wgpu rejected '{label}': {message}")]
    Validation { label: String, message: String },
    #[error("no adapter available: {0}")]
    Adapter(String),
    #[error("failed to request device: {0}")]
    Device(String),
}
