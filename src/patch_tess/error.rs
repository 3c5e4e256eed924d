//! Error types.
//!
//! Everything here is a setup-time failure. Per-frame problems (no drawable)
//! are reported through `FrameResult::Dropped`, never as errors.

use std::path::PathBuf;

/// Fatal setup errors: device, program, pipeline or buffer creation.
#[derive(Debug, thiserror::Error)]
pub enum TessError {
    #[error("no Metal device available")]
    NoDevice,

    #[error("failed to compile patch shaders: {0}")]
    ShaderCompile(String),

    #[error("shader function {name} not found: {reason}")]
    MissingFunction { name: String, reason: String },

    #[error("failed to create compute pipeline {name}: {reason}")]
    ComputePipeline { name: String, reason: String },

    #[error("failed to create render pipeline: {0}")]
    RenderPipeline(String),

    #[error("buffer {name} has {actual} bytes, expected {expected}")]
    BufferSize {
        name: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors loading or validating a scene config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
