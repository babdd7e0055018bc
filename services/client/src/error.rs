//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use playlist_core::error::PipelineError;
use playlist_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the document service port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a failure of the upload pipeline or dashboard.
    #[error("{}", .0.user_message())]
    Pipeline(#[from] PipelineError),

    /// Represents a standard Input/Output error (e.g., reading the document).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
