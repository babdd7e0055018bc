//! crates/playlist_core/src/error.rs
//!
//! Error taxonomy of the upload pipeline and dashboard. None of these is fatal:
//! every one is recovered by user action or by the next poll.

use crate::domain::Phase;
use crate::ports::PortError;

pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";
pub const VIDEO_FAILED_MESSAGE: &str = "Video generation failed. Please try again.";

/// A file rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please upload a PDF, DOC, DOCX, or TXT file")]
    UnsupportedType(String),
    #[error("File size must be less than 10MB")]
    TooLarge { size: u64, max: u64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    Upload(PortError),

    #[error("Failed to fetch document state: {0}")]
    Fetch(PortError),

    #[error("Failed to request video for topic {topic_id}: {source}")]
    GenerationRequest { topic_id: String, source: PortError },

    #[error("Subscription request failed: {0}")]
    Subscription(PortError),

    #[error("Topic {topic_id} requires a premium subscription")]
    AccessDenied { topic_id: String },

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: Phase, action: &'static str },

    /// The job this response belonged to was reset or replaced, or a newer
    /// dashboard fetch already landed.
    #[error("Response was superseded by a newer one")]
    Superseded,

    /// The dashboard was torn down before the response arrived.
    #[error("Dashboard has been shut down")]
    Cancelled,
}

impl PipelineError {
    /// The message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation(e) => e.to_string(),
            PipelineError::Upload(_) => UPLOAD_FAILED_MESSAGE.to_string(),
            PipelineError::Fetch(_) => "Failed to load document outline".to_string(),
            PipelineError::GenerationRequest { .. } => "Failed to generate video".to_string(),
            other => other.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
