//! crates/playlist_core/src/ports.rs
//!
//! Defines the service contract (trait) through which the orchestration logic
//! reads and writes remote state. The trait forms the boundary of the hexagonal
//! architecture: the core never knows whether it talks to a live backend or to
//! canned fixtures.

use async_trait::async_trait;

use crate::domain::{
    DocumentFile, DocumentOutline, GenerationTicket, Plan, SubscriptionState, UploadReceipt,
    Video,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors of the transport in use.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Port (Trait)
//=========================================================================================

/// Every call is a single request/response with no built-in retry.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Submits a document; the backend answers with its id and first outline.
    async fn upload_document(&self, file: &DocumentFile) -> PortResult<UploadReceipt>;

    /// Reads the authoritative outline, with each topic's latest video.
    async fn get_document_status(&self, document_id: &str) -> PortResult<DocumentOutline>;

    async fn get_video_status(&self, video_id: &str) -> PortResult<Video>;

    /// Asks for a topic's video. Only acknowledges the request; readiness is
    /// observed through later `get_document_status` calls.
    async fn generate_video(&self, topic_id: &str) -> PortResult<GenerationTicket>;

    async fn check_subscription(&self) -> PortResult<SubscriptionState>;

    /// Payment boundary: upgrades the current account to premium.
    async fn subscribe(&self, plan: Plan) -> PortResult<()>;
}
