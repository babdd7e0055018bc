//! crates/playlist_core/src/domain.rs
//!
//! Defines the pure, core data structures for the upload-to-playlist pipeline.
//! These structs are independent of any wire or serialization format; the
//! adapters convert their own records into these types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// A document picked by the user, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFile {
    pub name: String,
    pub mime_type: String,
    pub contents: Bytes,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            contents: contents.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.contents.len() as u64
    }
}

/// The lifecycle phase of one upload job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Analyzing,
    Generating,
    Complete,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Analyzing => "analyzing",
            Phase::Generating => "generating",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }

    /// `Complete` ends a job; only an explicit reset leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete)
    }

    /// Phases in which a new file may be picked.
    pub fn accepts_file(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one document submission.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadJob {
    /// Assigned by the backend once the upload is acknowledged.
    pub document_id: Option<String>,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub phase: Phase,
}

impl UploadJob {
    pub fn for_file(file: &DocumentFile) -> Self {
        Self {
            document_id: None,
            file_name: file.name.clone(),
            file_size_bytes: file.size_bytes(),
            mime_type: file.mime_type.clone(),
            phase: Phase::Uploading,
        }
    }
}

/// Generation state of a topic's video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStatus {
    Generating,
    Ready,
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Generating => "generating",
            VideoStatus::Ready => "ready",
            VideoStatus::Error => "error",
        }
    }
}

impl FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generating" => Ok(VideoStatus::Generating),
            "ready" => Ok(VideoStatus::Ready),
            "error" => Ok(VideoStatus::Error),
            other => Err(format!("unknown video status '{}'", other)),
        }
    }
}

/// A generated artifact for a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub id: String,
    /// Absent while the video is still generating.
    pub url: Option<String>,
    pub status: VideoStatus,
    pub duration_secs: Option<u32>,
    pub thumbnail: Option<String>,
}

impl Video {
    pub fn is_ready(&self) -> bool {
        self.status == VideoStatus::Ready
    }
}

/// One chapter of a document outline.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Zero-based display position, unique within an outline.
    pub order: u32,
    pub is_premium: bool,
    pub video: Option<Video>,
}

impl Topic {
    pub fn is_first(&self) -> bool {
        self.order == 0
    }

    pub fn video_status(&self) -> Option<VideoStatus> {
        self.video.as_ref().map(|v| v.status)
    }
}

/// The backend's decomposition of a document into ordered topics.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutline {
    pub id: String,
    pub title: String,
    pub topics: Vec<Topic>,
    pub created_at: DateTime<Utc>,
}

impl DocumentOutline {
    /// The topic with `order == 0`, if the backend has produced one yet.
    pub fn first_topic(&self) -> Option<&Topic> {
        self.topics.iter().find(|t| t.is_first())
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == topic_id)
    }

    /// Topics in display sequence.
    pub fn sorted_by_order(&self) -> Vec<&Topic> {
        let mut topics: Vec<&Topic> = self.topics.iter().collect();
        topics.sort_by_key(|t| t.order);
        topics
    }

    /// Returns the first `order` value shared by two topics, if any.
    pub fn duplicate_order(&self) -> Option<u32> {
        let mut seen = std::collections::HashSet::new();
        self.topics
            .iter()
            .map(|t| t.order)
            .find(|order| !seen.insert(*order))
    }
}

/// Whether the current user may access every topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionState {
    pub is_premium: bool,
    pub free_videos_used: u32,
}

/// The backend's acknowledgement of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub document_id: String,
    pub outline: DocumentOutline,
}

/// Acknowledgement of a video generation request. The video itself is
/// observed through later status polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub video_id: String,
}

/// A subscription plan offered to free users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monthly" => Ok(Plan::Monthly),
            "yearly" => Ok(Plan::Yearly),
            other => Err(format!("unknown plan '{}', expected 'monthly' or 'yearly'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: &str, order: u32) -> Topic {
        Topic {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            order,
            is_premium: order > 0,
            video: None,
        }
    }

    fn outline(topics: Vec<Topic>) -> DocumentOutline {
        DocumentOutline {
            id: "outline-1".to_string(),
            title: "notes".to_string(),
            topics,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_topic_is_found_by_order_not_position() {
        let o = outline(vec![topic("b", 1), topic("a", 0), topic("c", 2)]);
        assert_eq!(o.first_topic().map(|t| t.id.as_str()), Some("a"));
        let ids: Vec<&str> = o.sorted_by_order().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_order_is_detected() {
        assert_eq!(outline(vec![topic("a", 0), topic("b", 1)]).duplicate_order(), None);
        assert_eq!(
            outline(vec![topic("a", 0), topic("b", 1), topic("c", 1)]).duplicate_order(),
            Some(1)
        );
    }

    #[test]
    fn plan_parses_case_insensitively() {
        assert_eq!("Yearly".parse::<Plan>(), Ok(Plan::Yearly));
        assert_eq!("monthly".parse::<Plan>(), Ok(Plan::Monthly));
        assert!("weekly".parse::<Plan>().is_err());
    }

    #[test]
    fn only_idle_and_error_accept_a_file() {
        assert!(Phase::Idle.accepts_file());
        assert!(Phase::Error.accepts_file());
        assert!(!Phase::Uploading.accepts_file());
        assert!(!Phase::Complete.accepts_file());
        assert!(Phase::Complete.is_terminal());
    }
}
