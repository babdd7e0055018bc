//! services/api/src/store.rs
//!
//! In-memory state of the demo backend: uploaded outlines, their videos and
//! the single demo account. Rendering is simulated by a background task per
//! video.

use chrono::Utc;
use playlist_core::domain::{DocumentOutline, SubscriptionState, Topic, Video, VideoStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

pub const SAMPLE_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";
pub const SAMPLE_THUMBNAIL_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/images/BigBuckBunny.jpg";
pub const SAMPLE_DURATION_SECS: u32 = 180;

/// Videos a free account may request on its own.
pub const FREE_VIDEO_ALLOWANCE: u32 = 1;

const FIXTURE_TOPICS: [(&str, &str); 3] = [
    ("Introduction and Overview", "Get started with the fundamentals"),
    ("Core Concepts", "Understanding the main principles"),
    ("Practical Applications", "Real-world examples and use cases"),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document {0} not found")]
    DocumentNotFound(String),
    #[error("Topic {0} not found")]
    TopicNotFound(String),
    #[error("Video {0} not found")]
    VideoNotFound(String),
    #[error("Topic {topic_id} requires a premium subscription")]
    PremiumRequired { topic_id: String },
}

struct StoredVideo {
    topic_id: String,
    /// Insertion order; the highest one is a topic's latest video.
    seq: u64,
    video: Video,
}

#[derive(Default)]
struct Inner {
    /// Outlines as uploaded, without videos.
    documents: HashMap<String, DocumentOutline>,
    /// topic id -> document id
    topic_index: HashMap<String, String>,
    videos: HashMap<String, StoredVideo>,
    account: SubscriptionState,
    next_seq: u64,
}

impl Inner {
    fn latest_video(&self, topic_id: &str) -> Option<Video> {
        self.videos
            .values()
            .filter(|stored| stored.topic_id == topic_id)
            .max_by_key(|stored| stored.seq)
            .map(|stored| stored.video.clone())
    }

    fn with_videos(&self, outline: &DocumentOutline) -> DocumentOutline {
        let mut outline = outline.clone();
        for topic in &mut outline.topics {
            topic.video = self.latest_video(&topic.id);
        }
        outline
    }

    fn topic(&self, topic_id: &str) -> Option<&Topic> {
        let document_id = self.topic_index.get(topic_id)?;
        self.documents.get(document_id)?.topic(topic_id)
    }
}

pub struct Store {
    inner: RwLock<Inner>,
    render_delay: Duration,
}

fn title_for(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

impl Store {
    pub fn new(render_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner::default()),
            render_delay,
        })
    }

    /// Stores the fixture outline for an uploaded file and starts rendering
    /// its first topic. That first video is not charged to the account.
    pub async fn create_document(self: &Arc<Self>, file_name: &str) -> (String, DocumentOutline) {
        let document_id = Uuid::new_v4().to_string();
        let topics: Vec<Topic> = FIXTURE_TOPICS
            .iter()
            .enumerate()
            .map(|(order, (title, description))| Topic {
                id: Uuid::new_v4().to_string(),
                title: title.to_string(),
                description: description.to_string(),
                order: order as u32,
                is_premium: order > 0,
                video: None,
            })
            .collect();
        let outline = DocumentOutline {
            id: Uuid::new_v4().to_string(),
            title: title_for(file_name),
            topics,
            created_at: Utc::now(),
        };

        let mut inner = self.inner.write().await;
        for topic in &outline.topics {
            inner
                .topic_index
                .insert(topic.id.clone(), document_id.clone());
        }
        if let Some(first) = outline.first_topic() {
            self.start_render(&mut inner, &first.id);
        }
        inner.documents.insert(document_id.clone(), outline.clone());
        let outline = inner.with_videos(&outline);
        info!(%document_id, file = %file_name, "Document stored");
        (document_id, outline)
    }

    /// The outline with each topic's latest video merged in.
    pub async fn outline(&self, document_id: &str) -> Result<DocumentOutline, StoreError> {
        let inner = self.inner.read().await;
        inner
            .documents
            .get(document_id)
            .map(|outline| inner.with_videos(outline))
            .ok_or_else(|| StoreError::DocumentNotFound(document_id.to_string()))
    }

    pub async fn video(&self, video_id: &str) -> Result<Video, StoreError> {
        let inner = self.inner.read().await;
        inner
            .videos
            .get(video_id)
            .map(|stored| stored.video.clone())
            .ok_or_else(|| StoreError::VideoNotFound(video_id.to_string()))
    }

    /// Starts a render for `topic_id` if the account is entitled to it.
    ///
    /// A free account gets the first topic of a document, once.
    pub async fn request_video(self: &Arc<Self>, topic_id: &str) -> Result<String, StoreError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .topic(topic_id)
            .map(|topic| topic.order)
            .ok_or_else(|| StoreError::TopicNotFound(topic_id.to_string()))?;

        let account = inner.account;
        if !account.is_premium {
            if order != 0 || account.free_videos_used >= FREE_VIDEO_ALLOWANCE {
                return Err(StoreError::PremiumRequired {
                    topic_id: topic_id.to_string(),
                });
            }
            inner.account.free_videos_used += 1;
        }
        Ok(self.start_render(&mut inner, topic_id))
    }

    pub async fn subscription(&self) -> SubscriptionState {
        self.inner.read().await.account
    }

    pub async fn subscribe(&self) {
        self.inner.write().await.account.is_premium = true;
    }

    fn start_render(self: &Arc<Self>, inner: &mut Inner, topic_id: &str) -> String {
        let video_id = Uuid::new_v4().to_string();
        inner.next_seq += 1;
        inner.videos.insert(
            video_id.clone(),
            StoredVideo {
                topic_id: topic_id.to_string(),
                seq: inner.next_seq,
                video: Video {
                    id: video_id.clone(),
                    url: None,
                    status: VideoStatus::Generating,
                    duration_secs: None,
                    thumbnail: None,
                },
            },
        );

        let store = Arc::clone(self);
        let id = video_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(store.render_delay).await;
            store.finish_render(&id).await;
        });
        debug!(%video_id, %topic_id, "Render started");
        video_id
    }

    async fn finish_render(&self, video_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(stored) = inner.videos.get_mut(video_id) {
            stored.video.status = VideoStatus::Ready;
            stored.video.url = Some(SAMPLE_VIDEO_URL.to_string());
            stored.video.duration_secs = Some(SAMPLE_DURATION_SECS);
            stored.video.thumbnail = Some(SAMPLE_THUMBNAIL_URL.to_string());
            info!(%video_id, "Render finished");
        }
    }
}
