//! services/client/src/adapters/mock.rs
//!
//! A `DocumentService` that never touches the network. It answers from fixed
//! fixtures after an artificial delay so the pipeline can be exercised without
//! a backend.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use playlist_core::domain::{
    DocumentFile, DocumentOutline, GenerationTicket, Plan, SubscriptionState, Topic,
    UploadReceipt, Video, VideoStatus,
};
use playlist_core::ports::{DocumentService, PortError, PortResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

pub const MOCK_DOCUMENT_ID: &str = "demo-doc-123";
pub const MOCK_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";
pub const MOCK_THUMBNAIL_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/images/BigBuckBunny.jpg";

/// Free accounts may request one video themselves, on the first topic only.
pub const FREE_VIDEO_ALLOWANCE: u32 = 1;

const TOPICS: [(&str, &str); 3] = [
    ("Introduction and Overview", "Get started with the fundamentals"),
    ("Core Concepts", "Understanding the main principles"),
    ("Practical Applications", "Real-world examples and use cases"),
];

/// A requested video: generating on the first status read, ready afterwards.
struct MockVideo {
    id: String,
    reads: u32,
}

struct MockState {
    uploaded: Option<String>,
    videos: HashMap<String, MockVideo>,
    subscription: SubscriptionState,
    next_video: u32,
}

pub struct MockDocumentService {
    latency: Duration,
    state: Mutex<MockState>,
}

impl MockDocumentService {
    pub fn new(latency: Duration) -> Self {
        Self::with_subscription(latency, SubscriptionState::default())
    }

    pub fn with_subscription(latency: Duration, subscription: SubscriptionState) -> Self {
        Self {
            latency,
            state: Mutex::new(MockState {
                uploaded: None,
                videos: HashMap::new(),
                subscription,
                next_video: 1,
            }),
        }
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn title_for(file_name: &str) -> String {
        match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file_name.to_string(),
        }
    }

    fn topic_id(order: usize) -> String {
        format!("topic-{}", order + 1)
    }

    fn start_video(state: &mut MockState, topic_id: &str) -> String {
        let id = format!("video-{}", state.next_video);
        state.next_video += 1;
        state.videos.insert(
            topic_id.to_string(),
            MockVideo {
                id: id.clone(),
                reads: 0,
            },
        );
        id
    }

    /// Builds the outline as of this read, advancing every requested video.
    fn outline(state: &mut MockState, title: &str) -> DocumentOutline {
        let topics = TOPICS
            .iter()
            .enumerate()
            .map(|(order, (topic_title, description))| {
                let id = Self::topic_id(order);
                let video = state.videos.get_mut(&id).map(|video| {
                    video.reads += 1;
                    mock_video(&video.id, video.reads)
                });
                Topic {
                    id,
                    title: topic_title.to_string(),
                    description: description.to_string(),
                    order: order as u32,
                    is_premium: order > 0,
                    video,
                }
            })
            .collect();
        DocumentOutline {
            id: format!("{}-outline", MOCK_DOCUMENT_ID),
            title: title.to_string(),
            topics,
            created_at: Utc
                .with_ymd_and_hms(2024, 1, 15, 10, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

fn mock_video(id: &str, reads: u32) -> Video {
    if reads <= 1 {
        Video {
            id: id.to_string(),
            url: None,
            status: VideoStatus::Generating,
            duration_secs: None,
            thumbnail: None,
        }
    } else {
        Video {
            id: id.to_string(),
            url: Some(MOCK_VIDEO_URL.to_string()),
            status: VideoStatus::Ready,
            duration_secs: Some(180),
            thumbnail: Some(MOCK_THUMBNAIL_URL.to_string()),
        }
    }
}

#[async_trait]
impl DocumentService for MockDocumentService {
    async fn upload_document(&self, file: &DocumentFile) -> PortResult<UploadReceipt> {
        self.delay().await;
        let mut state = self.state.lock().await;
        let title = Self::title_for(&file.name);
        state.uploaded = Some(title.clone());
        state.videos.clear();
        // The receipt shows the outline before the free video is started.
        let outline = Self::outline(&mut state, &title);
        Self::start_video(&mut state, &Self::topic_id(0));
        debug!(file = %file.name, "Mock upload accepted");
        Ok(UploadReceipt {
            document_id: MOCK_DOCUMENT_ID.to_string(),
            outline,
        })
    }

    async fn get_document_status(&self, document_id: &str) -> PortResult<DocumentOutline> {
        self.delay().await;
        let mut state = self.state.lock().await;
        match state.uploaded.clone() {
            Some(title) if document_id == MOCK_DOCUMENT_ID => Ok(Self::outline(&mut state, &title)),
            // A fresh mock can still show the demo document.
            None if document_id == MOCK_DOCUMENT_ID => Ok(Self::outline(&mut state, "notes")),
            _ => Err(PortError::NotFound(document_id.to_string())),
        }
    }

    async fn get_video_status(&self, video_id: &str) -> PortResult<Video> {
        self.delay().await;
        let state = self.state.lock().await;
        state
            .videos
            .values()
            .find(|video| video.id == video_id)
            .map(|video| mock_video(&video.id, video.reads))
            .ok_or_else(|| PortError::NotFound(video_id.to_string()))
    }

    async fn generate_video(&self, topic_id: &str) -> PortResult<GenerationTicket> {
        self.delay().await;
        let mut state = self.state.lock().await;
        let order = (0..TOPICS.len())
            .find(|order| Self::topic_id(*order) == topic_id)
            .ok_or_else(|| PortError::NotFound(topic_id.to_string()))?;
        if !state.subscription.is_premium {
            if order > 0 || state.subscription.free_videos_used >= FREE_VIDEO_ALLOWANCE {
                return Err(PortError::Unauthorized);
            }
            state.subscription.free_videos_used += 1;
        }
        let video_id = Self::start_video(&mut state, topic_id);
        Ok(GenerationTicket { video_id })
    }

    async fn check_subscription(&self) -> PortResult<SubscriptionState> {
        self.delay().await;
        Ok(self.state.lock().await.subscription)
    }

    async fn subscribe(&self, plan: Plan) -> PortResult<()> {
        self.delay().await;
        debug!(%plan, "Mock subscription activated");
        self.state.lock().await.subscription.is_premium = true;
        Ok(())
    }
}
