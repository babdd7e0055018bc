//! Scripted `DocumentService` used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use playlist_core::domain::{
    DocumentFile, DocumentOutline, GenerationTicket, Plan, SubscriptionState, Topic,
    UploadReceipt, Video, VideoStatus,
};
use playlist_core::ports::{DocumentService, PortError, PortResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

pub const DOC_ID: &str = "demo-doc-123";

pub fn pdf(name: &str, size: usize) -> DocumentFile {
    DocumentFile::new(name, "application/pdf", vec![b'%'; size])
}

pub fn video(status: VideoStatus) -> Video {
    Video {
        id: "video-1".to_string(),
        url: (status == VideoStatus::Ready).then(|| "https://cdn.example/v1.mp4".to_string()),
        status,
        duration_secs: (status == VideoStatus::Ready).then_some(180),
        thumbnail: None,
    }
}

/// Three topics; the first one carries a video in `first_video` state.
pub fn outline(first_video: Option<VideoStatus>) -> DocumentOutline {
    let titles = ["Introduction and Overview", "Core Concepts", "Practical Applications"];
    DocumentOutline {
        id: "outline-1".to_string(),
        title: "notes".to_string(),
        topics: titles
            .iter()
            .enumerate()
            .map(|(i, title)| Topic {
                id: format!("topic-{}", i + 1),
                title: title.to_string(),
                description: format!("About {}", title.to_lowercase()),
                order: i as u32,
                is_premium: i > 0,
                video: if i == 0 { first_video.map(video) } else { None },
            })
            .collect(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
    }
}

#[derive(Default)]
pub struct Calls {
    pub upload: AtomicUsize,
    pub status: AtomicUsize,
    pub subscription: AtomicUsize,
    pub generate: AtomicUsize,
    pub subscribe: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Answers from queues. The last queued status is repeated once the queue
/// is down to one entry.
pub struct ScriptedService {
    pub calls: Calls,
    upload: Mutex<PortResult<UploadReceipt>>,
    statuses: Mutex<VecDeque<PortResult<DocumentOutline>>>,
    subscription: Mutex<PortResult<SubscriptionState>>,
    generate: Mutex<PortResult<GenerationTicket>>,
    /// When set, uploads wait for a notification before answering.
    pub upload_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, the next status fetch waits for a notification before answering.
    pub status_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, the next generation request waits for a notification.
    pub generate_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            calls: Calls::default(),
            upload: Mutex::new(Ok(UploadReceipt {
                document_id: DOC_ID.to_string(),
                outline: outline(None),
            })),
            statuses: Mutex::new(VecDeque::from([Ok(outline(Some(VideoStatus::Ready)))])),
            subscription: Mutex::new(Ok(SubscriptionState::default())),
            generate: Mutex::new(Ok(GenerationTicket {
                video_id: "video-2".to_string(),
            })),
            upload_gate: Mutex::new(None),
            status_gate: Mutex::new(None),
            generate_gate: Mutex::new(None),
        }
    }

    pub async fn set_upload(&self, result: PortResult<UploadReceipt>) {
        *self.upload.lock().await = result;
    }

    pub async fn set_statuses(&self, results: Vec<PortResult<DocumentOutline>>) {
        *self.statuses.lock().await = results.into();
    }

    pub async fn set_subscription(&self, result: PortResult<SubscriptionState>) {
        *self.subscription.lock().await = result;
    }

    pub async fn set_generate(&self, result: PortResult<GenerationTicket>) {
        *self.generate.lock().await = result;
    }

    pub async fn gate_uploads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.upload_gate.lock().await = Some(gate.clone());
        gate
    }

    pub async fn gate_statuses(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.status_gate.lock().await = Some(gate.clone());
        gate
    }

    pub async fn gate_generates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.generate_gate.lock().await = Some(gate.clone());
        gate
    }

    async fn next_status(&self) -> PortResult<DocumentOutline> {
        let mut statuses = self.statuses.lock().await;
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or_else(|| Err(PortError::NotFound(DOC_ID.to_string())))
        }
    }
}

#[async_trait]
impl DocumentService for ScriptedService {
    async fn upload_document(&self, _file: &DocumentFile) -> PortResult<UploadReceipt> {
        self.calls.upload.fetch_add(1, Ordering::SeqCst);
        let gate = self.upload_gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.upload.lock().await.clone()
    }

    async fn get_document_status(&self, _document_id: &str) -> PortResult<DocumentOutline> {
        let gate = self.status_gate.lock().await.take();
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next_status().await
    }

    async fn get_video_status(&self, video_id: &str) -> PortResult<Video> {
        Err(PortError::NotFound(video_id.to_string()))
    }

    async fn generate_video(&self, _topic_id: &str) -> PortResult<GenerationTicket> {
        let gate = self.generate_gate.lock().await.take();
        self.calls.generate.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.generate.lock().await.clone()
    }

    async fn check_subscription(&self) -> PortResult<SubscriptionState> {
        self.calls.subscription.fetch_add(1, Ordering::SeqCst);
        self.subscription.lock().await.clone()
    }

    async fn subscribe(&self, _plan: Plan) -> PortResult<()> {
        self.calls.subscribe.fetch_add(1, Ordering::SeqCst);
        let mut subscription = self.subscription.lock().await;
        if let Ok(state) = subscription.as_mut() {
            state.is_premium = true;
        }
        Ok(())
    }
}

/// Yields until `counter` reaches `n`.
pub async fn wait_for(counter: &AtomicUsize, n: usize) {
    while counter.load(Ordering::SeqCst) < n {
        tokio::task::yield_now().await;
    }
}
