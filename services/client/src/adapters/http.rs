//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the document backend.
//! It implements the `DocumentService` port from the `core` crate using `reqwest`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use playlist_core::domain::{
    DocumentFile, DocumentOutline, GenerationTicket, Plan, SubscriptionState, Topic,
    UploadReceipt, Video, VideoStatus,
};
use playlist_core::ports::{DocumentService, PortError, PortResult};
use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `DocumentService` port over the backend's REST API.
#[derive(Clone)]
pub struct HttpDocumentService {
    client: Client,
    base_url: String,
}

impl HttpDocumentService {
    /// Creates a new `HttpDocumentService`. Every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("doc2video/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PortError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRecord {
    document_id: String,
    outline: OutlineRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutlineRecord {
    id: String,
    title: String,
    topics: Vec<TopicRecord>,
    created_at: String,
}
impl OutlineRecord {
    fn to_domain(self) -> PortResult<DocumentOutline> {
        let outline = DocumentOutline {
            id: self.id,
            title: self.title,
            created_at: parse_timestamp(&self.created_at)?,
            topics: self
                .topics
                .into_iter()
                .map(TopicRecord::to_domain)
                .collect::<PortResult<Vec<_>>>()?,
        };
        if let Some(order) = outline.duplicate_order() {
            return Err(PortError::Decode(format!(
                "outline {} has more than one topic with order {}",
                outline.id, order
            )));
        }
        Ok(outline)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    order: u32,
    #[serde(default)]
    is_premium: bool,
    #[serde(default)]
    video: Option<VideoRecord>,
}
impl TopicRecord {
    fn to_domain(self) -> PortResult<Topic> {
        Ok(Topic {
            id: self.id,
            title: self.title,
            description: self.description,
            order: self.order,
            is_premium: self.is_premium,
            video: self.video.map(VideoRecord::to_domain).transpose()?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRecord {
    id: String,
    #[serde(default)]
    url: Option<String>,
    status: String,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    thumbnail: Option<String>,
}
impl VideoRecord {
    fn to_domain(self) -> PortResult<Video> {
        Ok(Video {
            id: self.id,
            url: self.url,
            status: self.status.parse::<VideoStatus>().map_err(PortError::Decode)?,
            duration_secs: self.duration,
            thumbnail: self.thumbnail,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoRequest<'a> {
    topic_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoRecord {
    video_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionRecord {
    is_premium: bool,
    #[serde(default)]
    free_videos_used: u32,
}

/// Accepts RFC 3339 as well as the backend's older `YYYY-MM-DD HH:MM:SS` (UTC).
fn parse_timestamp(raw: &str) -> PortResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| PortError::Decode(format!("invalid createdAt '{}': {}", raw, e)))
}

//=========================================================================================
// Response Handling
//=========================================================================================

fn map_transport(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout
    } else if e.is_decode() {
        PortError::Decode(e.to_string())
    } else {
        PortError::Transport(e.to_string())
    }
}

/// Maps non-2xx statuses onto `PortError` and decodes the JSON body otherwise.
async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> PortResult<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(match status {
            StatusCode::NOT_FOUND => PortError::NotFound(what.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
            _ => PortError::Status {
                status: status.as_u16(),
                message,
            },
        });
    }
    response.json::<T>().await.map_err(map_transport)
}

//=========================================================================================
// `DocumentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn upload_document(&self, file: &DocumentFile) -> PortResult<UploadReceipt> {
        let part = multipart::Part::bytes(file.contents.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| PortError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        debug!(file = %file.name, "POST /upload");
        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport)?;
        let record: UploadRecord = read_json(response, "upload").await?;
        Ok(UploadReceipt {
            document_id: record.document_id,
            outline: record.outline.to_domain()?,
        })
    }

    async fn get_document_status(&self, document_id: &str) -> PortResult<DocumentOutline> {
        let response = self
            .client
            .get(self.url(&format!("/documents/{}", document_id)))
            .send()
            .await
            .map_err(map_transport)?;
        let record: OutlineRecord = read_json(response, document_id).await?;
        record.to_domain()
    }

    async fn get_video_status(&self, video_id: &str) -> PortResult<Video> {
        let response = self
            .client
            .get(self.url(&format!("/videos/{}", video_id)))
            .send()
            .await
            .map_err(map_transport)?;
        let record: VideoRecord = read_json(response, video_id).await?;
        record.to_domain()
    }

    async fn generate_video(&self, topic_id: &str) -> PortResult<GenerationTicket> {
        let response = self
            .client
            .post(self.url("/generate-video"))
            .json(&GenerateVideoRequest { topic_id })
            .send()
            .await
            .map_err(map_transport)?;
        let record: GenerateVideoRecord = read_json(response, topic_id).await?;
        Ok(GenerationTicket {
            video_id: record.video_id,
        })
    }

    async fn check_subscription(&self) -> PortResult<SubscriptionState> {
        let response = self
            .client
            .get(self.url("/subscription"))
            .send()
            .await
            .map_err(map_transport)?;
        let record: SubscriptionRecord = read_json(response, "subscription").await?;
        Ok(SubscriptionState {
            is_premium: record.is_premium,
            free_videos_used: record.free_videos_used,
        })
    }

    async fn subscribe(&self, plan: Plan) -> PortResult<()> {
        let response = self
            .client
            .post(self.url("/subscribe"))
            .query(&[("plan", plan.as_str())])
            .send()
            .await
            .map_err(map_transport)?;
        let _: serde_json::Value = read_json(response, "subscribe").await?;
        Ok(())
    }
}
