//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::store::StoreError;
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use playlist_core::domain::{DocumentFile, DocumentOutline, Plan, Topic, Video};
use playlist_core::error::ValidationError;
use playlist_core::validation::validate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload_handler,
        get_document_handler,
        generate_video_handler,
        get_video_handler,
        subscription_handler,
        subscribe_handler,
    ),
    components(
        schemas(
            UploadResponse,
            OutlineResponse,
            TopicResponse,
            VideoResponse,
            GenerateVideoRequest,
            GenerateVideoResponse,
            SubscriptionResponse,
            SubscribeResponse,
        )
    ),
    tags(
        (name = "Document Playlist API", description = "Upload documents and turn their topics into videos.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    document_id: String,
    outline: OutlineResponse,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutlineResponse {
    id: String,
    title: String,
    topics: Vec<TopicResponse>,
    created_at: DateTime<Utc>,
}

impl From<DocumentOutline> for OutlineResponse {
    fn from(outline: DocumentOutline) -> Self {
        Self {
            id: outline.id,
            title: outline.title,
            topics: outline.topics.into_iter().map(TopicResponse::from).collect(),
            created_at: outline.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    id: String,
    title: String,
    description: String,
    order: u32,
    is_premium: bool,
    video: Option<VideoResponse>,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            title: topic.title,
            description: topic.description,
            order: topic.order,
            is_premium: topic.is_premium,
            video: topic.video.map(VideoResponse::from),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    id: String,
    /// One of `generating`, `ready` or `error`.
    status: String,
    url: Option<String>,
    /// Length in seconds.
    duration: Option<u32>,
    thumbnail: Option<String>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            status: video.status.as_str().to_string(),
            url: video.url,
            duration: video.duration_secs,
            thumbnail: video.thumbnail,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoRequest {
    topic_id: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    video_id: String,
    status: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    is_premium: bool,
    free_videos_used: u32,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscribeParams {
    /// `monthly` or `yearly`.
    plan: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    success: bool,
    plan: String,
}

type HandlerError = (StatusCode, String);

fn store_error(e: StoreError) -> HandlerError {
    let status = match e {
        StoreError::DocumentNotFound(_)
        | StoreError::TopicNotFound(_)
        | StoreError::VideoNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::PremiumRequired { .. } => StatusCode::FORBIDDEN,
    };
    (status, e.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Upload a document and receive its outline.
///
/// Accepts a multipart/form-data request with a `file` part.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "The document to upload."),
    responses(
        (status = 200, description = "Document stored", body = UploadResponse),
        (status = 400, description = "Missing file, unsupported type or empty content"),
        (status = 413, description = "File larger than 10 MiB")
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("untitled").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        upload = Some(DocumentFile::new(file_name, mime_type, data));
        break;
    }

    let file = upload.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        )
    })?;

    if let Err(e) = validate(&file) {
        warn!(file = %file.name, "Upload rejected: {}", e);
        let status = match e {
            ValidationError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            ValidationError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        };
        return Err((status, e.to_string()));
    }
    if file.contents.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Could not extract text from file".to_string(),
        ));
    }

    let (document_id, outline) = app_state.store.create_document(&file.name).await;
    info!(%document_id, bytes = file.size_bytes(), "Upload accepted");
    Ok(Json(UploadResponse {
        document_id,
        outline: outline.into(),
    }))
}

/// Get a document's outline, with each topic's latest video.
#[utoipa::path(
    get,
    path = "/documents/{document_id}",
    params(("document_id" = String, Path, description = "The id returned by the upload.")),
    responses(
        (status = 200, description = "Current outline", body = OutlineResponse),
        (status = 404, description = "Unknown document")
    )
)]
pub async fn get_document_handler(
    State(app_state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<OutlineResponse>, HandlerError> {
    let outline = app_state
        .store
        .outline(&document_id)
        .await
        .map_err(store_error)?;
    Ok(Json(outline.into()))
}

/// Start rendering the video for one topic.
#[utoipa::path(
    post,
    path = "/generate-video",
    request_body = GenerateVideoRequest,
    responses(
        (status = 200, description = "Render started", body = GenerateVideoResponse),
        (status = 403, description = "Premium subscription required"),
        (status = 404, description = "Unknown topic")
    )
)]
pub async fn generate_video_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<GenerateVideoRequest>,
) -> Result<Json<GenerateVideoResponse>, HandlerError> {
    let video_id = app_state
        .store
        .request_video(&request.topic_id)
        .await
        .map_err(|e| {
            warn!(topic_id = %request.topic_id, "Video request refused: {}", e);
            store_error(e)
        })?;
    Ok(Json(GenerateVideoResponse {
        video_id,
        status: "generating".to_string(),
    }))
}

/// Get one video's status.
#[utoipa::path(
    get,
    path = "/videos/{video_id}",
    params(("video_id" = String, Path, description = "The id returned by /generate-video.")),
    responses(
        (status = 200, description = "Current video status", body = VideoResponse),
        (status = 404, description = "Unknown video")
    )
)]
pub async fn get_video_handler(
    State(app_state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, HandlerError> {
    let video = app_state.store.video(&video_id).await.map_err(store_error)?;
    Ok(Json(video.into()))
}

/// Get the demo account's subscription.
#[utoipa::path(
    get,
    path = "/subscription",
    responses((status = 200, description = "Subscription state", body = SubscriptionResponse))
)]
pub async fn subscription_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<SubscriptionResponse> {
    let account = app_state.store.subscription().await;
    Json(SubscriptionResponse {
        is_premium: account.is_premium,
        free_videos_used: account.free_videos_used,
    })
}

/// Upgrade the demo account to premium.
#[utoipa::path(
    post,
    path = "/subscribe",
    params(SubscribeParams),
    responses(
        (status = 200, description = "Account upgraded", body = SubscribeResponse),
        (status = 400, description = "Unknown plan")
    )
)]
pub async fn subscribe_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SubscribeParams>,
) -> Result<Json<SubscribeResponse>, HandlerError> {
    let plan = params.plan.parse::<Plan>().map_err(|e| {
        warn!("Subscribe called with an invalid plan: {}", e);
        (StatusCode::BAD_REQUEST, e)
    })?;
    app_state.store.subscribe().await;
    info!(%plan, "Account upgraded");
    Ok(Json(SubscribeResponse {
        success: true,
        plan: plan.as_str().to_string(),
    }))
}
