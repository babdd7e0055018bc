//! Runs the HTTP adapter and the pipeline against the demo backend on an
//! ephemeral port.

use api_lib::config::Config as BackendConfig;
use api_lib::web::{router, state::AppState};
use client_lib::adapters::HttpDocumentService;
use playlist_core::backoff::BackoffPolicy;
use playlist_core::{
    CompletionMode, Dashboard, DocumentFile, DocumentService, MachineSettings, Phase,
    PipelineError, Plan, PollSettings, PortError, TopicAction, UploadMachine, VideoStatus,
};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_backend(render_delay: Duration) -> String {
    let config = BackendConfig {
        render_delay,
        ..BackendConfig::default()
    };
    let app = router(Arc::new(AppState::new(config)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn service(base_url: &str) -> Arc<HttpDocumentService> {
    Arc::new(HttpDocumentService::new(base_url, Duration::from_secs(5)).unwrap())
}

fn notes() -> DocumentFile {
    DocumentFile::new("notes.pdf", "application/pdf", b"%PDF-1.4 sample".to_vec())
}

fn fast_polls() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(20),
        max_backoff: Duration::from_millis(200),
    }
}

#[tokio::test]
async fn adapter_speaks_the_backend_contract() {
    let base_url = spawn_backend(Duration::from_secs(60)).await;
    let api = service(&base_url);

    let receipt = api.upload_document(&notes()).await.unwrap();
    assert_eq!(receipt.outline.title, "notes");
    assert_eq!(receipt.outline.topics.len(), 3);

    let outline = api.get_document_status(&receipt.document_id).await.unwrap();
    let first = outline.first_topic().unwrap();
    assert_eq!(first.video_status(), Some(VideoStatus::Generating));
    let video_id = first.video.as_ref().unwrap().id.clone();
    let video = api.get_video_status(&video_id).await.unwrap();
    assert_eq!(video.status, VideoStatus::Generating);

    let premium_topic = outline.topics[1].id.clone();
    assert_eq!(
        api.generate_video(&premium_topic).await,
        Err(PortError::Unauthorized)
    );

    api.subscribe(Plan::Monthly).await.unwrap();
    assert!(api.check_subscription().await.unwrap().is_premium);
    let ticket = api.generate_video(&premium_topic).await.unwrap();
    let outline = api.get_document_status(&receipt.document_id).await.unwrap();
    assert_eq!(
        outline.topic(&premium_topic).unwrap().video.as_ref().unwrap().id,
        ticket.video_id
    );
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let base_url = spawn_backend(Duration::from_secs(60)).await;
    let api = service(&base_url);

    assert!(matches!(
        api.get_document_status("missing").await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
async fn rejected_upload_surfaces_as_a_status_error() {
    let base_url = spawn_backend(Duration::from_secs(60)).await;
    let api = service(&base_url);

    let empty = DocumentFile::new("empty.txt", "text/plain", Vec::new());
    assert!(matches!(
        api.upload_document(&empty).await,
        Err(PortError::Status { status: 400, .. })
    ));
}

#[tokio::test]
async fn staged_upload_completes_when_the_first_video_is_ready() {
    let base_url = spawn_backend(Duration::from_millis(100)).await;
    let settings = MachineSettings {
        completion: CompletionMode::AwaitFirstVideo,
        backoff: BackoffPolicy::new(Duration::from_millis(25), Duration::from_millis(200)),
        ..MachineSettings::default()
    };
    let machine = UploadMachine::new(service(&base_url), settings);

    let receipt = machine.select_file(notes()).await.unwrap();
    assert_eq!(machine.snapshot().await.phase, Phase::Analyzing);

    let phase = tokio::time::timeout(Duration::from_secs(5), machine.run_to_completion())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phase, Phase::Complete);

    let state = machine.snapshot().await;
    assert_eq!(state.document_id(), Some(receipt.document_id.as_str()));
    assert_eq!(state.progress, 100);
    let outline = state.outline.unwrap();
    assert_eq!(
        outline.first_topic().unwrap().video_status(),
        Some(VideoStatus::Ready)
    );
}

#[tokio::test]
async fn dashboard_gates_premium_topics_until_subscribed() {
    let base_url = spawn_backend(Duration::from_millis(300)).await;
    let api = service(&base_url);
    let receipt = api.upload_document(&notes()).await.unwrap();
    let dashboard = Dashboard::new(api, receipt.document_id, fast_polls());

    dashboard.refresh().await.unwrap();
    let views = dashboard.topic_views().await;
    assert!(views[0].accessible);
    assert_eq!(views[1].action, TopicAction::Locked);

    let locked = views[1].topic.id.clone();
    assert!(matches!(
        dashboard.request_video(&locked).await,
        Err(PipelineError::AccessDenied { .. })
    ));

    dashboard.subscribe(Plan::Yearly).await.unwrap();
    let views = dashboard.topic_views().await;
    assert!(views.iter().all(|view| view.accessible));
    assert_eq!(views[1].action, TopicAction::Generate);

    dashboard.request_video(&locked).await.unwrap();
    let views = dashboard.topic_views().await;
    assert_eq!(views[1].action, TopicAction::Generating);

    // The polling loop picks up the finished render.
    let handle = dashboard.spawn();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let views = dashboard.topic_views().await;
            if matches!(views[1].action, TopicAction::Watch { .. }) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    dashboard.shutdown();
    handle.await.unwrap();
}
