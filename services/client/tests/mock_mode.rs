use client_lib::adapters::mock::{MOCK_DOCUMENT_ID, MOCK_VIDEO_URL};
use client_lib::app::{build_service, machine_settings, poll_settings};
use client_lib::config::Config;
use playlist_core::{DocumentFile, Phase, PipelineError, RefreshOutcome, TopicAction, UploadMachine};
use std::time::Duration;

fn mock_config() -> Config {
    Config {
        mock_mode: true,
        mock_latency: Duration::from_millis(800),
        ..Config::default()
    }
}

#[tokio::test(start_paused = true)]
async fn upload_to_dashboard_without_a_backend() {
    let config = mock_config();
    let api = build_service(&config).unwrap();
    let machine = UploadMachine::new(api, machine_settings(&config, false));

    let file = DocumentFile::new("notes.pdf", "application/pdf", vec![0u8; 2 * 1024 * 1024]);
    let receipt = machine.select_file(file).await.unwrap();
    assert_eq!(receipt.document_id, MOCK_DOCUMENT_ID);

    let state = machine.snapshot().await;
    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.progress, 100);
    assert_eq!(state.outline.as_ref().unwrap().title, "notes");

    let dashboard = machine.dashboard(poll_settings(&config)).await.unwrap();
    dashboard.refresh().await.unwrap();
    let views = dashboard.topic_views().await;
    let actions: Vec<&TopicAction> = views.iter().map(|view| &view.action).collect();
    assert_eq!(
        actions,
        vec![&TopicAction::Generating, &TopicAction::Locked, &TopicAction::Locked]
    );

    // The fixture video is ready on the next read.
    assert!(matches!(
        dashboard.refresh().await.unwrap(),
        RefreshOutcome::Updated { .. }
    ));
    let views = dashboard.topic_views().await;
    assert_eq!(
        views[0].action,
        TopicAction::Watch {
            url: MOCK_VIDEO_URL.to_string()
        }
    );

    let locked = views[2].topic.id.clone();
    assert!(matches!(
        dashboard.request_video(&locked).await,
        Err(PipelineError::AccessDenied { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn unsupported_file_never_reaches_the_mock() {
    let config = mock_config();
    let machine = UploadMachine::new(build_service(&config).unwrap(), machine_settings(&config, false));

    let started = tokio::time::Instant::now();
    let err = machine
        .select_file(DocumentFile::new("photo.png", "image/png", vec![1u8; 16]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Validation(_)));
    assert_eq!(machine.snapshot().await.phase, Phase::Idle);
    assert_eq!(started.elapsed(), Duration::ZERO);
}
