//! services/client/src/app.rs
//!
//! Wiring between configuration, adapters and the core pipeline, plus the
//! plain-text rendering used by the CLI.

use playlist_core::access::{TopicAction, TopicView};
use playlist_core::dashboard::{Dashboard, DashboardState, PollSettings};
use playlist_core::machine::{CompletionMode, MachineSettings};
use playlist_core::ports::DocumentService;
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

use crate::adapters::{HttpDocumentService, MockDocumentService};
use crate::config::Config;
use crate::error::ClientError;

/// Picks the adapter: fixtures in mock mode, the REST backend otherwise.
pub fn build_service(config: &Config) -> Result<Arc<dyn DocumentService>, ClientError> {
    if config.mock_mode {
        info!(latency = ?config.mock_latency, "Mock mode: no requests will leave this process");
        return Ok(Arc::new(MockDocumentService::new(config.mock_latency)));
    }
    info!(api_url = %config.api_url, "Using document backend");
    Ok(Arc::new(HttpDocumentService::new(
        config.api_url.clone(),
        config.request_timeout,
    )?))
}

pub fn machine_settings(config: &Config, staged: bool) -> MachineSettings {
    MachineSettings {
        completion: if staged {
            CompletionMode::AwaitFirstVideo
        } else {
            CompletionMode::Immediate
        },
        backoff: poll_settings(config).backoff(),
        ..MachineSettings::default()
    }
}

pub fn poll_settings(config: &Config) -> PollSettings {
    PollSettings {
        interval: config.poll_interval,
        max_backoff: config.poll_max_backoff,
    }
}

/// Runs the dashboard loop and prints every new snapshot and every failed poll.
///
/// Stops after `max_updates` printed lines of either kind, or on Ctrl-C.
pub async fn watch(dashboard: &Dashboard, max_updates: Option<u32>) -> Result<(), ClientError> {
    let handle = dashboard.spawn();
    let mut printed_revision = 0u64;
    let mut seen_failures = 0u32;
    let mut printed = 0u32;
    let mut ticks = tokio::time::interval(std::time::Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping dashboard");
                break;
            }
            _ = ticks.tick() => {
                let state = dashboard.snapshot().await;
                let failed_again = state.consecutive_failures > seen_failures;
                seen_failures = state.consecutive_failures;
                if state.revision != printed_revision {
                    printed_revision = state.revision;
                    let views = dashboard.topic_views().await;
                    println!("{}", render_dashboard(dashboard.document_id(), &state, &views));
                } else if failed_again {
                    println!("{}", render_poll_failure(&state));
                } else {
                    continue;
                }
                printed += 1;
                if max_updates.is_some_and(|max| printed >= max) {
                    break;
                }
            }
        }
    }

    dashboard.shutdown();
    let _ = handle.await;
    Ok(())
}

pub fn render_poll_failure(state: &DashboardState) -> String {
    format!(
        "Poll {} failed: {}",
        state.consecutive_failures,
        state.last_poll_error.as_deref().unwrap_or("unknown error")
    )
}

pub fn render_dashboard(document_id: &str, state: &DashboardState, views: &[TopicView]) -> String {
    let mut out = String::new();
    let Some(outline) = state.outline.as_ref() else {
        let _ = writeln!(out, "Failed to load document outline");
        return out;
    };

    let _ = writeln!(
        out,
        "{} ({} topics, created {})",
        outline.title,
        outline.topics.len(),
        outline.created_at.format("%Y-%m-%d")
    );
    for view in views {
        let badge = if view.topic.is_first() {
            " [Free]"
        } else if view.topic.is_premium {
            " [Premium]"
        } else {
            ""
        };
        let action = match &view.action {
            TopicAction::Watch { url } => format!("ready     {}", url),
            TopicAction::Generating => "generating...".to_string(),
            TopicAction::Generate => format!("available (doc2video generate {} {})", document_id, view.topic.id),
            TopicAction::Locked => "locked".to_string(),
        };
        let _ = writeln!(
            out,
            "  {}. {}{}  [{}]  {}",
            view.topic.order + 1,
            view.topic.title,
            badge,
            view.topic.id,
            action
        );
    }
    if !state.subscription.is_premium {
        let _ = writeln!(out, "Unlock all videos: doc2video subscribe monthly|yearly");
    }
    if let Some(error) = state.last_poll_error.as_ref() {
        let _ = writeln!(out, "(showing last known state: {})", error);
    }
    out
}
