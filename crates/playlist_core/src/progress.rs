//! crates/playlist_core/src/progress.rs
//!
//! Simulated upload progress. The upload is a single request with no progress
//! reporting, so the bar creeps up on a timer and only reaches 100 once the
//! backend acknowledges the file.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::Phase;
use crate::machine::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub tick: Duration,
    pub step: u8,
    /// Highest value reached while the request is still in flight.
    pub cap: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            step: 10,
            cap: 90,
        }
    }
}

pub fn next_progress(current: u8, settings: &ProgressSettings) -> u8 {
    current.saturating_add(settings.step).min(settings.cap)
}

/// Ticks until `token` is cancelled or the job identified by `epoch` stops uploading.
pub(crate) fn spawn_ticker(
    shared: Arc<Mutex<Shared>>,
    epoch: u64,
    settings: ProgressSettings,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + settings.tick, settings.tick);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticks.tick() => {
                    let mut shared = shared.lock().await;
                    if shared.state.epoch != epoch || shared.state.phase != Phase::Uploading {
                        break;
                    }
                    shared.state.progress = next_progress(shared.state.progress, &settings);
                    debug!(progress = shared.state.progress, "Upload progress");
                }
            }
        }
    })
}
