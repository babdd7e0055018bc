//! crates/playlist_core/src/dashboard.rs
//!
//! The dashboard of a completed job: a cached snapshot of the outline and the
//! subscription, refreshed by an independent polling loop. The snapshot is always
//! replaced wholesale and only after both fetches succeed; a failed poll keeps
//! the last good snapshot on screen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::access::{can_access, topic_views, TopicView};
use crate::backoff::BackoffPolicy;
use crate::domain::{DocumentOutline, GenerationTicket, Plan, SubscriptionState};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::DocumentService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Ceiling for the wait after repeated failures.
    pub max_backoff: Duration,
}

impl PollSettings {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.interval, self.max_backoff)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub outline: Option<DocumentOutline>,
    pub subscription: SubscriptionState,
    /// True until the first refresh settles.
    pub loading: bool,
    /// Bumped each time the snapshot actually changes.
    pub revision: u64,
    pub consecutive_failures: u32,
    pub last_poll_error: Option<String>,
    pub last_action_error: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            outline: None,
            subscription: SubscriptionState::default(),
            loading: true,
            revision: 0,
            consecutive_failures: 0,
            last_poll_error: None,
            last_action_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { revision: u64 },
    Unchanged,
}

#[derive(Clone)]
pub struct Dashboard {
    api: Arc<dyn DocumentService>,
    document_id: String,
    settings: PollSettings,
    state: Arc<Mutex<DashboardState>>,
    /// Sequence of the last outline fetch issued, by any caller.
    issued: Arc<AtomicU64>,
    /// Sequence of the newest fetch whose result reached the snapshot.
    /// Read and written only while `state` is locked.
    applied: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DocumentService>, document_id: impl Into<String>, settings: PollSettings) -> Self {
        Self::with_token(api, document_id.into(), settings, CancellationToken::new())
    }

    pub(crate) fn with_token(
        api: Arc<dyn DocumentService>,
        document_id: String,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            document_id,
            settings,
            state: Arc::new(Mutex::new(DashboardState::default())),
            issued: Arc::new(AtomicU64::new(0)),
            applied: Arc::new(AtomicU64::new(0)),
            cancel,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.lock().await.clone()
    }

    pub async fn topic_views(&self) -> Vec<TopicView> {
        let state = self.state.lock().await;
        match state.outline.as_ref() {
            Some(outline) => topic_views(outline, state.subscription.is_premium),
            None => Vec::new(),
        }
    }

    fn issue_fetch(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// False once a fetch issued after `seq` has been applied.
    fn is_current(&self, seq: u64) -> bool {
        seq > self.applied.load(Ordering::SeqCst)
    }

    /// Fetches outline and subscription concurrently and swaps in the result.
    ///
    /// A result that lands after a later-issued fetch was applied is dropped
    /// as `Superseded`.
    pub async fn refresh(&self) -> PipelineResult<RefreshOutcome> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let seq = self.issue_fetch();
        let (outline, subscription) = tokio::join!(
            self.api.get_document_status(&self.document_id),
            self.api.check_subscription()
        );

        let mut state = self.state.lock().await;
        if self.cancel.is_cancelled() {
            debug!(document_id = %self.document_id, "Dropping poll response after shutdown");
            return Err(PipelineError::Cancelled);
        }
        if !self.is_current(seq) {
            debug!(document_id = %self.document_id, seq, "Dropping poll response overtaken by a newer one");
            return Err(PipelineError::Superseded);
        }
        state.loading = false;

        let (outline, subscription) = match (outline, subscription) {
            (Ok(outline), Ok(subscription)) => (outline, subscription),
            (Err(e), _) | (_, Err(e)) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.last_poll_error = Some(e.to_string());
                warn!(
                    document_id = %self.document_id,
                    failures = state.consecutive_failures,
                    "Poll failed, keeping last snapshot: {}",
                    e
                );
                return Err(PipelineError::Fetch(e));
            }
        };

        self.applied.store(seq, Ordering::SeqCst);
        state.consecutive_failures = 0;
        state.last_poll_error = None;
        if state.outline.as_ref() == Some(&outline) && state.subscription == subscription {
            return Ok(RefreshOutcome::Unchanged);
        }
        state.outline = Some(outline);
        state.subscription = subscription;
        state.revision += 1;
        debug!(document_id = %self.document_id, revision = state.revision, "Snapshot updated");
        Ok(RefreshOutcome::Updated {
            revision: state.revision,
        })
    }

    /// Polls until shut down: immediately, then every interval, backing off after failures.
    pub async fn run(&self) {
        info!(document_id = %self.document_id, "Dashboard polling started");
        let backoff = self.settings.backoff();
        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.refresh() => result,
            };
            let failures = match result {
                Ok(_) => 0,
                Err(PipelineError::Cancelled) => break,
                Err(_) => self.state.lock().await.consecutive_failures,
            };
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff.delay_after(failures)) => {}
            }
        }
        info!(document_id = %self.document_id, "Dashboard polling stopped");
    }

    pub fn spawn(&self) -> JoinHandle<()> {
        let dashboard = self.clone();
        tokio::spawn(async move { dashboard.run().await })
    }

    /// Stops polling. Responses still in flight are discarded.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Requests a topic's video, if the gate allows it.
    ///
    /// A locked topic is refused without contacting the backend. On success the
    /// outline is re-read once; the video itself shows up in later polls.
    pub async fn request_video(&self, topic_id: &str) -> PipelineResult<GenerationTicket> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        {
            let state = self.state.lock().await;
            let topic = state
                .outline
                .as_ref()
                .and_then(|outline| outline.topic(topic_id))
                .ok_or_else(|| PipelineError::UnknownTopic(topic_id.to_string()))?;
            if !can_access(topic, state.subscription.is_premium) {
                return Err(PipelineError::AccessDenied {
                    topic_id: topic_id.to_string(),
                });
            }
        }

        let result = self.api.generate_video(topic_id).await;
        if self.cancel.is_cancelled() {
            debug!(topic_id, "Dropping video request response after shutdown");
            return Err(PipelineError::Cancelled);
        }
        let ticket = match result {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(topic_id, "Video request failed: {}", e);
                let err = PipelineError::GenerationRequest {
                    topic_id: topic_id.to_string(),
                    source: e,
                };
                let mut state = self.state.lock().await;
                if self.cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                state.last_action_error = Some(err.user_message());
                return Err(err);
            }
        };
        info!(topic_id, video_id = %ticket.video_id, "Video requested");

        let seq = self.issue_fetch();
        let reread = self.api.get_document_status(&self.document_id).await;
        let mut state = self.state.lock().await;
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        state.last_action_error = None;
        match reread {
            Ok(outline) if self.is_current(seq) => {
                self.applied.store(seq, Ordering::SeqCst);
                if state.outline.as_ref() != Some(&outline) {
                    state.outline = Some(outline);
                    state.revision += 1;
                }
            }
            Ok(_) => debug!(topic_id, seq, "Outline re-read overtaken by a newer poll"),
            Err(e) => warn!(topic_id, "Outline re-read after video request failed: {}", e),
        }
        Ok(ticket)
    }

    /// Upgrades the account, then refreshes so the gate sees the new entitlement.
    pub async fn subscribe(&self, plan: Plan) -> PipelineResult<()> {
        self.api
            .subscribe(plan)
            .await
            .map_err(PipelineError::Subscription)?;
        info!(%plan, "Subscription started");
        if let Err(e) = self.refresh().await {
            warn!("Refresh after subscribing failed: {}", e);
        }
        Ok(())
    }
}
