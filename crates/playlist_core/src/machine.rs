//! crates/playlist_core/src/machine.rs
//!
//! The upload state machine. It owns the lifecycle of one upload-to-playlist job:
//!
//! ```text
//! idle -> uploading -> analyzing -> generating -> complete
//!            \-> error (upload failed, or the first video failed)
//! ```
//!
//! Every accepted file and every reset starts a new epoch. An epoch also owns a
//! `CancellationToken`; resetting cancels it, which stops the progress ticker and
//! any dashboard built from the job. Responses that come back for an older epoch
//! are dropped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backoff::BackoffPolicy;
use crate::dashboard::{Dashboard, PollSettings};
use crate::domain::{DocumentFile, DocumentOutline, Phase, UploadJob, UploadReceipt, VideoStatus};
use crate::error::{PipelineError, PipelineResult, UPLOAD_FAILED_MESSAGE, VIDEO_FAILED_MESSAGE};
use crate::ports::DocumentService;
use crate::progress::{spawn_ticker, ProgressSettings};
use crate::validation::validate;

//=========================================================================================
// Settings
//=========================================================================================

/// How an acknowledged upload becomes `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Complete right after the upload is acknowledged (after `settle_delay`).
    Immediate,
    /// Walk through `analyzing` and `generating` until the first topic's video is ready.
    AwaitFirstVideo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineSettings {
    pub completion: CompletionMode,
    /// Pause between a full progress bar and the `Complete` phase.
    pub settle_delay: Duration,
    pub progress: ProgressSettings,
    /// Status polling while analyzing/generating.
    pub backoff: BackoffPolicy,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            completion: CompletionMode::Immediate,
            settle_delay: Duration::from_millis(500),
            progress: ProgressSettings::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

//=========================================================================================
// State
//=========================================================================================

/// Snapshot of the machine, replaced field by field under one lock.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MachineState {
    pub phase: Phase,
    pub job: Option<UploadJob>,
    /// 0..=100
    pub progress: u8,
    /// User-visible message for the last failure.
    pub error: Option<String>,
    pub outline: Option<DocumentOutline>,
    pub epoch: u64,
}

impl MachineState {
    pub fn document_id(&self) -> Option<&str> {
        self.job.as_ref().and_then(|job| job.document_id.as_deref())
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        if let Some(job) = self.job.as_mut() {
            job.phase = phase;
        }
    }
}

pub(crate) struct Shared {
    pub(crate) state: MachineState,
    job_token: CancellationToken,
}

/// Phase implied by a freshly fetched outline.
pub fn phase_for_outline(outline: &DocumentOutline) -> Phase {
    if outline.topics.is_empty() {
        return Phase::Analyzing;
    }
    match outline.first_topic().and_then(|t| t.video_status()) {
        Some(VideoStatus::Ready) => Phase::Complete,
        Some(VideoStatus::Error) => Phase::Error,
        _ => Phase::Generating,
    }
}

//=========================================================================================
// The Machine
//=========================================================================================

pub struct UploadMachine {
    api: Arc<dyn DocumentService>,
    settings: MachineSettings,
    shared: Arc<Mutex<Shared>>,
}

impl UploadMachine {
    pub fn new(api: Arc<dyn DocumentService>, settings: MachineSettings) -> Self {
        Self {
            api,
            settings,
            shared: Arc::new(Mutex::new(Shared {
                state: MachineState::default(),
                job_token: CancellationToken::new(),
            })),
        }
    }

    pub async fn snapshot(&self) -> MachineState {
        self.shared.lock().await.state.clone()
    }

    /// Validates and uploads a file.
    ///
    /// Only accepted in `idle` or `error`. A rejected file leaves the phase as it
    /// was and records the validation message; no request is made.
    pub async fn select_file(&self, file: DocumentFile) -> PipelineResult<UploadReceipt> {
        let (epoch, job_token) = {
            let mut shared = self.shared.lock().await;
            if !shared.state.phase.accepts_file() {
                return Err(PipelineError::InvalidTransition {
                    from: shared.state.phase,
                    action: "select a file",
                });
            }
            if let Err(e) = validate(&file) {
                warn!(file = %file.name, mime_type = %file.mime_type, "Rejected file: {}", e);
                shared.state.error = Some(e.to_string());
                return Err(e.into());
            }

            let job_token = Self::start_epoch(&mut shared);
            shared.state.job = Some(UploadJob::for_file(&file));
            shared.state.set_phase(Phase::Uploading);
            (shared.state.epoch, job_token)
        };

        info!(file = %file.name, size = file.size_bytes(), epoch, "Uploading document");
        let ticker_token = job_token.child_token();
        let ticker = spawn_ticker(
            self.shared.clone(),
            epoch,
            self.settings.progress,
            ticker_token.clone(),
        );

        let result = self.api.upload_document(&file).await;
        ticker_token.cancel();
        let _ = ticker.await;

        let receipt = {
            let mut shared = self.shared.lock().await;
            if shared.state.epoch != epoch {
                info!(epoch, "Discarding upload response for a superseded job");
                return Err(PipelineError::Superseded);
            }
            match result {
                Err(e) => {
                    warn!("Upload failed: {}", e);
                    shared.state.progress = 0;
                    shared.state.error = Some(UPLOAD_FAILED_MESSAGE.to_string());
                    shared.state.set_phase(Phase::Error);
                    return Err(PipelineError::Upload(e));
                }
                Ok(receipt) => {
                    shared.state.progress = 100;
                    if let Some(job) = shared.state.job.as_mut() {
                        job.document_id = Some(receipt.document_id.clone());
                    }
                    shared.state.outline = Some(receipt.outline.clone());
                    receipt
                }
            }
        };

        match self.settings.completion {
            CompletionMode::Immediate => {
                tokio::select! {
                    _ = job_token.cancelled() => return Err(PipelineError::Superseded),
                    _ = tokio::time::sleep(self.settings.settle_delay) => {}
                }
                let mut shared = self.shared.lock().await;
                if shared.state.epoch != epoch {
                    return Err(PipelineError::Superseded);
                }
                shared.state.set_phase(Phase::Complete);
            }
            CompletionMode::AwaitFirstVideo => {
                let mut shared = self.shared.lock().await;
                if shared.state.epoch != epoch {
                    return Err(PipelineError::Superseded);
                }
                shared.state.set_phase(Phase::Analyzing);
            }
        }
        info!(document_id = %receipt.document_id, "Upload acknowledged");
        Ok(receipt)
    }

    /// One status poll while analyzing or generating.
    ///
    /// A failed fetch keeps the current state and is returned as `Fetch`.
    pub async fn advance(&self) -> PipelineResult<Phase> {
        let (epoch, document_id) = {
            let shared = self.shared.lock().await;
            match shared.state.phase {
                Phase::Analyzing | Phase::Generating => {}
                Phase::Complete | Phase::Error => return Ok(shared.state.phase),
                from => {
                    return Err(PipelineError::InvalidTransition {
                        from,
                        action: "poll job status",
                    })
                }
            }
            let document_id = shared.state.document_id().map(str::to_string).ok_or(
                PipelineError::InvalidTransition {
                    from: shared.state.phase,
                    action: "poll job status",
                },
            )?;
            (shared.state.epoch, document_id)
        };

        let result = self.api.get_document_status(&document_id).await;

        let mut shared = self.shared.lock().await;
        if shared.state.epoch != epoch {
            return Err(PipelineError::Superseded);
        }
        let outline = result.map_err(|e| {
            warn!(%document_id, "Status poll failed, keeping last state: {}", e);
            PipelineError::Fetch(e)
        })?;

        let next = phase_for_outline(&outline);
        if shared.state.outline.as_ref() != Some(&outline) {
            shared.state.outline = Some(outline);
        }
        if next == Phase::Error {
            shared.state.error = Some(VIDEO_FAILED_MESSAGE.to_string());
        }
        if next != shared.state.phase {
            info!(%document_id, from = %shared.state.phase, to = %next, "Job phase changed");
            shared.state.set_phase(next);
        }
        Ok(next)
    }

    /// Polls until the job is `complete` or `error`, backing off on fetch failures.
    pub async fn run_to_completion(&self) -> PipelineResult<Phase> {
        let token = self.shared.lock().await.job_token.clone();
        let mut failures = 0u32;
        loop {
            match self.advance().await {
                Ok(phase @ (Phase::Complete | Phase::Error)) => return Ok(phase),
                Ok(_) => failures = 0,
                Err(PipelineError::Fetch(_)) => failures = failures.saturating_add(1),
                Err(e) => return Err(e),
            }
            let delay = self.settings.backoff.delay_after(failures);
            tokio::select! {
                _ = token.cancelled() => return Err(PipelineError::Superseded),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Back to `idle`. Stops the job's timers and dashboard; late responses are ignored.
    pub async fn reset(&self) {
        let mut shared = self.shared.lock().await;
        Self::start_epoch(&mut shared);
        info!(epoch = shared.state.epoch, "Upload reset");
    }

    /// Builds the dashboard for the completed job. It is shut down with the job.
    pub async fn dashboard(&self, settings: PollSettings) -> PipelineResult<Dashboard> {
        let shared = self.shared.lock().await;
        let document_id = match (shared.state.phase, shared.state.document_id()) {
            (Phase::Complete, Some(id)) => id.to_string(),
            (from, _) => {
                return Err(PipelineError::InvalidTransition {
                    from,
                    action: "open the dashboard",
                })
            }
        };
        Ok(Dashboard::with_token(
            self.api.clone(),
            document_id,
            settings,
            shared.job_token.child_token(),
        ))
    }

    /// Cancels the current epoch and clears the state.
    fn start_epoch(shared: &mut Shared) -> CancellationToken {
        shared.job_token.cancel();
        shared.job_token = CancellationToken::new();
        let epoch = shared.state.epoch + 1;
        shared.state = MachineState {
            epoch,
            ..MachineState::default()
        };
        shared.job_token.clone()
    }
}
