//! Orchestrates loader, stages and prediction into one session and publishes
//! the resulting state to whoever renders it.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::error::ErrorInfo;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    loader::{self, ImageCandidate},
    session::{reduce, RunId, SessionEvent, SessionState},
    stages::{ProgressSource, TimedStages},
    PredictionClient, PredictionService,
};

pub struct SessionController {
    predictor: Arc<dyn PredictionService>,
    progress: Arc<dyn ProgressSource>,
    state: watch::Sender<SessionState>,
    selection_epoch: AtomicU64,
    next_run: AtomicU64,
    /// Run that currently owns the session, zero when none. A reset releases
    /// it even though the abandoned run keeps going.
    active_run: AtomicU64,
}

impl SessionController {
    pub fn new(config: ClientConfig) -> Arc<Self> {
        let progress = Arc::new(TimedStages::new(config.stage_dwell));
        Self::new_with_dependencies(Arc::new(PredictionClient::new(config)), progress)
    }

    pub fn new_with_dependencies(
        predictor: Arc<dyn PredictionService>,
        progress: Arc<dyn ProgressSource>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        Arc::new(Self {
            predictor,
            progress,
            state,
            selection_epoch: AtomicU64::new(0),
            next_run: AtomicU64::new(0),
            active_run: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.active_run.load(Ordering::SeqCst) != 0
    }

    fn apply(&self, event: SessionEvent) -> SessionState {
        self.state.send_if_modified(|state| {
            let next = reduce(state, event);
            if next == *state {
                return false;
            }
            debug!(from = state.name(), to = next.name(), "session transition");
            *state = next;
            true
        });
        self.state()
    }

    /// Validates and previews `candidate`. A rejected file leaves the session
    /// idle with an error; a selection overtaken by a newer one or by a reset
    /// is dropped.
    pub async fn select(&self, candidate: ImageCandidate) -> SessionState {
        let ticket = self.selection_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let file_name = candidate.file_name.clone();

        match loader::load(candidate).await {
            Ok(asset) => {
                if self.selection_epoch.load(Ordering::SeqCst) != ticket {
                    debug!(file_name = %file_name, "discarding superseded selection");
                    return self.state();
                }
                info!(file_name = %file_name, size_bytes = asset.bytes.len(), "image selected");
                self.apply(SessionEvent::Selected(Arc::new(asset)))
            }
            Err(err) => {
                warn!(file_name = %file_name, error = %err, "image selection rejected");
                self.apply(SessionEvent::Rejected(err.to_error_info()))
            }
        }
    }

    /// Runs every stage, then issues the single prediction request. A no-op
    /// unless an image is held without a result, and while another run owns
    /// the session.
    pub async fn analyze(&self) -> SessionState {
        let current = self.state();
        if !current.can_trigger() {
            debug!(state = current.name(), "nothing to analyze");
            return current;
        }

        let run = RunId(self.next_run.fetch_add(1, Ordering::SeqCst) + 1);
        if self
            .active_run
            .compare_exchange(0, run.0, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("analysis already in flight; ignoring trigger");
            return self.state();
        }

        let _guard = RunGuard {
            controller: self,
            run,
        };

        let staged = self.apply(SessionEvent::Trigger { run });
        let asset = match (&staged, staged.asset()) {
            (SessionState::Staging { run: staged_run, .. }, Some(asset)) if *staged_run == run => {
                asset.clone()
            }
            _ => {
                debug!(state = staged.name(), "trigger superseded before staging");
                return staged;
            }
        };
        info!(run = run.0, file_name = %asset.file_name, "analysis started");

        self.progress
            .run(&mut |stage, index| {
                debug!(run = run.0, index, stage = stage.text(), "stage");
                self.apply(SessionEvent::StageTick { run, index });
            })
            .await;

        let awaiting = self.apply(SessionEvent::StagesComplete { run });
        if awaiting.run() != Some(run) {
            info!(run = run.0, "session moved on during staging; skipping request");
            return awaiting;
        }

        let outcome = self
            .predictor
            .predict(&asset)
            .await
            .map_err(|failure| {
                warn!(run = run.0, error = %failure, "prediction failed");
                failure.to_error_info()
            });
        self.apply(SessionEvent::Resolved { run, outcome })
    }

    /// Drops the asset, result, error and any staging progress. In-flight
    /// timers or requests keep running but their completions are ignored.
    pub fn reset(&self) -> SessionState {
        self.selection_epoch.fetch_add(1, Ordering::SeqCst);
        self.active_run.store(0, Ordering::SeqCst);
        info!("session reset");
        self.apply(SessionEvent::Reset)
    }
}

/// Releases the session however `analyze` ends, unless a reset already
/// handed it to a newer run. A run that never delivered an outcome is failed
/// so the session stops loading.
struct RunGuard<'a> {
    controller: &'a SessionController,
    run: RunId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let unresolved = self.controller.state.borrow().run() == Some(self.run);
        if unresolved {
            warn!(run = self.run.0, "analysis ended without an outcome");
            self.controller.apply(SessionEvent::Abandoned {
                run: self.run,
                error: ErrorInfo::prediction_fallback(),
            });
        }
        let _ = self.controller.active_run.compare_exchange(
            self.run.0,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
