//! Session state and the pure transition function that drives it.

use std::sync::Arc;

use shared::{domain::PredictionResult, error::ErrorInfo};

use crate::{loader::ImageAsset, stages::STAGE_COUNT};

/// Identifies one analysis run so that completions of an abandoned run can
/// be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle {
        error: Option<ErrorInfo>,
    },
    Previewing {
        asset: Arc<ImageAsset>,
    },
    Staging {
        asset: Arc<ImageAsset>,
        run: RunId,
        stage_index: usize,
    },
    Awaiting {
        asset: Arc<ImageAsset>,
        run: RunId,
    },
    Succeeded {
        asset: Arc<ImageAsset>,
        result: PredictionResult,
    },
    Failed {
        asset: Arc<ImageAsset>,
        error: ErrorInfo,
    },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle { error: None }
    }
}

impl SessionState {
    pub fn asset(&self) -> Option<&Arc<ImageAsset>> {
        match self {
            SessionState::Idle { .. } => None,
            SessionState::Previewing { asset }
            | SessionState::Staging { asset, .. }
            | SessionState::Awaiting { asset, .. }
            | SessionState::Succeeded { asset, .. }
            | SessionState::Failed { asset, .. } => Some(asset),
        }
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            SessionState::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            SessionState::Idle { error } => error.as_ref(),
            SessionState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Zero whenever no run is staging.
    pub fn stage_index(&self) -> usize {
        match self {
            SessionState::Staging { stage_index, .. } => *stage_index,
            _ => 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            SessionState::Staging { .. } | SessionState::Awaiting { .. }
        )
    }

    pub fn run(&self) -> Option<RunId> {
        match self {
            SessionState::Staging { run, .. } | SessionState::Awaiting { run, .. } => Some(*run),
            _ => None,
        }
    }

    /// An asset is held and no result is shown yet.
    pub fn can_trigger(&self) -> bool {
        matches!(
            self,
            SessionState::Previewing { .. } | SessionState::Failed { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle { .. } => "idle",
            SessionState::Previewing { .. } => "previewing",
            SessionState::Staging { .. } => "staging",
            SessionState::Awaiting { .. } => "awaiting",
            SessionState::Succeeded { .. } => "succeeded",
            SessionState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A valid image finished loading.
    Selected(Arc<ImageAsset>),
    /// The selected file was refused before any asset was built. A held
    /// image stays, any result is dropped.
    Rejected(ErrorInfo),
    Trigger {
        run: RunId,
    },
    StageTick {
        run: RunId,
        index: usize,
    },
    StagesComplete {
        run: RunId,
    },
    Resolved {
        run: RunId,
        outcome: Result<PredictionResult, ErrorInfo>,
    },
    /// The run ended without delivering an outcome.
    Abandoned {
        run: RunId,
        error: ErrorInfo,
    },
    Reset,
}

/// Applies `event` to `state`. Events that do not fit the current state
/// (including completions tagged with a stale run) leave it unchanged.
pub fn reduce(state: &SessionState, event: SessionEvent) -> SessionState {
    use SessionState as S;

    match (state, event) {
        (_, SessionEvent::Reset) => S::default(),

        (current, SessionEvent::Selected(asset)) if !current.is_loading() => {
            S::Previewing { asset }
        }
        (S::Idle { .. }, SessionEvent::Rejected(error)) => S::Idle { error: Some(error) },
        (
            S::Previewing { asset } | S::Succeeded { asset, .. } | S::Failed { asset, .. },
            SessionEvent::Rejected(error),
        ) => S::Failed {
            asset: asset.clone(),
            error,
        },

        (S::Previewing { asset } | S::Failed { asset, .. }, SessionEvent::Trigger { run }) => {
            S::Staging {
                asset: asset.clone(),
                run,
                stage_index: 0,
            }
        }

        (S::Staging { asset, run, .. }, SessionEvent::StageTick { run: tick_run, index })
            if *run == tick_run && index < STAGE_COUNT =>
        {
            S::Staging {
                asset: asset.clone(),
                run: *run,
                stage_index: index,
            }
        }

        (S::Staging { asset, run, .. }, SessionEvent::StagesComplete { run: done_run })
            if *run == done_run =>
        {
            S::Awaiting {
                asset: asset.clone(),
                run: *run,
            }
        }

        (S::Awaiting { asset, run }, SessionEvent::Resolved { run: resolved_run, outcome })
            if *run == resolved_run =>
        {
            match outcome {
                Ok(result) => S::Succeeded {
                    asset: asset.clone(),
                    result,
                },
                Err(error) => S::Failed {
                    asset: asset.clone(),
                    error,
                },
            }
        }

        (
            S::Staging { asset, run, .. } | S::Awaiting { asset, run },
            SessionEvent::Abandoned {
                run: abandoned_run,
                error,
            },
        ) if *run == abandoned_run => S::Failed {
            asset: asset.clone(),
            error,
        },

        (current, _) => current.clone(),
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
