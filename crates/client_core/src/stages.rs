//! Simulated analysis progress.
//!
//! The stages are cosmetic: they advance on a fixed timer and never look at
//! the prediction request. Anything that reports progress goes through
//! [`ProgressSource`], so a source driven by real request milestones can
//! replace [`TimedStages`] without touching the controller.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::DEFAULT_STAGE_DWELL_MS;

pub const STAGE_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Connecting,
    Capturing,
    Detecting,
    Processing,
    CrossReferencing,
    Generating,
}

impl Stage {
    pub const ALL: [Stage; STAGE_COUNT] = [
        Stage::Connecting,
        Stage::Capturing,
        Stage::Detecting,
        Stage::Processing,
        Stage::CrossReferencing,
        Stage::Generating,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn text(self) -> &'static str {
        match self {
            Stage::Connecting => "Connecting to Traffic AI...",
            Stage::Capturing => "Capturing Image Data...",
            Stage::Detecting => "Detecting Sign Elements...",
            Stage::Processing => "Processing Traffic Rules...",
            Stage::CrossReferencing => "Cross-referencing Database...",
            Stage::Generating => "Generating Results...",
        }
    }

    /// Icon name for renderers.
    pub fn tag(self) -> &'static str {
        match self {
            Stage::Connecting => "route",
            Stage::Capturing => "camera",
            Stage::Detecting => "eye",
            Stage::Processing => "navigation",
            Stage::CrossReferencing => "map-pin",
            Stage::Generating => "target",
        }
    }
}

pub type TickFn<'a> = dyn FnMut(Stage, usize) + Send + 'a;

#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Reports every stage in order and resolves after the last one.
    async fn run(&self, on_tick: &mut TickFn<'_>);
}

/// Holds each stage for a fixed dwell before moving on.
#[derive(Debug, Clone)]
pub struct TimedStages {
    dwell: Duration,
}

impl Default for TimedStages {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_STAGE_DWELL_MS))
    }
}

impl TimedStages {
    pub fn new(dwell: Duration) -> Self {
        Self { dwell }
    }
}

#[async_trait]
impl ProgressSource for TimedStages {
    async fn run(&self, on_tick: &mut TickFn<'_>) {
        for stage in Stage::ALL {
            on_tick(stage, stage.index());
            tokio::time::sleep(self.dwell).await;
        }
    }
}

#[cfg(test)]
#[path = "tests/stages_tests.rs"]
mod tests;
