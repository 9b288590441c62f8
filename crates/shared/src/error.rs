use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INVALID_FILE_TYPE_MESSAGE: &str = "Please upload a valid image file";
pub const PREDICTION_FALLBACK_MESSAGE: &str = "Failed to predict. Please try again.";

/// Human-readable error shown to the user in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn invalid_file_type() -> Self {
        Self::new(INVALID_FILE_TYPE_MESSAGE)
    }

    pub fn prediction_fallback() -> Self {
        Self::new(PREDICTION_FALLBACK_MESSAGE)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
