use serde::{Deserialize, Serialize};

use crate::domain::{PredictionResult, ServiceStatus};

/// Body of a `200` response from `POST /predict`.
pub type PredictResponse = PredictionResult;

/// Optional body of a non-2xx response. Every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FailureBody {
    /// Parses a raw failure body; anything that is not a JSON object with a
    /// string `message` yields `None`.
    pub fn message_from_bytes(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<FailureBody>(body)
            .ok()
            .and_then(|body| body.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
}

pub const PREDICT_PATH: &str = "/predict";
pub const HEALTH_PATH: &str = "/health";
pub const UPLOAD_FIELD: &str = "file";
