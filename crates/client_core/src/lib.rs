use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::{PredictionResult, ServiceStatus},
    error::{ErrorInfo, PREDICTION_FALLBACK_MESSAGE},
    protocol::{FailureBody, HealthResponse, PredictResponse, HEALTH_PATH, PREDICT_PATH, UPLOAD_FIELD},
};
use thiserror::Error;
use tracing::{info, warn};

pub mod config;
pub mod controller;
pub mod loader;
pub mod session;
pub mod stages;

pub use config::{load_config, ClientConfig};
pub use controller::SessionController;
pub use loader::{ImageAsset, ImageCandidate};
pub use session::{SessionEvent, SessionState};
pub use stages::{ProgressSource, Stage, TimedStages};

#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("prediction request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("prediction service responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("malformed prediction response: {0}")]
    MalformedBody(String),
    #[error("failed to build upload payload: {0}")]
    Payload(String),
}

impl RequestFailure {
    /// Server-supplied message when one came back, the generic fallback
    /// otherwise.
    pub fn user_message(&self) -> &str {
        match self {
            RequestFailure::Status {
                message: Some(message),
                ..
            } => message.as_str(),
            _ => PREDICTION_FALLBACK_MESSAGE,
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::new(self.user_message())
    }
}

#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, asset: &ImageAsset) -> Result<PredictionResult, RequestFailure>;
}

/// Talks to the classification service over HTTP. Issues exactly one request
/// per call; nothing is retried.
pub struct PredictionClient {
    http: Client,
    config: ClientConfig,
}

impl PredictionClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_http(Client::new(), config)
    }

    pub fn with_http(http: Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    pub async fn health(&self) -> Result<ServiceStatus, RequestFailure> {
        let response = self
            .http
            .get(self.config.endpoint(HEALTH_PATH))
            .send()
            .await
            .map_err(RequestFailure::Transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(RequestFailure::Transport)?;
        if !status.is_success() {
            return Err(RequestFailure::Status {
                status: status.as_u16(),
                message: FailureBody::message_from_bytes(&body),
            });
        }
        let health: HealthResponse = serde_json::from_slice(&body)
            .map_err(|e| RequestFailure::MalformedBody(e.to_string()))?;
        Ok(health.status)
    }

    fn upload_form(asset: &ImageAsset) -> Result<Form, RequestFailure> {
        let part = Part::bytes(asset.bytes.clone())
            .file_name(asset.file_name.clone())
            .mime_str(&asset.media_type)
            .map_err(|e| RequestFailure::Payload(e.to_string()))?;
        Ok(Form::new().part(UPLOAD_FIELD, part))
    }
}

#[async_trait]
impl PredictionService for PredictionClient {
    async fn predict(&self, asset: &ImageAsset) -> Result<PredictionResult, RequestFailure> {
        let endpoint = self.config.endpoint(PREDICT_PATH);
        info!(
            endpoint = %endpoint,
            file_name = %asset.file_name,
            size_bytes = asset.bytes.len(),
            "submitting image for classification"
        );

        let response = self
            .http
            .post(&endpoint)
            .multipart(Self::upload_form(asset)?)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "classification request did not complete");
                RequestFailure::Transport(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(RequestFailure::Transport)?;
        if !status.is_success() {
            let message = FailureBody::message_from_bytes(&body);
            warn!(status = status.as_u16(), ?message, "classification rejected");
            return Err(RequestFailure::Status {
                status: status.as_u16(),
                message,
            });
        }

        let result: PredictResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "classification response did not parse");
            RequestFailure::MalformedBody(e.to_string())
        })?;
        info!(title = %result.title, "classification succeeded");
        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
