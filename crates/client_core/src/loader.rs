//! Image selection: media-type validation and preview encoding.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::error::ErrorInfo;
use thiserror::Error;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("declared media type '{0}' is not an image")]
    InvalidFileType(String),
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("preview encoding task failed: {0}")]
    Encode(String),
}

impl LoadError {
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            LoadError::InvalidFileType(_) => ErrorInfo::invalid_file_type(),
            other => ErrorInfo::new(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("preview is not a base64 data url")]
    NotDataUrl,
    #[error("invalid base64 preview payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// A file the user picked, before validation.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageCandidate {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads `path` and guesses the media type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| LoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(FALLBACK_MEDIA_TYPE)
            .to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            file_name,
            media_type,
            bytes,
        })
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Self-contained `data:` URL for direct display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    data_url: String,
}

impl Preview {
    pub(crate) fn encode(media_type: &str, bytes: &[u8]) -> Self {
        Self {
            data_url: format!("data:{media_type};base64,{}", STANDARD.encode(bytes)),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn decode(&self) -> Result<Vec<u8>, PreviewError> {
        let rest = self
            .data_url
            .strip_prefix("data:")
            .ok_or(PreviewError::NotDataUrl)?;
        let (_, payload) = rest.split_once(";base64,").ok_or(PreviewError::NotDataUrl)?;
        Ok(STANDARD.decode(payload)?)
    }
}

/// A validated image ready for preview and upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub preview: Preview,
}

/// Validates the candidate and encodes its preview off the calling task.
pub async fn load(candidate: ImageCandidate) -> Result<ImageAsset, LoadError> {
    if !candidate.is_image() {
        tracing::debug!(media_type = %candidate.media_type, "rejecting non-image selection");
        return Err(LoadError::InvalidFileType(candidate.media_type));
    }

    let ImageCandidate {
        file_name,
        media_type,
        bytes,
    } = candidate;
    tokio::task::spawn_blocking(move || {
        let preview = Preview::encode(&media_type, &bytes);
        ImageAsset {
            file_name,
            media_type,
            bytes,
            preview,
        }
    })
    .await
    .map_err(|err| LoadError::Encode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
