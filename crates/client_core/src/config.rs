use std::{collections::HashMap, fs, path::Path, time::Duration};

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STAGE_DWELL_MS: u64 = 700;
pub const CONFIG_FILE_NAME: &str = "classifier.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid classifier base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("classifier base url '{0}' must use http or https")]
    UnsupportedScheme(String),
}

/// Connection settings for the classification service, resolved once at
/// startup and handed to the prediction client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    pub stage_dwell: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            stage_dwell: Duration::from_millis(DEFAULT_STAGE_DWELL_MS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            ..Self::default()
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Defaults, then `classifier.toml` in the working directory, then the
/// environment. An unusable value is logged and skipped.
pub fn load_config() -> ClientConfig {
    load_config_from(Path::new(CONFIG_FILE_NAME), |key| std::env::var(key).ok())
}

pub(crate) fn load_config_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientConfig {
    let mut config = ClientConfig::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("base_url").and_then(toml::Value::as_str) {
                    apply_base_url(&mut config, v);
                }
                if let Some(v) = file_cfg.get("stage_dwell_ms").and_then(toml::Value::as_integer) {
                    if let Ok(ms) = u64::try_from(v) {
                        config.stage_dwell = Duration::from_millis(ms);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "ignoring unreadable config file")
            }
        }
    }

    if let Some(v) = env("BACK_END_URL") {
        apply_base_url(&mut config, &v);
    }
    if let Some(v) = env("APP__BASE_URL") {
        apply_base_url(&mut config, &v);
    }

    if let Some(v) = env("APP__STAGE_DWELL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            config.stage_dwell = Duration::from_millis(parsed);
        }
    }

    config
}

fn apply_base_url(config: &mut ClientConfig, raw: &str) {
    if raw.trim().is_empty() {
        return;
    }
    match normalize_base_url(raw) {
        Ok(url) => config.base_url = url,
        Err(err) => tracing::warn!(error = %err, "keeping previous classifier base url"),
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|source| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn temp_config(contents: &str) -> std::path::PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("classifier_config_test_{suffix}.toml"));
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn falls_back_to_localhost_default() {
        let config = load_config_from(Path::new("does-not-exist.toml"), no_env);
        assert_eq!(config.base_url(), "http://localhost:8000");
        assert_eq!(config.stage_dwell, Duration::from_millis(700));
        assert_eq!(config.endpoint("/predict"), "http://localhost:8000/predict");
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let config = ClientConfig::new("https://signs.example.com/api/").expect("config");
        assert_eq!(
            config.endpoint("/predict"),
            "https://signs.example.com/api/predict"
        );
    }

    #[test]
    fn rejects_non_http_schemes_and_garbage() {
        assert!(matches!(
            ClientConfig::new("ftp://example.com"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let path = temp_config("base_url = \"http://file-host:9000\"\nstage_dwell_ms = 5\n");
        let config = load_config_from(&path, |key| match key {
            "BACK_END_URL" => Some("http://env-host:8100".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url(), "http://env-host:8100");
        assert_eq!(config.stage_dwell, Duration::from_millis(5));
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn invalid_env_url_keeps_previous_value() {
        let config = load_config_from(Path::new("does-not-exist.toml"), |key| match key {
            "APP__BASE_URL" => Some("::::".to_string()),
            "APP__STAGE_DWELL_MS" => Some("fast".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.stage_dwell, Duration::from_millis(DEFAULT_STAGE_DWELL_MS));
    }
}
