use opinion_common::generate::GenerateConfig;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "llama3.1:70b-instruct-q6_K";

/// Settings for the commands that talk to the model.
///
/// Everything has a default, so an empty environment talks to a local
/// endpoint on its standard port.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model name sent with every request (`GENERATE_MODEL`).
    pub model: String,
    pub generate: GenerateConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `GENERATE_MODEL`: model name
    /// - `GENERATE_URL`, `GENERATE_TIMEOUT_SECS`, `GENERATE_MAX_RETRIES`,
    ///   `GENERATE_RETRY_INITIAL_MS`, `GENERATE_RETRY_MAX_MS`,
    ///   `GENERATE_MAX_ERROR_BODY_BYTES`: see [`GenerateConfig::from_env`]
    pub fn from_env() -> Result<Self, AppError> {
        let model = std::env::var("GENERATE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(model, GenerateConfig::from_env())
    }

    pub fn new(model: String, generate: GenerateConfig) -> Result<Self, AppError> {
        if model.trim().is_empty() {
            return Err(AppError::Config("GENERATE_MODEL must not be empty".to_string()));
        }
        if !(generate.url.starts_with("http://") || generate.url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "GENERATE_URL must be an http(s) URL, got {}",
                generate.url
            )));
        }
        Ok(Self { model, generate })
    }

    /// `--model` wins over the environment.
    pub fn with_model_override(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_model() {
        let err = Config::new("  ".to_string(), GenerateConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let generate = GenerateConfig {
            url: "localhost:11434/api/generate".to_string(),
            ..GenerateConfig::default()
        };
        assert!(Config::new(DEFAULT_MODEL.to_string(), generate).is_err());
    }

    #[test]
    fn test_model_override() {
        let config = Config::new(DEFAULT_MODEL.to_string(), GenerateConfig::default()).unwrap();
        let config = config.with_model_override(Some("mistral".to_string()));
        assert_eq!(config.model, "mistral");
        let config = config.with_model_override(None);
        assert_eq!(config.model, "mistral");
    }
}
