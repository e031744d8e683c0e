use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct GenerateConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api/generate".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(10_000),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

impl GenerateConfig {
    /// Read `GENERATE_*` variables, falling back to [`Default`] for anything
    /// unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let url = std::env::var("GENERATE_URL").unwrap_or(defaults.url);

        let timeout = std::env::var("GENERATE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_retries = std::env::var("GENERATE_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);

        let initial_backoff = std::env::var("GENERATE_RETRY_INITIAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_backoff);

        let max_backoff = std::env::var("GENERATE_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_backoff);

        let max_error_body_bytes = std::env::var("GENERATE_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_error_body_bytes);

        Self {
            url: url.trim_end_matches('/').to_string(),
            timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Client for a non-streaming `/api/generate` style endpoint.
#[derive(Clone)]
pub struct GenerateClient {
    config: GenerateConfig,
    http: reqwest::Client,
}

impl GenerateClient {
    pub fn new(config: GenerateConfig) -> Result<Self, GenerateError> {
        let http = reqwest::Client::builder()
            .user_agent("opinion-survey")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    /// One completion for `prompt` under `system`. Returns the trimmed text.
    pub async fn generate(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, GenerateError> {
        let request = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };
        let request = &request;
        let text = self
            .request_with_retry(|| async move {
                let resp = self
                    .http
                    .post(&self.config.url)
                    .timeout(self.config.timeout)
                    .json(request)
                    .send()
                    .await?;
                Self::read_completion(resp, self.config.max_error_body_bytes).await
            })
            .await?;

        debug!(model, chars = text.len(), "generation complete");
        Ok(text)
    }

    /// Completion text of a finished response. Blank completions count as
    /// failures so the retry loop asks again.
    async fn read_completion(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<String, GenerateError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::to_upstream_error(resp, max_error_body_bytes).await);
        }
        let bytes = resp.bytes().await?;
        completion_text(status, serde_json::from_slice(&bytes)?)
    }

    async fn to_upstream_error(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> GenerateError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        upstream_error(status, body)
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, GenerateError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, GenerateError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "generate request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// The endpoint can report a model failure inside a 200 body.
fn completion_text(status: StatusCode, body: GenerateResponse) -> Result<String, GenerateError> {
    if let Some(message) = body.error {
        return Err(GenerateError::Upstream { status, message });
    }
    let text = body.response.trim();
    if text.is_empty() {
        return Err(GenerateError::EmptyResponse);
    }
    Ok(text.to_string())
}

fn upstream_error(status: StatusCode, body: String) -> GenerateError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(parsed) => GenerateError::Upstream {
            status,
            message: parsed.error,
        },
        Err(_) => GenerateError::UpstreamBody { status, body },
    }
}

fn should_retry(err: &GenerateError) -> bool {
    match err {
        GenerateError::Request(e) => {
            e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
        }
        GenerateError::Upstream { status, .. } | GenerateError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        GenerateError::EmptyResponse => true,
        GenerateError::InvalidJson(_) => false,
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    u64::from(now.subsec_nanos()) % (max_inclusive + 1)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
}
