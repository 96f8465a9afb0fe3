/// Language-model explanation client.
///
/// The explanation feature sends one site's representative measurements, its
/// historical event count, and the user's free-text question to the Anthropic
/// Messages API and returns the answer verbatim. The model's output content
/// carries no correctness guarantee; this module only guarantees transport:
/// a bounded timeout, no silent retries, and classified failures.
///
/// The `ExplanationProvider` trait is the seam the query service is built
/// against, so tests and development run with a canned provider instead of
/// live credentials (see `dev_mode::CannedExplainer`).

use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

use crate::model::AggregateSnapshot;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model, overridable in the config file.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Default bound on the end-to-end call. The Messages API usually answers in
/// a few seconds; anything past this is surfaced as a timeout failure.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the explanation call, classified for logging. All variants
/// map to the same client-facing upstream error.
#[derive(Debug)]
pub enum LlmError {
    /// Connection failure or timeout before a response arrived.
    Transport(String),
    /// Non-2xx HTTP response (auth, rate limit, server error).
    Http(u16),
    /// The response arrived but did not have the expected shape.
    Parse(String),
    /// No API key configured.
    MissingApiKey,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Transport(msg) => write!(f, "transport failure: {}", msg),
            LlmError::Http(status) => write!(f, "HTTP status {}", status),
            LlmError::Parse(msg) => write!(f, "unexpected response shape: {}", msg),
            LlmError::MissingApiKey => write!(f, "ANTHROPIC_API_KEY is not set"),
        }
    }
}

impl std::error::Error for LlmError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Black-box explanation capability: given a site, its representative
/// measurements, the historical event count, and a question, produce
/// explanatory text.
pub trait ExplanationProvider {
    fn explain(
        &self,
        site: &str,
        snapshot: &AggregateSnapshot,
        event_count: usize,
        question: &str,
    ) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// Anthropic client
// ---------------------------------------------------------------------------

/// Wire shape of the Messages API response, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

pub struct AnthropicExplainer {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl AnthropicExplainer {
    /// Builds a client with an explicit key, model, and timeout.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(AnthropicExplainer {
            client,
            api_key,
            model,
        })
    }

    /// Builds a client from the `ANTHROPIC_API_KEY` environment variable,
    /// loading `.env` first if present.
    pub fn from_env(model: String, timeout: Duration) -> Result<Self, LlmError> {
        dotenv::dotenv().ok();
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
        Self::new(api_key, model, timeout)
    }

    fn build_prompt(
        site: &str,
        snapshot: &AggregateSnapshot,
        event_count: usize,
        question: &str,
    ) -> String {
        format!(
            "Here are today's measurements at site {site}:\n\
             Chl-a: {chl} µg/L; SST: {sst} °C; Turbidity: {turb} NTU; Bloom probability: {prob}.\n\
             There have been {events} previous HAB events reported for this site in the selected period.\n\
             \n\
             User question: {question}\n\
             \n\
             Explain why there is a HAB event prediction and suggest two mitigation steps.",
            site = site,
            chl = snapshot.chl_a,
            sst = snapshot.sst,
            turb = snapshot.turbidity,
            prob = snapshot.probability,
            events = event_count,
            question = question,
        )
    }
}

impl ExplanationProvider for AnthropicExplainer {
    fn explain(
        &self,
        site: &str,
        snapshot: &AggregateSnapshot,
        event_count: usize,
        question: &str,
    ) -> Result<String, LlmError> {
        let prompt = Self::build_prompt(site, snapshot, event_count, question);

        let payload = json!({
            "model": self.model,
            "max_tokens": 1000,
            "temperature": 0.5,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Transport("request timed out".to_string())
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http(status.as_u16()));
        }

        let body: MessagesResponse = response.json().map_err(|e| LlmError::Parse(e.to_string()))?;
        body.content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| LlmError::Parse("empty content array".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
