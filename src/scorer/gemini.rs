//! Gemini-backed scorer with automatic retry for transient errors.
//!
//! Talks to the Google Generative Language REST API in JSON mode. The
//! provider-side turn rule lives here: fewer than `MAX_TURNS - 1` recorded
//! turns gets the question prompt, anything more gets the final-assessment
//! prompt whose reply carries no question.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::error::{classify_http_status, RetryConfig, ScorerError, ScorerErrorKind};
use super::{prompt, ScorerClient, ScorerReply, Turn};
use crate::session::MAX_TURNS;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client with automatic retry for transient errors.
pub struct GeminiScorer {
    client: Client,
    api_key: String,
    model: String,
    retry_config: RetryConfig,
}

impl GeminiScorer {
    /// Create a new Gemini scorer. The timeout applies to every request,
    /// covering the whole call including body download.
    pub fn new(api_key: String, model: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            retry_config: RetryConfig::default(),
        })
    }

    /// Override the retry configuration.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Parse Retry-After header if present (seconds form only).
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok().map(Duration::from_secs))
    }

    /// Create a ScorerError from HTTP response status and body.
    fn create_error(
        status: reqwest::StatusCode,
        body: &str,
        retry_after: Option<Duration>,
    ) -> ScorerError {
        let status_code = status.as_u16();
        match classify_http_status(status_code) {
            ScorerErrorKind::RateLimited => ScorerError::rate_limited(body.to_string(), retry_after),
            ScorerErrorKind::ClientError => ScorerError::client_error(status_code, body.to_string()),
            _ => ScorerError::server_error(status_code, body.to_string()),
        }
    }

    /// Execute a single request without retry.
    async fn execute_request(&self, prompt_text: &str) -> Result<ScorerReply, ScorerError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt_text.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        let response = match self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(ScorerError::network_error(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(ScorerError::network_error(format!("Connection failed: {}", e)));
                } else {
                    return Err(ScorerError::network_error(format!("Request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Self::create_error(status, &body, retry_after));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            ScorerError::malformed_reply(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        let text = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                ScorerError::remote_error(
                    "Response had no candidates (generation blocked or empty)".to_string(),
                )
            })?;

        tracing::debug!("Raw scorer text: {}", text);
        decode_reply(&text)
    }

    /// Execute a request with automatic retry for transient errors.
    async fn execute_with_retry(&self, prompt_text: &str) -> Result<ScorerReply, ScorerError> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match self.execute_request(prompt_text).await {
                Ok(reply) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Scorer call succeeded after {} retries (total time: {:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(reply);
                }
                Err(error) => {
                    let should_retry = self.retry_config.should_retry(&error)
                        && attempt < self.retry_config.max_retries;

                    if !should_retry {
                        tracing::error!("Scorer call failed (attempt {}): {}", attempt + 1, error);
                        return Err(error);
                    }

                    let delay = error.suggested_delay(attempt);
                    let remaining = self
                        .retry_config
                        .max_retry_duration
                        .saturating_sub(start.elapsed());
                    let actual_delay = delay.min(remaining);

                    if actual_delay.is_zero() {
                        tracing::warn!(
                            "Retry attempt {} failed, no time remaining: {}",
                            attempt + 1,
                            error
                        );
                        return Err(error);
                    }

                    tracing::warn!(
                        "Scorer attempt {} failed with {}, retrying in {:?}: {}",
                        attempt + 1,
                        error.kind,
                        actual_delay,
                        error.message
                    );

                    tokio::time::sleep(actual_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl ScorerClient for GeminiScorer {
    async fn score(&self, task: &str, history: &[Turn]) -> Result<ScorerReply, ScorerError> {
        let prompt_text = build_prompt(task, history);
        tracing::debug!(
            "Sending scorer request: model={}, turns={}",
            self.model,
            history.len()
        );
        self.execute_with_retry(&prompt_text).await
    }
}

/// Pick the question prompt or the final-assessment prompt from the number
/// of turns already on record.
fn build_prompt(task: &str, history: &[Turn]) -> String {
    if history.len() >= MAX_TURNS - 1 {
        prompt::verdict_prompt(task, history)
    } else {
        prompt::question_prompt(task, history)
    }
}

/// Decode the model's JSON text into a reply.
///
/// Lenient on the score (a missing or wrong-typed `likelihood_score` becomes
/// `None` and gets normalized downstream) but strict on shape: a body that is
/// not a JSON object, or a `question` that is neither a string nor null, is a
/// malformed reply, not something to salvage with pattern matching.
fn decode_reply(text: &str) -> Result<ScorerReply, ScorerError> {
    let stripped = strip_code_fences(text);

    let value: serde_json::Value = serde_json::from_str(stripped).map_err(|e| {
        ScorerError::malformed_reply(format!("Reply is not JSON: {}, text: {}", e, stripped))
    })?;

    let obj = value
        .as_object()
        .ok_or_else(|| ScorerError::malformed_reply(format!("Reply is not a JSON object: {}", stripped)))?;

    let question = match obj.get("question") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(q)) => Some(q.clone()),
        Some(other) => {
            return Err(ScorerError::malformed_reply(format!(
                "Reply question is neither string nor null: {}",
                other
            )))
        }
    };

    let likelihood_score = obj.get("likelihood_score").and_then(|v| v.as_i64());

    Ok(ScorerReply {
        question,
        likelihood_score,
    })
}

/// Drop a surrounding markdown code fence, which some models emit even in
/// JSON mode.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Gemini generateContent request.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini generateContent response (only the fields we read).
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}
