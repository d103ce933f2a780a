//! Scorer error types with retry classification.
//!
//! Distinguishes transient failures (retried automatically, then surfaced as
//! recoverable) from permanent ones. No scorer error is fatal: the session
//! state machine parks where it is and the user can retry the turn.

use std::time::Duration;

/// Error from a scorer call.
#[derive(Debug)]
pub struct ScorerError {
    /// The kind of error
    pub kind: ScorerErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message
    pub message: String,
    /// Suggested retry delay (from Retry-After header, when present)
    pub retry_after: Option<Duration>,
}

impl ScorerError {
    /// Create a rate limit error.
    pub fn rate_limited(message: String, retry_after: Option<Duration>) -> Self {
        Self {
            kind: ScorerErrorKind::RateLimited,
            status_code: Some(429),
            message,
            retry_after,
        }
    }

    /// Create a server error.
    pub fn server_error(status_code: u16, message: String) -> Self {
        Self {
            kind: ScorerErrorKind::ServerError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    /// Create a client error (bad request, auth, etc.).
    pub fn client_error(status_code: u16, message: String) -> Self {
        Self {
            kind: ScorerErrorKind::ClientError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    /// Create a network error (connection failure or timeout).
    pub fn network_error(message: String) -> Self {
        Self {
            kind: ScorerErrorKind::NetworkError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Create a malformed-reply error (success status but undecodable body).
    pub fn malformed_reply(message: String) -> Self {
        Self {
            kind: ScorerErrorKind::MalformedReply,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Create a remote error (the provider answered but produced no usable
    /// content, e.g. a safety-blocked generation).
    pub fn remote_error(message: String) -> Self {
        Self {
            kind: ScorerErrorKind::RemoteError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Check if this error is transient and worth retrying automatically.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Get the suggested delay before retry.
    ///
    /// Returns `retry_after` if set, otherwise exponential backoff with a
    /// small deterministic jitter, capped at 60 seconds.
    pub fn suggested_delay(&self, attempt: u32) -> Duration {
        if let Some(retry_after) = self.retry_after {
            return retry_after;
        }

        let base_delay = match self.kind {
            ScorerErrorKind::RateLimited => Duration::from_secs(5),
            ScorerErrorKind::ServerError => Duration::from_secs(2),
            _ => Duration::from_secs(1),
        };

        let multiplier = 2u64.saturating_pow(attempt);
        let delay_secs = base_delay.as_secs().saturating_mul(multiplier);

        let jitter_range = delay_secs / 4;
        let jitter = if jitter_range > 0 {
            (attempt as u64 * 7) % jitter_range
        } else {
            0
        };

        Duration::from_secs((delay_secs + jitter).min(60))
    }
}

impl std::fmt::Display for ScorerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ScorerError {}

/// Classification of scorer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerErrorKind {
    /// Rate limited (429) - transient, retry with backoff
    RateLimited,
    /// Server error (500, 502, 503, 504) - transient
    ServerError,
    /// Client error (400, 401, 403, 404) - permanent, fix the request or key
    ClientError,
    /// Network error (connection failed, timeout) - transient
    NetworkError,
    /// Success status but the body was not a JSON object - transient, the
    /// model may well produce valid JSON on the next attempt
    MalformedReply,
    /// The provider answered but its own generation failed (no candidates,
    /// safety block) - not auto-retried, but the turn stays retryable
    RemoteError,
}

impl ScorerErrorKind {
    /// Check if this error kind is transient (retried automatically).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScorerErrorKind::RateLimited
                | ScorerErrorKind::ServerError
                | ScorerErrorKind::NetworkError
                | ScorerErrorKind::MalformedReply
        )
    }
}

impl std::fmt::Display for ScorerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerErrorKind::RateLimited => write!(f, "Rate limited"),
            ScorerErrorKind::ServerError => write!(f, "Server error"),
            ScorerErrorKind::ClientError => write!(f, "Client error"),
            ScorerErrorKind::NetworkError => write!(f, "Network error"),
            ScorerErrorKind::MalformedReply => write!(f, "Malformed reply"),
            ScorerErrorKind::RemoteError => write!(f, "Remote error"),
        }
    }
}

/// Configuration for automatic retry of transient scorer errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Maximum total time to spend retrying
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_retry_duration: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Check if the given error should be retried based on this config.
    pub fn should_retry(&self, error: &ScorerError) -> bool {
        error.is_transient()
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> ScorerErrorKind {
    match status {
        429 => ScorerErrorKind::RateLimited,
        500 | 502 | 503 | 504 => ScorerErrorKind::ServerError,
        400..=499 => ScorerErrorKind::ClientError,
        _ => ScorerErrorKind::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScorerErrorKind::RateLimited.is_transient());
        assert!(ScorerErrorKind::ServerError.is_transient());
        assert!(ScorerErrorKind::NetworkError.is_transient());
        assert!(ScorerErrorKind::MalformedReply.is_transient());
        assert!(!ScorerErrorKind::ClientError.is_transient());
        assert!(!ScorerErrorKind::RemoteError.is_transient());
    }

    #[test]
    fn test_http_status_classification() {
        assert_eq!(classify_http_status(429), ScorerErrorKind::RateLimited);
        assert_eq!(classify_http_status(500), ScorerErrorKind::ServerError);
        assert_eq!(classify_http_status(503), ScorerErrorKind::ServerError);
        assert_eq!(classify_http_status(400), ScorerErrorKind::ClientError);
        assert_eq!(classify_http_status(401), ScorerErrorKind::ClientError);
        assert_eq!(classify_http_status(404), ScorerErrorKind::ClientError);
    }

    #[test]
    fn test_exponential_backoff() {
        let error = ScorerError::rate_limited("test".to_string(), None);

        let delay_0 = error.suggested_delay(0);
        let delay_1 = error.suggested_delay(1);
        let delay_2 = error.suggested_delay(2);

        assert!(delay_1 > delay_0);
        assert!(delay_2 > delay_1);

        let delay_10 = error.suggested_delay(10);
        assert!(delay_10.as_secs() <= 60);
    }

    #[test]
    fn test_retry_after_respected() {
        let error = ScorerError::rate_limited("test".to_string(), Some(Duration::from_secs(30)));

        assert_eq!(error.suggested_delay(0), Duration::from_secs(30));
        assert_eq!(error.suggested_delay(5), Duration::from_secs(30));
    }
}
