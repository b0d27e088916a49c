//! Booking client error types.

use std::fmt;

/// Diagnostic context captured from a failed remote call.
///
/// Anti-bot failures on the site are only diagnosable after the fact, so
/// every classified error keeps the status, the form payload that was
/// sent, and the response body (parsed as JSON when possible).
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    /// HTTP status code of the response (0 when no response was seen).
    pub status: u16,
    /// Form-encoded request payload, if the call carried one.
    pub request: Option<String>,
    /// Raw response body.
    pub body: String,
    /// Response body parsed as JSON, when it parses.
    pub json: Option<serde_json::Value>,
}

impl fmt::Display for ResponseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status code: {}, request data: {}, response body: {}",
            self.status,
            self.request.as_deref().unwrap_or("-"),
            self.body
        )
    }
}

/// Errors from the UZ booking client.
#[derive(Debug)]
pub enum ClientError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// The landing page yielded no token (fragment missing, decode
    /// failed, or no token literal in the decoded script).
    TokenUnavailable,

    /// The site rejected the request with HTTP 400.
    BadRequest(ResponseInfo),

    /// Any other non-2xx response.
    Transport(ResponseInfo),

    /// A 2xx response whose body carries the site's `error` flag
    /// (seat taken, coach sold out, ...).
    Business(ResponseInfo),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },
}

impl ClientError {
    /// Whether this is a body-level business error (retryable by the
    /// caller at its own granularity).
    pub fn is_business(&self) -> bool {
        matches!(self, ClientError::Business(_))
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "HTTP error: {e}"),
            ClientError::TokenUnavailable => write!(f, "failed to obtain gv-token"),
            ClientError::BadRequest(info) => write!(f, "bad request: {info}"),
            ClientError::Transport(info) => write!(f, "transport error: {info}"),
            ClientError::Business(info) => write!(f, "business error: {info}"),
            ClientError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err)
    }
}
