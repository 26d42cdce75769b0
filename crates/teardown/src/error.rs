//! Error types for teardown operations.
//!
//! Only [`AuthError`] is fatal to a run. Every other error is absorbed at the
//! resource it belongs to: a [`FetchError`] turns into an empty listing, a
//! [`MalformedResponse`] skips one element, and a [`DeleteError`] is recorded
//! as a failed outcome for that resource.

/// Longest response body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 240;

/// The HTTP call could not be made at all (DNS, TLS, connection reset).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    /// Error message.
    pub message: String,
}

impl TransportError {
    /// Create a transport error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::new(format!("HTTP {code}")),
            other => Self::new(other.to_string()),
        }
    }
}

/// Token exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint answered with a non-2xx status.
    #[error("token exchange rejected with HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// The token endpoint answered 2xx without an `access_token`.
    #[error("token exchange response has no access_token")]
    MissingToken,

    /// The token endpoint answered 2xx with a body that is not JSON.
    #[error("token exchange response is not valid JSON: {0}")]
    InvalidResponse(String),

    /// The token endpoint could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A listing or descriptor read failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx status other than 404.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The body was not valid JSON.
    #[error("invalid JSON from {url}: {message}")]
    Parse {
        /// Requested URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The request could not be made.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FetchError {
    /// Whether the failure is worth retrying.
    ///
    /// Transport failures, 429 and 5xx are transient; anything else will
    /// fail the same way on the next attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Parse { .. } => false,
        }
    }
}

/// A nested field the walker expected was absent or null.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {context}: missing {field}")]
pub struct MalformedResponse {
    /// What was being read (e.g. `deployments of sharedflow sf1, entry 2`).
    pub context: String,
    /// The missing field.
    pub field: &'static str,
}

impl MalformedResponse {
    pub fn new(context: impl Into<String>, field: &'static str) -> Self {
        Self {
            context: context.into(),
            field,
        }
    }
}

/// An undeploy or delete call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeleteError {
    /// Non-2xx status.
    #[error("HTTP {status}{}", excerpt_suffix(.body))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// The request could not be made.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DeleteError {
    /// Build a status error, keeping only the start of the body.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: excerpt(body),
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn excerpt_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_transient() {
        let transport = FetchError::Transport(TransportError::new("connection reset"));
        assert!(transport.is_transient());

        let unavailable = FetchError::Status {
            url: "https://example.com".into(),
            status: 503,
        };
        assert!(unavailable.is_transient());

        let throttled = FetchError::Status {
            url: "https://example.com".into(),
            status: 429,
        };
        assert!(throttled.is_transient());
    }

    #[test]
    fn test_fetch_error_permanent() {
        let forbidden = FetchError::Status {
            url: "https://example.com".into(),
            status: 403,
        };
        assert!(!forbidden.is_transient());

        let parse = FetchError::Parse {
            url: "https://example.com".into(),
            message: "expected value".into(),
        };
        assert!(!parse.is_transient());
    }

    #[test]
    fn test_delete_error_display() {
        let err = DeleteError::status(409, "  still deployed  ");
        assert_eq!(err.to_string(), "HTTP 409: still deployed");

        let bare = DeleteError::status(500, "");
        assert_eq!(bare.to_string(), "HTTP 500");
    }

    #[test]
    fn test_delete_error_truncates_body() {
        let body = "x".repeat(1000);
        match DeleteError::status(400, &body) {
            DeleteError::Status { body, .. } => {
                assert_eq!(body.len(), MAX_BODY_EXCERPT + 3);
                assert!(body.ends_with("..."));
            }
            DeleteError::Transport(_) => panic!("expected status error"),
        }
    }

    #[test]
    fn test_malformed_display() {
        let err = MalformedResponse::new("deployments of apis/foo, entry 1", "revision");
        assert_eq!(
            err.to_string(),
            "malformed deployments of apis/foo, entry 1: missing revision"
        );
    }
}
