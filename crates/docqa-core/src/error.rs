//! Error taxonomy shared by every pipeline component.
//!
//! Each variant carries a human-readable detail so a caller can render the
//! failure without inspecting internals. [`Error::kind`] exposes a copyable
//! discriminant for programmatic handling (e.g. retry on
//! [`ErrorKind::RateLimit`]).

use std::fmt;

use thiserror::Error;

/// Result alias used across docqa.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The input document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The input document is malformed or has no extractable text.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// Invalid chunking parameters, unknown provider, missing credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// The backend rejected the supplied credentials.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The backend is throttling requests.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Embeddings of inconsistent dimension within one index.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Any other remote-call failure: a rejected request, a malformed reply.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend could not serve the request right now (5xx, timeout,
    /// refused connection). Reported as [`ErrorKind::Backend`].
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A question was asked before a pipeline was successfully built.
    #[error("pipeline not ready: {0}")]
    NotReady(String),
}

/// Discriminant of an [`Error`], without its detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Parse,
    Config,
    Auth,
    RateLimit,
    DimensionMismatch,
    Backend,
    NotReady,
}

impl ErrorKind {
    /// Stable snake_case name, suitable for logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Parse => "parse",
            ErrorKind::Config => "config",
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::Backend => "backend",
            ErrorKind::NotReady => "not_ready",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Config(_) => ErrorKind::Config,
            Error::Auth(_) => ErrorKind::Auth,
            Error::RateLimit(_) => ErrorKind::RateLimit,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::Backend(_) | Error::Unavailable(_) => ErrorKind::Backend,
            Error::NotReady(_) => ErrorKind::NotReady,
        }
    }

    /// Whether a caller-driven backoff and retry may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimit(_))
    }

    /// Whether the same request may succeed later: rate limiting or a
    /// temporarily unavailable backend. Rejected requests and malformed
    /// replies are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RateLimit(_) | Error::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::DimensionMismatch {
                expected: 3,
                actual: 4
            }
            .kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(Error::NotReady("x".into()).kind().as_str(), "not_ready");
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(Error::RateLimit("slow down".into()).is_retryable());
        assert!(!Error::Backend("boom".into()).is_retryable());
        assert!(!Error::Auth("bad key".into()).is_retryable());
    }

    #[test]
    fn test_unavailable_is_transient_backend() {
        let err = Error::Unavailable("503 Service Unavailable".into());
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.is_transient());
        assert!(!err.is_retryable());
        assert!(Error::RateLimit("429".into()).is_transient());
        assert!(!Error::Backend("404 model not found".into()).is_transient());
        assert!(!Error::Auth("bad key".into()).is_transient());
    }

    #[test]
    fn test_display_carries_detail() {
        let err = Error::DimensionMismatch {
            expected: 768,
            actual: 384,
        };
        assert_eq!(
            err.to_string(),
            "embedding dimension mismatch: expected 768, got 384"
        );
        assert!(Error::Parse("truncated xref".into())
            .to_string()
            .contains("truncated xref"));
    }
}
