//! Error taxonomy for the wizard core.
//!
//! Only [`SubmissionError`] is ever surfaced to the user. Persistence and
//! prefill problems are recovered inside the core and reported through logs.

use thiserror::Error;

/// Stored durable or one-shot state could not be read or written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record {record}: {message}")]
    Malformed {
        record: &'static str,
        message: String,
    },

    #[error("serialize {record}: {message}")]
    Serialize {
        record: &'static str,
        message: String,
    },
}

impl PersistenceError {
    pub fn malformed(record: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            record,
            message: err.to_string(),
        }
    }
}

/// A demo scenario field could not be mapped onto the form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefillError {
    #[error("scenario record has no `{0}`")]
    MissingField(&'static str),

    #[error("scenario value `{value}` is not an option of `{field}`")]
    UnsupportedValue { field: &'static str, value: String },
}

/// The analysis round trip failed. Carried in session state so the
/// presenter can offer a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("analysis service unreachable: {0}")]
    NetworkFailure(String),

    #[error("analysis request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("analysis service error ({status}): {message}")]
    ServiceError { status: u16, message: String },

    #[error("analysis response malformed: {0}")]
    MalformedResponse(String),
}

impl SubmissionError {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NetworkFailure(_) => "network-failure",
            Self::Timeout { .. } => "timeout",
            Self::ServiceError { .. } => "service-error",
            Self::MalformedResponse(_) => "malformed-response",
        }
    }

    /// Network failures and timeouts are worth an immediate retry; the
    /// others usually need the service side to change first.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkFailure(_) | Self::Timeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {message}")]
    Parse { path: String, message: String },
}
