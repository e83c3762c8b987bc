//! Engine error taxonomy
//!
//! Repairable failures are absorbed by the repair loop up to its budget;
//! everything else propagates straight to the caller.

use splice_core::domain::config::ConfigKind;
use splice_core::domain::run::{ErrorKind, StepError};
use thiserror::Error;

use crate::schema::Violation;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Why an outbound call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailureKind {
    Network,
    Timeout,
    /// Non-2xx response
    Status(u16),
    /// The response body could not be decoded as JSON
    Decode,
    /// A template placeholder had no binding
    UnresolvedTemplate,
    /// The rendered request could not be built (bad URL, header or method)
    InvalidRequest,
}

impl std::fmt::Display for CallFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallFailureKind::Network => write!(f, "network error"),
            CallFailureKind::Timeout => write!(f, "timeout"),
            CallFailureKind::Status(code) => write!(f, "status {}", code),
            CallFailureKind::Decode => write!(f, "undecodable response"),
            CallFailureKind::UnresolvedTemplate => write!(f, "unresolved template"),
            CallFailureKind::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Config not found: {0}")]
    ConfigNotFound(String),

    #[error("Oracle failure: {0}")]
    OracleFailure(String),

    #[error("Validation failed: {}", summarize(.0))]
    ValidationFailure(Vec<Violation>),

    #[error("Malformed generation output: {0}")]
    MalformedOutput(String),

    #[error("Generation exhausted after {attempts} attempt(s): {last}")]
    GenerationExhausted {
        attempts: u32,
        last: Box<EngineError>,
    },

    #[error("Call failed ({kind}) for {url}: {message}")]
    CallFailure {
        kind: CallFailureKind,
        url: String,
        message: String,
    },

    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Expression failed: {0}")]
    Expression(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Config {id} is a {found} config, expected {expected}")]
    WrongKind {
        id: String,
        expected: ConfigKind,
        found: ConfigKind,
    },
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.path, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Status codes that point at a malformed request rather than at the data source
const CONFIG_SHAPED_STATUSES: &[u16] = &[400, 404, 405, 406, 415, 422];

impl EngineError {
    pub fn call(kind: CallFailureKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallFailure {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Whether a call failure suggests the request template itself is wrong
    pub fn is_config_shaped(&self) -> bool {
        match self {
            EngineError::CallFailure { kind, .. } => match kind {
                CallFailureKind::Status(code) => CONFIG_SHAPED_STATUSES.contains(code),
                CallFailureKind::UnresolvedTemplate | CallFailureKind::InvalidRequest => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether the repair loop may absorb this failure and try again
    pub fn is_repairable(&self) -> bool {
        match self {
            EngineError::OracleFailure(_)
            | EngineError::ValidationFailure(_)
            | EngineError::MalformedOutput(_)
            | EngineError::Expression(_) => true,
            EngineError::CallFailure { .. } => self.is_config_shaped(),
            _ => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ConfigNotFound(_) => ErrorKind::ConfigNotFound,
            EngineError::OracleFailure(_) => ErrorKind::OracleFailure,
            EngineError::ValidationFailure(_) => ErrorKind::ValidationFailure,
            EngineError::MalformedOutput(_) => ErrorKind::MalformedOutput,
            EngineError::GenerationExhausted { .. } => ErrorKind::GenerationExhausted,
            EngineError::CallFailure { .. } => ErrorKind::CallFailure,
            EngineError::StoreFailure(_) => ErrorKind::StoreFailure,
            EngineError::Expression(_) => ErrorKind::Expression,
            EngineError::InvalidPipeline(_) | EngineError::WrongKind { .. } => {
                ErrorKind::InvalidPipeline
            }
        }
    }

    /// First offending path, looking through exhausted generations
    pub fn path(&self) -> Option<String> {
        match self {
            EngineError::ValidationFailure(violations) => {
                violations.first().map(|v| v.path.clone())
            }
            EngineError::GenerationExhausted { last, .. } => last.path(),
            EngineError::ConfigNotFound(id) => Some(id.clone()),
            _ => None,
        }
    }

    /// Failure detail for the run trace
    pub fn to_step_error(&self) -> StepError {
        StepError {
            kind: self.kind(),
            message: self.to_string(),
            path: self.path(),
        }
    }
}
