//! Error types for the protocol engine.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running an exchange.
#[derive(Error, Debug)]
pub enum Error {
    // Message errors
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Protocol terminated [{code}]: {explain}")]
    Protocol { code: ProblemCode, explain: String },

    /// The counterparty answered with a problem report. `code` classifies the
    /// failure locally, `reported` is the code the peer sent.
    #[error("Protocol terminated [{code}]: counterparty reported problem [{reported}]: {explain}")]
    Refused {
        code: ProblemCode,
        reported: ProblemCode,
        explain: String,
    },

    // Delivery errors
    #[error("No correlated reply within {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    // Collaborator errors, propagated as reported
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("AnonCreds error: {0}")]
    AnonCreds(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a protocol error.
    pub fn protocol(code: ProblemCode, explain: impl Into<String>) -> Self {
        Error::Protocol {
            code,
            explain: explain.into(),
        }
    }

    /// Stable reason string reported for a failed exchange.
    pub fn reason_code(&self) -> &str {
        match self {
            Error::Validation(_) => "validation",
            Error::Protocol { code, .. } | Error::Refused { code, .. } => code.as_str(),
            Error::Timeout(_) => "timeout",
            Error::Transport(_) => "transport",
            Error::Storage(_) => "storage",
            Error::Ledger(_) => "ledger",
            Error::AnonCreds(_) => "anoncreds",
            Error::SerializationError(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }

    /// The problem code, if this is a protocol error.
    pub fn problem_code(&self) -> Option<&ProblemCode> {
        match self {
            Error::Protocol { code, .. } | Error::Refused { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the failure was reported by the counterparty.
    pub fn is_peer_report(&self) -> bool {
        matches!(self, Error::Refused { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

/// Rejection reasons for a single malformed message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Attribute \"{0}\" is missing from message")]
    MissingAttribute(String),

    #[error("Threading error: {0}")]
    ThreadInconsistent(String),

    #[error("Timing error: {0}")]
    TimingInconsistent(String),

    #[error("Invalid field \"{field}\": {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Malformed attachment: {0}")]
    MalformedAttachment(String),
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<base64::DecodeError> for ValidationError {
    fn from(err: base64::DecodeError) -> Self {
        ValidationError::MalformedAttachment(err.to_string())
    }
}

/// Problem codes carried by problem reports and protocol errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProblemCode {
    /// Reply of the wrong type for the current step
    UnexpectedResponse,
    /// Counterparty refused the request
    RequestNotAccepted,
    /// Local failure while processing a request
    RequestProcessingError,
    /// Local failure while processing a response
    ResponseProcessingError,
    /// Presentation did not verify
    VerifyError,
    /// Counterparty did not answer in time
    Timeout,
    /// Code reported by a peer that we do not model
    Other(String),
}

impl ProblemCode {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            ProblemCode::UnexpectedResponse => "unexpected_response",
            ProblemCode::RequestNotAccepted => "request_not_accepted",
            ProblemCode::RequestProcessingError => "request_processing_error",
            ProblemCode::ResponseProcessingError => "response_processing_error",
            ProblemCode::VerifyError => "verify_error",
            ProblemCode::Timeout => "timeout",
            ProblemCode::Other(code) => code,
        }
    }

    /// Parse a wire code. Unknown codes are kept verbatim.
    pub fn parse(code: &str) -> Self {
        match code {
            "unexpected_response" => ProblemCode::UnexpectedResponse,
            "request_not_accepted" => ProblemCode::RequestNotAccepted,
            "request_processing_error" => ProblemCode::RequestProcessingError,
            "response_processing_error" => ProblemCode::ResponseProcessingError,
            "verify_error" => ProblemCode::VerifyError,
            "timeout" => ProblemCode::Timeout,
            other => ProblemCode::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ProblemCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
