//! Error types for the transcript pipeline
//!
//! Errors are classified by recoverability:
//! - Retryable: the store could not complete a commit (nothing was written)
//! - NonRetryable: bad input, bad configuration, an already-committed session
//! - RequiresUserAction: unresolved member references block a strict commit
//!
//! Per-category extractor failures are not pipeline errors. They are carried
//! inside the draft as [`ExtractionFailure`] so the other categories survive.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;
use crate::draft::RefPath;

/// Pipeline-level failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Empty/unusable transcript, unknown session, roster that cannot be loaded.
    #[error("Cannot process transcript: {0}")]
    FatalPrecondition(String),

    #[error("{} member reference(s) still need review", unresolved.len())]
    NotReady { unresolved: Vec<RefPath> },

    #[error("Session {0} has already been committed")]
    AlreadyCommitted(i64),

    #[error("Invalid correction: {0}")]
    InvalidCorrection(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl PipelineError {
    /// Returns true if the same call can be repeated unchanged.
    ///
    /// A failed commit rolls back in full, so it is always safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Persistence(_))
    }

    /// Returns true if a reviewer has to act before the call can succeed.
    pub fn requires_user_action(&self) -> bool {
        matches!(self, PipelineError::NotReady { .. })
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PipelineError::FatalPrecondition(_) => {
                "Check the transcript text and that the session's group has a roster."
            }
            PipelineError::NotReady { .. } => {
                "Match the flagged names to members, or save with partial commit."
            }
            PipelineError::AlreadyCommitted(_) => {
                "Everything in this review is already saved."
            }
            PipelineError::InvalidCorrection(_) => {
                "Pick a member from the session's group roster."
            }
            PipelineError::Persistence(_) => "Nothing was saved. Try again.",
            PipelineError::Config(_) => "Check your configuration in ~/.peerlog/config.json",
            PipelineError::Io(_) => "Check file permissions and paths.",
        }
    }
}

impl From<DbError> for PipelineError {
    fn from(err: DbError) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

/// Why one fact extractor produced nothing.
///
/// Scoped to a single category; the orchestrator records it in the draft
/// and carries on with the other categories.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionFailure {
    #[error("Extraction timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("Malformed extraction output: {message}")]
    Malformed { message: String },

    #[error("Extraction unavailable: {message}")]
    Unavailable { message: String },
}

impl ExtractionFailure {
    pub fn malformed(message: impl Into<String>) -> Self {
        ExtractionFailure::Malformed {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ExtractionFailure::Unavailable {
            message: message.into(),
        }
    }

    /// Short tag recorded with an extraction run.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionFailure::Timeout { .. } => "timeout",
            ExtractionFailure::Malformed { .. } => "malformed",
            ExtractionFailure::Unavailable { .. } => "unavailable",
        }
    }
}

/// Serializable error representation for callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorView {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&PipelineError> for ErrorView {
    fn from(err: &PipelineError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        let unresolved = match err {
            PipelineError::NotReady { unresolved } => {
                unresolved.iter().map(|p| p.to_string()).collect()
            }
            _ => Vec::new(),
        };

        ErrorView {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
            unresolved,
        }
    }
}
