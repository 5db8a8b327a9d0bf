use std::fmt;
use std::time::Duration;

use easel_core::{EaselError, EaselResult};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{DomainEvent, ObjectId};

pub type ErrorContext = Map<String, Value>;

/// Why a command could not run, or could not be put back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Precondition or schema failure. Nothing was mutated.
    #[error("Validation failed ({code}): {message}")]
    Validation {
        code: String,
        message: String,
        context: Option<ErrorContext>,
    },

    /// The mutation was attempted and failed.
    #[error("Execution failed ({code}): {message}")]
    Execution {
        code: String,
        message: String,
        context: Option<ErrorContext>,
    },

    /// Another command was already running against the document.
    #[error("Concurrency conflict ({code}): {message}")]
    Concurrency {
        code: String,
        message: String,
        context: Option<ErrorContext>,
    },

    /// Restoring the pre-execution state failed; the document no longer
    /// matches any known-good state.
    #[error("Rollback failed: {message} (while recovering from: {original})")]
    RollbackFailed {
        original: Box<CommandError>,
        message: String,
    },
}

impl CommandError {
    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            code: code.to_string(),
            message: message.into(),
            context: None,
        }
    }

    pub fn execution(code: &str, message: impl Into<String>) -> Self {
        Self::Execution {
            code: code.to_string(),
            message: message.into(),
            context: None,
        }
    }

    pub fn concurrency(code: &str, message: impl Into<String>) -> Self {
        Self::Concurrency {
            code: code.to_string(),
            message: message.into(),
            context: None,
        }
    }

    pub fn rollback_failed(original: CommandError, message: impl Into<String>) -> Self {
        Self::RollbackFailed {
            original: Box::new(original),
            message: message.into(),
        }
    }

    /// Attach a context entry. No-op for `RollbackFailed`.
    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        match &mut self {
            Self::Validation { context, .. }
            | Self::Execution { context, .. }
            | Self::Concurrency { context, .. } => {
                context
                    .get_or_insert_with(Map::new)
                    .insert(key.to_string(), value.into());
            }
            Self::RollbackFailed { .. } => {}
        }
        self
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Validation { code, .. }
            | Self::Execution { code, .. }
            | Self::Concurrency { code, .. } => code,
            Self::RollbackFailed { .. } => "ROLLBACK_FAILED",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::Execution { message, .. }
            | Self::Concurrency { message, .. }
            | Self::RollbackFailed { message, .. } => message,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Validation { context, .. }
            | Self::Execution { context, .. }
            | Self::Concurrency { context, .. } => context.as_ref(),
            Self::RollbackFailed { .. } => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }

    /// Re-label a validation error raised mid-mutation as an execution error.
    pub fn into_execution(self) -> Self {
        match self {
            Self::Validation {
                code,
                message,
                context,
            } => Self::Execution {
                code,
                message,
                context,
            },
            other => other,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "This edit cannot be applied. Nothing changed.",
            Self::Execution { .. } => "Could not apply edit. Nothing changed.",
            Self::Concurrency { .. } => "Another edit is in progress. Try again.",
            Self::RollbackFailed { .. } => {
                "The document may be inconsistent. Reload it before continuing."
            }
        }
    }
}

impl From<EaselError> for CommandError {
    fn from(err: EaselError) -> Self {
        match err {
            EaselError::NotFound(message) => Self::execution("OBJECT_NOT_FOUND", message),
            EaselError::Validation(message) => Self::execution("INVALID_OPERATION", message),
            EaselError::Concurrency(message) => {
                Self::concurrency("CONCURRENT_MODIFICATION", message)
            }
            other => Self::execution("EXECUTION_FAILED", other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionMetadata {
    /// Time spent in the mutation step itself.
    pub execution_time: Duration,
    pub affected_object_ids: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct CommandSuccess<T> {
    pub data: T,
    pub events: Vec<DomainEvent>,
    pub metadata: ExecutionMetadata,
}

impl CommandSuccess<()> {
    pub fn empty() -> Self {
        Self {
            data: (),
            events: Vec::new(),
            metadata: ExecutionMetadata::default(),
        }
    }
}

/// Deferred restore handed back when automatic rollback is disabled.
pub type Rollback = Box<dyn FnOnce() -> EaselResult<()> + Send>;

pub struct CommandFailure {
    pub error: CommandError,
    pub rollback: Option<Rollback>,
}

impl CommandFailure {
    pub fn new(error: CommandError) -> Self {
        Self {
            error,
            rollback: None,
        }
    }

    pub fn with_rollback(mut self, rollback: Rollback) -> Self {
        self.rollback = Some(rollback);
        self
    }

    pub fn code(&self) -> &str {
        self.error.code()
    }

    pub fn is_fatal(&self) -> bool {
        self.error.is_fatal()
    }
}

impl fmt::Debug for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFailure")
            .field("error", &self.error)
            .field("rollback", &self.rollback.is_some())
            .finish()
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl From<CommandError> for CommandFailure {
    fn from(error: CommandError) -> Self {
        Self::new(error)
    }
}

pub type CommandResult<T> = Result<CommandSuccess<T>, CommandFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_context() {
        let err = CommandError::validation("MISSING_SCHEMA", "no schema")
            .with_context("kind", "update_object");
        assert_eq!(err.code(), "MISSING_SCHEMA");
        assert_eq!(err.context().unwrap()["kind"], "update_object");
        assert!(err.is_validation());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_rollback_failed_is_fatal() {
        let original = CommandError::execution("EXECUTION_FAILED", "boom");
        let err = CommandError::rollback_failed(original.clone(), "restore rejected");
        assert!(err.is_fatal());
        assert_eq!(err.code(), "ROLLBACK_FAILED");
        assert!(err.to_string().contains("boom"));
        assert_ne!(err.user_message(), original.user_message());
    }

    #[test]
    fn test_port_errors_become_execution_errors() {
        let err: CommandError = EaselError::not_found("object", "obj-9").into();
        assert!(err.is_execution());
        assert_eq!(err.code(), "OBJECT_NOT_FOUND");

        let err: CommandError = EaselError::Concurrency("busy".into()).into();
        assert!(matches!(err, CommandError::Concurrency { .. }));
    }

    #[test]
    fn test_into_execution_keeps_code() {
        let err = CommandError::validation("OBJECT_LOCKED", "locked").into_execution();
        assert!(err.is_execution());
        assert_eq!(err.code(), "OBJECT_LOCKED");
    }
}
