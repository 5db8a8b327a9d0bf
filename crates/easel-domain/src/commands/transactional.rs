//! Snapshot-guarded execution.
//!
//! Before mutating, the whole document is captured. If the operation fails
//! part way, the snapshot is restored so the document never shows a
//! half-applied command. Only a failed restore is fatal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::commands::{
    BaseCommand, Command, CommandContext, CommandError, CommandFailure, CommandId, CommandKind,
    CommandMetadata, CommandResult, CommandState, MergeIntent, Operation, Rollback,
};
use crate::ports::DocumentPort;
use crate::{DocumentStateSnapshot, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Restore the snapshot automatically on failure. When off, the failure
    /// carries a rollback the caller must run.
    pub auto_rollback: bool,
    /// Also snapshot around undo.
    pub guard_undo: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            auto_rollback: true,
            guard_undo: true,
        }
    }
}

pub struct TransactionalCommand<O> {
    inner: BaseCommand<O>,
    options: TransactionOptions,
}

impl<O: Operation> TransactionalCommand<O> {
    pub fn new(operation: O, context: CommandContext) -> Self {
        Self::wrap(BaseCommand::new(operation, context))
    }

    pub fn wrap(inner: BaseCommand<O>) -> Self {
        Self {
            inner,
            options: TransactionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata(mut self, metadata: CommandMetadata) -> Self {
        self.inner = self.inner.with_metadata(metadata);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.inner = self.inner.with_description(description);
        self
    }

    pub fn options(&self) -> TransactionOptions {
        self.options
    }

    pub fn operation(&self) -> &O {
        self.inner.operation()
    }

    fn recover(
        &self,
        document: Arc<dyn DocumentPort>,
        snapshot: DocumentStateSnapshot,
        error: CommandError,
        auto_rollback: bool,
    ) -> CommandFailure {
        let description = self.inner.description_ref();
        let error = error.into_execution();

        if !auto_rollback {
            tracing::warn!(
                "'{}' failed, rollback deferred to caller: {}",
                description,
                error
            );
            let rollback: Rollback = Box::new(move || document.restore_state(&snapshot));
            return CommandFailure::new(error).with_rollback(rollback);
        }

        match document.restore_state(&snapshot) {
            Ok(()) => {
                tracing::warn!("'{}' failed, document restored: {}", description, error);
                CommandFailure::new(error)
            }
            Err(restore_error) => {
                tracing::error!(
                    "'{}' failed and the snapshot could not be restored: {} / {}",
                    description,
                    error,
                    restore_error
                );
                CommandFailure::new(CommandError::rollback_failed(
                    error,
                    restore_error.to_string(),
                ))
            }
        }
    }
}

impl<O: Operation> Command for TransactionalCommand<O> {
    fn id(&self) -> CommandId {
        self.inner.id()
    }

    fn kind(&self) -> CommandKind {
        self.inner.kind()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.inner.timestamp()
    }

    fn description(&self) -> String {
        self.inner.description()
    }

    fn metadata(&self) -> &CommandMetadata {
        self.inner.metadata()
    }

    fn context(&self) -> Option<&CommandContext> {
        self.inner.context()
    }

    fn state(&self) -> CommandState {
        self.inner.state()
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        self.inner.target_ids()
    }

    fn created_ids(&self) -> Vec<ObjectId> {
        self.inner.created_ids()
    }

    fn parameters(&self) -> Value {
        self.inner.parameters()
    }

    fn can_execute(&self) -> bool {
        self.inner.can_execute()
    }

    fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    fn execute(&mut self) -> CommandResult<()> {
        let context = self.inner.require_context()?;
        self.inner.check_executable(&context)?;
        let document = Arc::clone(context.document()?);
        let next = self.inner.forward_state();

        let snapshot = document.capture_state();
        match self.inner.run_forward(&context) {
            Ok((effect, elapsed)) => Ok(self.inner.commit(next, effect, elapsed, &context)),
            Err(error) => Err(self.recover(document, snapshot, error, self.options.auto_rollback)),
        }
    }

    fn undo(&mut self) -> CommandResult<()> {
        self.inner.check_undoable()?;
        self.unwind()
    }

    fn unwind(&mut self) -> CommandResult<()> {
        let context = self.inner.require_context()?;
        self.inner.check_applied()?;
        if !self.options.guard_undo {
            return self.inner.unwind();
        }
        let document = Arc::clone(context.document()?);

        let snapshot = document.capture_state();
        match self.inner.run_backward(&context) {
            Ok((effect, elapsed)) => {
                Ok(self
                    .inner
                    .commit(CommandState::Undone, effect, elapsed, &context))
            }
            Err(error) => Err(self.recover(document, snapshot, error, true)),
        }
    }

    fn redo(&mut self) -> CommandResult<()> {
        if self.inner.state() != CommandState::Undone {
            return Err(CommandError::validation(
                "INVALID_STATE",
                format!("'{}' has not been undone", self.inner.description_ref()),
            )
            .into());
        }
        self.execute()
    }

    fn merge_intent(&self) -> Option<MergeIntent> {
        self.inner.merge_intent()
    }

    fn absorb(&mut self, intent: MergeIntent) -> Result<(), CommandError> {
        self.inner.absorb(intent)
    }
}
