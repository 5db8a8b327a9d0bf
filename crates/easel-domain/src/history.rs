//! Undo/redo history of executed commands.
//!
//! Commands are executed through the history so it can validate them,
//! merge rapid edits into the previous entry and keep the two stacks
//! consistent. The history is plain state with no threading; wrap it in a
//! [`CommandQueue`](crate::CommandQueue) to share it.

use std::collections::VecDeque;

use easel_core::EditorConfig;

use crate::commands::{
    Command, CommandContext, CommandError, CommandFailure, CommandResult, CompositeCommand,
    MergePolicy,
};
use crate::validation::CommandValidationService;

pub struct CommandHistory {
    /// Most recent at the back.
    undo_stack: VecDeque<Box<dyn Command>>,

    /// Most recent at the back.
    redo_stack: VecDeque<Box<dyn Command>>,

    max_depth: usize,
    merge_policy: MergePolicy,
    validator: CommandValidationService,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::from_config(&EditorConfig::default())
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: config.history_limit.max(1),
            merge_policy: MergePolicy::from_config(config),
            validator: CommandValidationService::from_config(config),
        }
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_validator(mut self, validator: CommandValidationService) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self.trim();
        self
    }

    /// Validate, execute and record `command`.
    ///
    /// On success the redo stack is cleared. A command that cannot be undone
    /// (e.g. copy) runs but is not recorded.
    pub fn execute(&mut self, mut command: Box<dyn Command>) -> CommandResult<()> {
        let validation = self.validator.validate_command(command.as_ref());
        if !validation.success {
            let codes = validation.error_codes().join(", ");
            tracing::warn!("Rejected '{}': {}", command.description(), codes);
            return Err(CommandError::validation(
                "VALIDATION_FAILED",
                format!("'{}' failed validation: {}", command.description(), codes),
            )
            .with_context("errors", validation.error_codes())
            .into());
        }

        let success = command.execute().map_err(|failure| self.drop_if_fatal(failure))?;
        self.record(command);
        Ok(success)
    }

    /// Validate the batch as a whole, then run it as one composite entry.
    pub fn execute_batch(
        &mut self,
        description: impl Into<String>,
        commands: Vec<Box<dyn Command>>,
    ) -> CommandResult<()> {
        let description = description.into();
        let validation = self.validator.validate_batch(&commands);
        if !validation.success {
            tracing::warn!(
                "Rejected batch '{}' with {} errors",
                description,
                validation.total_errors
            );
            return Err(CommandError::validation(
                "BATCH_VALIDATION_FAILED",
                format!(
                    "Batch '{}' failed validation with {} errors",
                    description, validation.total_errors
                ),
            )
            .with_context("errors", validation.error_codes())
            .with_context("total_errors", validation.total_errors)
            .into());
        }

        let context = commands
            .first()
            .and_then(|c| c.context())
            .map(CommandContext::fork);
        let mut composite = CompositeCommand::new(description, context, commands);
        let success = composite
            .execute()
            .map_err(|failure| self.drop_if_fatal(failure))?;
        self.record(Box::new(composite));
        Ok(success)
    }

    /// A fatal failure leaves the document matching no recorded state.
    fn drop_if_fatal(&mut self, failure: CommandFailure) -> CommandFailure {
        if failure.is_fatal() {
            tracing::error!("Execution left the document inconsistent, clearing history");
            self.clear();
        }
        failure
    }

    fn record(&mut self, command: Box<dyn Command>) {
        if !command.can_undo() {
            tracing::debug!("'{}' is not undoable, not recorded", command.description());
            return;
        }
        self.redo_stack.clear();

        if let Some(top) = self.undo_stack.back_mut() {
            if self.merge_policy.can_merge(top.as_ref(), command.as_ref()) {
                match self.merge_policy.merge(top.as_mut(), command.as_ref()) {
                    Ok(()) => {
                        tracing::debug!(
                            "Merged '{}' into '{}'",
                            command.description(),
                            top.description()
                        );
                        return;
                    }
                    Err(e) => tracing::warn!("Merge failed, recording separately: {}", e),
                }
            }
        }

        self.undo_stack.push_back(command);
        self.trim();
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Undo the most recent entry.
    ///
    /// A fatal failure leaves the document in an unknown state, so the whole
    /// history is dropped. Any other failure keeps the entry where it was.
    pub fn undo(&mut self) -> CommandResult<()> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Err(CommandError::validation("NOTHING_TO_UNDO", "Nothing to undo").into());
        };
        match command.undo() {
            Ok(success) => {
                self.redo_stack.push_back(command);
                Ok(success)
            }
            Err(failure) => Err(self.restack(command, failure, true)),
        }
    }

    pub fn redo(&mut self) -> CommandResult<()> {
        let Some(mut command) = self.redo_stack.pop_back() else {
            return Err(CommandError::validation("NOTHING_TO_REDO", "Nothing to redo").into());
        };
        match command.redo() {
            Ok(success) => {
                self.undo_stack.push_back(command);
                Ok(success)
            }
            Err(failure) => Err(self.restack(command, failure, false)),
        }
    }

    fn restack(
        &mut self,
        command: Box<dyn Command>,
        failure: CommandFailure,
        was_undo: bool,
    ) -> CommandFailure {
        if failure.is_fatal() {
            tracing::error!(
                "'{}' left the document inconsistent, clearing history",
                command.description()
            );
            self.clear();
        } else if was_undo {
            self.undo_stack.push_back(command);
        } else {
            self.redo_stack.push_back(command);
        }
        failure
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn peek_undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|c| c.description())
    }

    pub fn peek_redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|c| c.description())
    }
}
