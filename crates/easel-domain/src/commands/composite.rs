//! All-or-nothing execution of an ordered list of commands.
//!
//! Children run in order. When one fails, the children that already ran
//! are undone in reverse order before the failure is returned. A
//! transactional composite also snapshots the document up front and falls
//! back to it if unwinding fails.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::commands::{
    Command, CommandContext, CommandError, CommandFailure, CommandId, CommandKind,
    CommandMetadata, CommandResult, CommandState, CommandSuccess, ExecutionMetadata,
};
use crate::{DocumentStateSnapshot, DomainEvent, ObjectId};

pub struct CompositeCommand {
    id: CommandId,
    timestamp: DateTime<Utc>,
    description: String,
    metadata: CommandMetadata,
    context: Option<CommandContext>,
    state: CommandState,
    children: Vec<Box<dyn Command>>,
    /// Children `[..executed]` currently have their effect applied.
    executed: usize,
    transactional: bool,
    /// Set when a failed run could not be rolled back.
    poisoned: bool,
}

#[derive(Default)]
struct Collected {
    events: Vec<DomainEvent>,
    affected: Vec<ObjectId>,
}

impl Collected {
    fn add(&mut self, success: CommandSuccess<()>) {
        self.events.extend(success.events);
        for id in success.metadata.affected_object_ids {
            if !self.affected.contains(&id) {
                self.affected.push(id);
            }
        }
    }
}

impl CompositeCommand {
    pub fn new(
        description: impl Into<String>,
        context: Option<CommandContext>,
        children: Vec<Box<dyn Command>>,
    ) -> Self {
        let timestamp = context.as_ref().map_or_else(Utc::now, |c| c.timestamp);
        Self {
            id: Uuid::new_v4(),
            timestamp,
            description: description.into(),
            metadata: CommandMetadata::default(),
            context,
            state: CommandState::Created,
            children,
            executed: 0,
            transactional: false,
            poisoned: false,
        }
    }

    /// Composite that also snapshots the document before running.
    pub fn transactional(
        description: impl Into<String>,
        context: CommandContext,
        children: Vec<Box<dyn Command>>,
    ) -> Self {
        let mut composite = Self::new(description, Some(context), children);
        composite.transactional = true;
        composite
    }

    pub fn with_metadata(mut self, metadata: CommandMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn executed_count(&self) -> usize {
        self.executed
    }

    fn take_snapshot(&self) -> Result<Option<DocumentStateSnapshot>, CommandError> {
        if !self.transactional {
            return Ok(None);
        }
        let context = self.context.as_ref().ok_or_else(|| {
            CommandError::validation(
                "MISSING_CONTEXT",
                format!("Transactional '{}' has no context", self.description),
            )
        })?;
        Ok(Some(context.document()?.capture_state()))
    }

    /// Take back executed children in reverse order.
    fn unwind_executed(&mut self) -> Result<(), CommandError> {
        while self.executed > 0 {
            let index = self.executed - 1;
            self.children[index].unwind().map_err(|failure| failure.error)?;
            self.executed = index;
        }
        Ok(())
    }

    /// Put the document back after a child failed with `error`.
    ///
    /// A child that could not restore its own changes, or an unwind that
    /// fails, falls back to the snapshot when there is one.
    fn recover(
        &mut self,
        error: CommandError,
        snapshot: Option<DocumentStateSnapshot>,
    ) -> CommandFailure {
        let unwind_error = self.unwind_executed().err();
        if !error.is_fatal() && unwind_error.is_none() {
            tracing::warn!("'{}' failed and was unwound: {}", self.description, error);
            return CommandFailure::new(error);
        }

        let (cause, reason) = match error {
            CommandError::RollbackFailed { original, message } => (*original, message),
            other => {
                let reason = unwind_error
                    .as_ref()
                    .map(|e| format!("unwind failed: {}", e))
                    .unwrap_or_default();
                (other, reason)
            }
        };

        let restored = match (snapshot, &self.context) {
            (Some(snapshot), Some(context)) => context
                .document()
                .map_err(|e| e.to_string())
                .and_then(|document| document.restore_state(&snapshot).map_err(|e| e.to_string())),
            _ => Err(reason.clone()),
        };

        match restored {
            Ok(()) => {
                tracing::warn!(
                    "'{}' failed ({}), document restored from snapshot",
                    self.description,
                    reason
                );
                self.executed = 0;
                CommandFailure::new(cause)
            }
            Err(message) => {
                tracing::error!(
                    "'{}' could not be rolled back: {} ({})",
                    self.description,
                    message,
                    reason
                );
                self.poisoned = true;
                CommandFailure::new(CommandError::rollback_failed(cause, message))
            }
        }
    }

    /// Reverse every executed child, newest first.
    fn step_back(&mut self, unwinding: bool) -> CommandResult<()> {
        if !self.state.is_applied() || self.executed == 0 {
            return Err(CommandError::validation(
                "INVALID_STATE",
                format!("'{}' has nothing to undo", self.description),
            )
            .into());
        }

        let started = Instant::now();
        let mut collected = Collected::default();
        let executed = self.executed;

        for index in (0..executed).rev() {
            let child = &mut self.children[index];
            let outcome = if unwinding {
                child.unwind()
            } else {
                child.undo()
            };
            match outcome {
                Ok(success) => collected.add(success),
                Err(failure) => {
                    tracing::warn!(
                        "Undo of '{}' failed at child {}: {}",
                        self.description,
                        index,
                        failure.error
                    );
                    return match self.reapply(index + 1, executed) {
                        Ok(()) => Err(CommandFailure::new(failure.error.into_execution())),
                        Err(reapply_error) => Err(CommandFailure::new(
                            CommandError::rollback_failed(
                                failure.error,
                                format!("could not re-apply undone children: {}", reapply_error),
                            ),
                        )),
                    };
                }
            }
        }

        self.executed = 0;
        self.state = CommandState::Undone;
        Ok(CommandSuccess {
            data: (),
            events: collected.events,
            metadata: ExecutionMetadata {
                execution_time: started.elapsed(),
                affected_object_ids: collected.affected,
            },
        })
    }

    /// Re-apply children `[from..to)` after a failed undo left them undone.
    fn reapply(&mut self, from: usize, to: usize) -> Result<(), CommandError> {
        for child in &mut self.children[from..to] {
            child.redo().map_err(|failure| failure.error)?;
        }
        Ok(())
    }
}

impl Command for CompositeCommand {
    fn id(&self) -> CommandId {
        self.id
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Composite
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn context(&self) -> Option<&CommandContext> {
        self.context.as_ref()
    }

    fn state(&self) -> CommandState {
        self.state
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = Vec::new();
        for id in self.children.iter().flat_map(|c| c.target_ids()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    fn parameters(&self) -> Value {
        let children: Vec<Value> = self
            .children
            .iter()
            .map(|c| json!({ "kind": c.kind().as_str(), "parameters": c.parameters() }))
            .collect();
        json!({ "children": children, "transactional": self.transactional })
    }

    fn children(&self) -> &[Box<dyn Command>] {
        &self.children
    }

    fn can_execute(&self) -> bool {
        !self.children.is_empty()
            && !self.poisoned
            && self.state.is_runnable()
            && self.children.iter().all(|c| c.can_execute())
    }

    fn can_undo(&self) -> bool {
        self.state.is_applied()
            && self.executed > 0
            && self.children[..self.executed].iter().all(|c| c.can_undo())
    }

    fn execute(&mut self) -> CommandResult<()> {
        if self.poisoned {
            return Err(CommandError::validation(
                "INVALID_STATE",
                format!("'{}' could not be rolled back and cannot run again", self.description),
            )
            .into());
        }
        if !self.state.is_runnable() {
            return Err(CommandError::validation(
                "INVALID_STATE",
                format!("'{}' cannot run from state {:?}", self.description, self.state),
            )
            .into());
        }
        if self.children.is_empty() {
            return Err(CommandError::validation(
                "EMPTY_COMPOSITE",
                format!("'{}' has no commands", self.description),
            )
            .into());
        }

        let next = if self.state == CommandState::Undone {
            CommandState::Redone
        } else {
            CommandState::Executed
        };
        let snapshot = self.take_snapshot()?;
        let started = Instant::now();
        let mut collected = Collected::default();
        self.executed = 0;

        for index in 0..self.children.len() {
            let child = &mut self.children[index];
            let outcome = if !child.can_execute() {
                Err(CommandFailure::new(
                    CommandError::validation(
                        "PRECONDITION_FAILED",
                        format!("'{}' cannot execute", child.description()),
                    )
                    .with_context("child_index", index),
                ))
            } else if child.state() == CommandState::Undone {
                child.redo()
            } else {
                child.execute()
            };

            match outcome {
                Ok(success) => {
                    self.executed = index + 1;
                    collected.add(success);
                }
                Err(failure) => return Err(self.recover(failure.error, snapshot)),
            }
        }

        self.state = next;
        tracing::debug!(
            "Composite '{}' ran {} commands",
            self.description,
            self.children.len()
        );
        Ok(CommandSuccess {
            data: (),
            events: collected.events,
            metadata: ExecutionMetadata {
                execution_time: started.elapsed(),
                affected_object_ids: collected.affected,
            },
        })
    }

    fn undo(&mut self) -> CommandResult<()> {
        self.step_back(false)
    }

    fn unwind(&mut self) -> CommandResult<()> {
        self.step_back(true)
    }

    fn redo(&mut self) -> CommandResult<()> {
        if self.state != CommandState::Undone {
            return Err(CommandError::validation(
                "INVALID_STATE",
                format!("'{}' has not been undone", self.description),
            )
            .into());
        }
        self.execute()
    }
}
