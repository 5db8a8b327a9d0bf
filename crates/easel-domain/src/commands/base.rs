//! The execution template every concrete command goes through.
//!
//! A concrete command is an [`Operation`]: it knows how to mutate the
//! document forward and back. [`BaseCommand`] wraps it with identity, the
//! state machine, precondition checks, timing, selection capture and event
//! publication, so operations never deal with those.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::commands::{
    Command, CommandContext, CommandError, CommandFailure, CommandId, CommandKind,
    CommandMetadata, CommandResult, CommandState, CommandSuccess, ExecutionMetadata, MergeIntent,
};
use crate::{DomainEvent, ObjectId, Selection};

/// What one forward or backward step did.
#[derive(Debug, Clone, Default)]
pub struct Effect {
    pub affected: Vec<ObjectId>,
    pub events: Vec<DomainEvent>,
}

impl Effect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touching(mut self, id: impl Into<ObjectId>) -> Self {
        let id = id.into();
        if !self.affected.contains(&id) {
            self.affected.push(id);
        }
        self
    }

    pub fn touching_all<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ObjectId>,
    {
        for id in ids {
            self = self.touching(id);
        }
        self
    }

    pub fn with_event(mut self, event: DomainEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// The mutation half of a command.
pub trait Operation: Send {
    fn kind(&self) -> CommandKind;

    fn describe(&self) -> String;

    fn target_ids(&self) -> Vec<ObjectId>;

    fn created_ids(&self) -> Vec<ObjectId> {
        self.target_ids()
    }

    fn parameters(&self) -> Value;

    /// Read-only check run before anything is mutated.
    fn precheck(&self, _context: &CommandContext) -> Result<(), CommandError> {
        Ok(())
    }

    /// First forward run. Captures whatever `revert` needs.
    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError>;

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError>;

    /// Forward run after an undo.
    fn reapply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        self.apply(context)
    }

    fn is_reversible(&self) -> bool {
        true
    }

    fn merge_intent(&self) -> Option<MergeIntent> {
        None
    }

    fn absorb(&mut self, _intent: MergeIntent) -> Result<(), CommandError> {
        Err(CommandError::validation(
            "NOT_MERGEABLE",
            format!("{} does not merge", self.kind()),
        ))
    }
}

pub struct BaseCommand<O> {
    id: CommandId,
    timestamp: DateTime<Utc>,
    description: String,
    metadata: CommandMetadata,
    context: Option<CommandContext>,
    state: CommandState,
    selection_before: Option<Selection>,
    operation: O,
}

impl<O: Operation> BaseCommand<O> {
    pub fn new(operation: O, context: CommandContext) -> Self {
        let mut command = Self::detached(operation);
        command.timestamp = context.timestamp;
        command.context = Some(context);
        command
    }

    /// A command with no context. It cannot execute; validation reports it.
    pub fn detached(operation: O) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            description: operation.describe(),
            metadata: CommandMetadata::default(),
            context: None,
            state: CommandState::Created,
            selection_before: None,
            operation,
        }
    }

    pub fn with_metadata(mut self, metadata: CommandMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    pub(crate) fn require_context(&self) -> Result<CommandContext, CommandError> {
        self.context.clone().ok_or_else(|| {
            CommandError::validation(
                "MISSING_CONTEXT",
                format!("'{}' has no execution context", self.description),
            )
        })
    }

    pub(crate) fn check_executable(&self, context: &CommandContext) -> Result<(), CommandError> {
        if !self.state.is_runnable() {
            return Err(CommandError::validation(
                "INVALID_STATE",
                format!("'{}' cannot run from state {:?}", self.description, self.state),
            ));
        }
        context.document()?;
        self.operation.precheck(context)
    }

    pub(crate) fn check_applied(&self) -> Result<(), CommandError> {
        if !self.state.is_applied() {
            return Err(CommandError::validation(
                "INVALID_STATE",
                format!("'{}' cannot undo from state {:?}", self.description, self.state),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_undoable(&self) -> Result<(), CommandError> {
        self.check_applied()?;
        if !self.operation.is_reversible() {
            return Err(CommandError::validation(
                "NOT_REVERSIBLE",
                format!("'{}' cannot be undone", self.description),
            ));
        }
        Ok(())
    }

    /// State the command moves to after a successful forward run.
    pub(crate) fn forward_state(&self) -> CommandState {
        if self.state == CommandState::Undone {
            CommandState::Redone
        } else {
            CommandState::Executed
        }
    }

    pub(crate) fn run_forward(
        &mut self,
        context: &CommandContext,
    ) -> Result<(Effect, Duration), CommandError> {
        if self.metadata.affects_selection {
            self.selection_before = context.selection.as_ref().map(|s| s.selection());
        }
        let started = Instant::now();
        let effect = if self.state == CommandState::Undone {
            self.operation.reapply(context)?
        } else {
            self.operation.apply(context)?
        };
        Ok((effect, started.elapsed()))
    }

    pub(crate) fn run_backward(
        &mut self,
        context: &CommandContext,
    ) -> Result<(Effect, Duration), CommandError> {
        let started = Instant::now();
        let effect = self.operation.revert(context)?;
        let elapsed = started.elapsed();

        if let (Some(before), Some(port)) = (&self.selection_before, &context.selection) {
            if let Err(e) = port.restore_selection(before) {
                tracing::warn!("Could not restore selection after '{}': {}", self.description, e);
            }
        }
        Ok((effect, elapsed))
    }

    /// Move to `state`, publish the step's events and build the result.
    pub(crate) fn commit(
        &mut self,
        state: CommandState,
        effect: Effect,
        elapsed: Duration,
        context: &CommandContext,
    ) -> CommandSuccess<()> {
        self.state = state;
        for event in &effect.events {
            context.publish(event.clone());
        }
        tracing::debug!(
            "{} '{}' -> {:?} in {:?}",
            self.operation.kind(),
            self.description,
            state,
            elapsed
        );
        CommandSuccess {
            data: (),
            events: effect.events,
            metadata: ExecutionMetadata {
                execution_time: elapsed,
                affected_object_ids: effect.affected,
            },
        }
    }

    pub(crate) fn description_ref(&self) -> &str {
        &self.description
    }
}

impl<O: Operation> Command for BaseCommand<O> {
    fn id(&self) -> CommandId {
        self.id
    }

    fn kind(&self) -> CommandKind {
        self.operation.kind()
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
        self.operation.target_ids()
    }

    fn created_ids(&self) -> Vec<ObjectId> {
        self.operation.created_ids()
    }

    fn parameters(&self) -> Value {
        self.operation.parameters()
    }

    fn can_execute(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|ctx| self.check_executable(ctx).is_ok())
    }

    fn can_undo(&self) -> bool {
        self.check_undoable().is_ok()
    }

    fn execute(&mut self) -> CommandResult<()> {
        let context = self.require_context()?;
        self.check_executable(&context)?;
        let next = self.forward_state();
        match self.run_forward(&context) {
            Ok((effect, elapsed)) => Ok(self.commit(next, effect, elapsed, &context)),
            Err(error) => {
                tracing::warn!("'{}' failed: {}", self.description, error);
                Err(CommandFailure::new(error))
            }
        }
    }

    fn undo(&mut self) -> CommandResult<()> {
        self.check_undoable()?;
        self.unwind()
    }

    fn unwind(&mut self) -> CommandResult<()> {
        let context = self.require_context()?;
        self.check_applied()?;
        match self.run_backward(&context) {
            Ok((effect, elapsed)) => {
                Ok(self.commit(CommandState::Undone, effect, elapsed, &context))
            }
            Err(error) => {
                tracing::warn!("Undo of '{}' failed: {}", self.description, error);
                Err(CommandFailure::new(error))
            }
        }
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

    fn merge_intent(&self) -> Option<MergeIntent> {
        self.operation.merge_intent()
    }

    fn absorb(&mut self, intent: MergeIntent) -> Result<(), CommandError> {
        let generated = self.description == self.operation.describe();
        self.operation.absorb(intent)?;
        if generated {
            self.description = self.operation.describe();
        }
        Ok(())
    }
}
