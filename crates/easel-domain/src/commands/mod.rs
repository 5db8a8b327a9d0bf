use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ObjectId;

pub mod base;
pub mod clipboard_commands;
pub mod composite;
pub mod context;
pub mod factory;
pub mod merge;
pub mod object_commands;
pub mod result;
pub mod selection_commands;
pub mod text_commands;
pub mod transactional;

pub use base::{BaseCommand, Effect, Operation};
pub use clipboard_commands::*;
pub use composite::CompositeCommand;
pub use context::CommandContext;
pub use factory::CommandFactory;
pub use merge::{MergeIntent, MergePolicy, MergeRule};
pub use object_commands::*;
pub use result::{
    CommandError, CommandFailure, CommandResult, CommandSuccess, ErrorContext, ExecutionMetadata,
    Rollback,
};
pub use selection_commands::*;
pub use text_commands::*;
pub use transactional::{TransactionOptions, TransactionalCommand};

pub type CommandId = Uuid;

/// Closed set of command kinds known to the engine.
///
/// Merge rules and validation schemas are keyed by kind. `Custom` covers
/// operations defined outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    AddObject,
    UpdateObject,
    RemoveObject,
    GroupObjects,
    UngroupObject,
    ReorderObject,
    EditText,
    CopyObjects,
    CutObjects,
    PasteObjects,
    CreateSelection,
    ClearSelection,
    SelectObjects,
    Composite,
    Custom(&'static str),
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddObject => "add_object",
            Self::UpdateObject => "update_object",
            Self::RemoveObject => "remove_object",
            Self::GroupObjects => "group_objects",
            Self::UngroupObject => "ungroup_object",
            Self::ReorderObject => "reorder_object",
            Self::EditText => "edit_text",
            Self::CopyObjects => "copy_objects",
            Self::CutObjects => "cut_objects",
            Self::PasteObjects => "paste_objects",
            Self::CreateSelection => "create_selection",
            Self::ClearSelection => "clear_selection",
            Self::SelectObjects => "select_objects",
            Self::Composite => "composite",
            Self::Custom(name) => *name,
        }
    }

    /// Kinds that bring objects into existence.
    pub fn is_create_like(&self) -> bool {
        matches!(
            self,
            Self::AddObject | Self::PasteObjects | Self::GroupObjects
        )
    }

    /// Kinds that take objects out of the document.
    pub fn is_delete_like(&self) -> bool {
        matches!(
            self,
            Self::RemoveObject | Self::CutObjects | Self::UngroupObject
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    #[default]
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub source: CommandSource,
    pub workflow_id: Option<String>,
    pub parent_command_id: Option<CommandId>,
    pub can_merge: bool,
    /// Capture the selection before running and put it back on undo.
    pub affects_selection: bool,
}

/// Lifecycle of a single command instance.
///
/// `Created -> Executed -> Undone -> Redone -> Undone -> ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandState {
    Created,
    Executed,
    Undone,
    Redone,
}

impl CommandState {
    /// States from which the command may run forward.
    pub fn is_runnable(&self) -> bool {
        matches!(self, Self::Created | Self::Undone)
    }

    /// States in which the command's effect is live in the document.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Executed | Self::Redone)
    }
}

/// A reversible unit of document mutation.
///
/// Commands are owned by whoever runs them (usually `CommandHistory`) and
/// are never shared between threads concurrently, hence `Send` only.
pub trait Command: Send {
    fn id(&self) -> CommandId;

    fn kind(&self) -> CommandKind;

    fn timestamp(&self) -> DateTime<Utc>;

    /// Human-readable description, e.g. for the Edit menu.
    fn description(&self) -> String;

    fn metadata(&self) -> &CommandMetadata;

    fn context(&self) -> Option<&CommandContext>;

    fn state(&self) -> CommandState;

    /// Objects this command reads or writes.
    fn target_ids(&self) -> Vec<ObjectId>;

    /// Objects this command brings into existence when it is create-like.
    fn created_ids(&self) -> Vec<ObjectId> {
        self.target_ids()
    }

    /// Parameters as JSON, checked against the kind's schema.
    fn parameters(&self) -> Value;

    fn children(&self) -> &[Box<dyn Command>] {
        &[]
    }

    fn can_execute(&self) -> bool;

    fn can_undo(&self) -> bool;

    fn execute(&mut self) -> CommandResult<()>;

    fn undo(&mut self) -> CommandResult<()>;

    /// Take back a forward run while a parent composite recovers from a
    /// later failure. Unlike `undo`, this also reverses commands the history
    /// never records, such as copy.
    fn unwind(&mut self) -> CommandResult<()> {
        self.undo()
    }

    fn redo(&mut self) -> CommandResult<()> {
        self.execute()
    }

    /// What this command would contribute when merged into a predecessor.
    fn merge_intent(&self) -> Option<MergeIntent> {
        None
    }

    /// Fold a merged intent into this command. Only called by `MergePolicy`.
    fn absorb(&mut self, _intent: MergeIntent) -> Result<(), CommandError> {
        Err(CommandError::validation(
            "NOT_MERGEABLE",
            format!("{} commands cannot absorb others", self.kind()),
        ))
    }
}

impl fmt::Debug for dyn Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("description", &self.description())
            .field("state", &self.state())
            .finish()
    }
}
