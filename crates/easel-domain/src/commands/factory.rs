//! The single place commands are constructed.
//!
//! Every command gets its own forked context, so execution ids are unique
//! and timestamps reflect creation time. The factory also decides which
//! commands run under a snapshot guard and which ones may merge.

use std::sync::Arc;

use crate::commands::{
    AddObject, BaseCommand, ClearSelection, Command, CommandContext, CommandId, CommandMetadata,
    CommandSource, CompositeCommand, CopyObjects, CreateSelection, CutObjects, EditText,
    GroupObjects, Operation, PasteObjects, RemoveObject, ReorderAction, ReorderObject,
    SelectObjects, TransactionalCommand, UngroupObject, UpdateObject,
};
use crate::{CanvasObject, Clipboard, ObjectId, ObjectPatch, SelectionMask, SelectionMode};

#[derive(Clone)]
pub struct CommandFactory {
    context: CommandContext,
    clipboard: Arc<Clipboard>,
    source: CommandSource,
    workflow_id: Option<String>,
    parent_command_id: Option<CommandId>,
}

impl CommandFactory {
    pub fn new(context: CommandContext) -> Self {
        Self {
            context,
            clipboard: Arc::new(Clipboard::new()),
            source: CommandSource::User,
            workflow_id: None,
            parent_command_id: None,
        }
    }

    pub fn with_clipboard(mut self, clipboard: Arc<Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Tag every command built from here on with `source`.
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    pub fn in_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn child_of(mut self, parent: CommandId) -> Self {
        self.parent_command_id = Some(parent);
        self
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    pub fn clipboard(&self) -> &Arc<Clipboard> {
        &self.clipboard
    }

    fn metadata(&self, can_merge: bool, affects_selection: bool) -> CommandMetadata {
        CommandMetadata {
            source: self.source,
            workflow_id: self.workflow_id.clone(),
            parent_command_id: self.parent_command_id,
            can_merge,
            affects_selection,
        }
    }

    fn plain<O: Operation + 'static>(
        &self,
        operation: O,
        can_merge: bool,
        affects_selection: bool,
    ) -> Box<dyn Command> {
        Box::new(
            BaseCommand::new(operation, self.context.fork())
                .with_metadata(self.metadata(can_merge, affects_selection)),
        )
    }

    fn guarded<O: Operation + 'static>(
        &self,
        operation: O,
        affects_selection: bool,
    ) -> Box<dyn Command> {
        Box::new(
            TransactionalCommand::new(operation, self.context.fork())
                .with_metadata(self.metadata(false, affects_selection)),
        )
    }

    pub fn add_object(&self, object: CanvasObject) -> Box<dyn Command> {
        self.plain(AddObject::new(object), false, true)
    }

    pub fn update_object(&self, id: impl Into<ObjectId>, patch: ObjectPatch) -> Box<dyn Command> {
        self.plain(UpdateObject::new(id, patch), true, false)
    }

    pub fn remove_object(&self, id: impl Into<ObjectId>) -> Box<dyn Command> {
        self.plain(RemoveObject::new(id), false, true)
    }

    /// Remove several objects as one undoable step.
    pub fn remove_objects(&self, ids: &[ObjectId]) -> Box<dyn Command> {
        let children = ids.iter().map(|id| self.remove_object(id.clone())).collect();
        self.transactional_composite(format!("Remove {} objects", ids.len()), children)
    }

    pub fn group_objects(&self, ids: Vec<ObjectId>) -> Box<dyn Command> {
        self.guarded(GroupObjects::new(ids), true)
    }

    pub fn ungroup_object(&self, group_id: impl Into<ObjectId>) -> Box<dyn Command> {
        self.guarded(UngroupObject::new(group_id), true)
    }

    pub fn reorder_object(
        &self,
        id: impl Into<ObjectId>,
        action: ReorderAction,
    ) -> Box<dyn Command> {
        self.plain(ReorderObject::new(id, action), false, false)
    }

    pub fn edit_text(&self, id: impl Into<ObjectId>, text: impl Into<String>) -> Box<dyn Command> {
        self.plain(EditText::new(id, text), true, false)
    }

    pub fn copy_objects(&self, ids: Vec<ObjectId>) -> Box<dyn Command> {
        self.plain(CopyObjects::new(ids, self.clipboard.clone()), false, false)
    }

    pub fn cut_objects(&self, ids: Vec<ObjectId>) -> Box<dyn Command> {
        self.guarded(CutObjects::new(ids, self.clipboard.clone()), true)
    }

    pub fn paste_objects(&self) -> Box<dyn Command> {
        self.guarded(PasteObjects::new(self.clipboard.clone()), true)
    }

    pub fn paste_objects_at(&self, x: f64, y: f64) -> Box<dyn Command> {
        self.guarded(PasteObjects::new(self.clipboard.clone()).at(x, y), true)
    }

    pub fn create_selection(&self, mask: SelectionMask, mode: SelectionMode) -> Box<dyn Command> {
        self.plain(CreateSelection::new(mask, mode), false, true)
    }

    pub fn clear_selection(&self) -> Box<dyn Command> {
        self.plain(ClearSelection::new(), false, true)
    }

    pub fn select_objects(&self, ids: Vec<ObjectId>) -> Box<dyn Command> {
        self.plain(SelectObjects::new(ids), false, true)
    }

    pub fn composite(
        &self,
        description: impl Into<String>,
        children: Vec<Box<dyn Command>>,
    ) -> Box<dyn Command> {
        Box::new(
            CompositeCommand::new(description, Some(self.context.fork()), children)
                .with_metadata(self.metadata(false, false)),
        )
    }

    pub fn transactional_composite(
        &self,
        description: impl Into<String>,
        children: Vec<Box<dyn Command>>,
    ) -> Box<dyn Command> {
        Box::new(
            CompositeCommand::transactional(description, self.context.fork(), children)
                .with_metadata(self.metadata(false, false)),
        )
    }
}
