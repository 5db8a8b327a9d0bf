use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::commands::{CommandContext, CommandError, CommandKind, Effect, MergeIntent, Operation};
use crate::event::{
    OBJECTS_GROUPED, OBJECT_ADDED, OBJECT_REMOVED, OBJECT_REORDERED, OBJECT_UNGROUPED,
    OBJECT_UPDATED,
};
use crate::{CanvasObject, DomainEvent, ObjectId, ObjectKind, ObjectPatch};

/// Look up an object before mutating. Absence is a precondition failure.
pub(crate) fn require_object(
    context: &CommandContext,
    id: &str,
) -> Result<CanvasObject, CommandError> {
    context.document()?.get_object(id).ok_or_else(|| {
        CommandError::validation("PRECONDITION_FAILED", format!("Object '{}' does not exist", id))
            .with_context("object_id", id)
    })
}

/// Look up an object mid-mutation. Absence is an execution failure.
pub(crate) fn fetch_object(
    context: &CommandContext,
    id: &str,
) -> Result<CanvasObject, CommandError> {
    context.document()?.get_object(id).ok_or_else(|| {
        CommandError::execution("OBJECT_NOT_FOUND", format!("Object '{}' disappeared", id))
            .with_context("object_id", id)
    })
}

fn single_target(id: &ObjectId) -> Vec<ObjectId> {
    vec![id.clone()]
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

pub struct AddObject {
    object: CanvasObject,
    select: bool,
}

impl AddObject {
    pub fn new(object: CanvasObject) -> Self {
        Self {
            object,
            select: true,
        }
    }

    /// Leave the selection alone after adding.
    pub fn without_selecting(mut self) -> Self {
        self.select = false;
        self
    }

    pub fn object_id(&self) -> &str {
        &self.object.id
    }
}

impl Operation for AddObject {
    fn kind(&self) -> CommandKind {
        CommandKind::AddObject
    }

    fn describe(&self) -> String {
        match &self.object.name {
            Some(name) => format!("Add {} '{}'", self.object.kind.as_str(), name),
            None => format!("Add {}", self.object.kind.as_str()),
        }
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        single_target(&self.object.id)
    }

    fn parameters(&self) -> Value {
        json!({ "object": self.object })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        if context.document()?.get_object(&self.object.id).is_some() {
            return Err(CommandError::validation(
                "OBJECT_EXISTS",
                format!("Object '{}' already exists", self.object.id),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let id = context.document()?.add_object(self.object.clone())?;
        if self.select {
            if let Some(selection) = &context.selection {
                selection.select_object(&id)?;
            }
        }
        Ok(Effect::new().touching(id.clone()).with_event(DomainEvent::new(
            OBJECT_ADDED,
            id,
            json!({ "kind": self.object.kind.as_str() }),
        )))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let removed = context.document()?.remove_object(&self.object.id)?;
        Ok(Effect::new()
            .touching(removed.id.clone())
            .with_event(DomainEvent::new(
                OBJECT_REMOVED,
                removed.id,
                json!({ "kind": removed.kind.as_str() }),
            )))
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Property change on one object. Consecutive updates of the same object
/// merge.
pub struct UpdateObject {
    object_id: ObjectId,
    patch: ObjectPatch,
    baseline: Option<ObjectPatch>,
}

impl UpdateObject {
    pub fn new(object_id: impl Into<ObjectId>, patch: ObjectPatch) -> Self {
        Self {
            object_id: object_id.into(),
            patch,
            baseline: None,
        }
    }

    pub fn patch(&self) -> &ObjectPatch {
        &self.patch
    }

    /// Values the object had before the first application.
    pub fn baseline(&self) -> Option<&ObjectPatch> {
        self.baseline.as_ref()
    }

    fn changed_event(&self, patch: &ObjectPatch) -> DomainEvent {
        DomainEvent::new(
            OBJECT_UPDATED,
            self.object_id.clone(),
            json!({ "fields": patch.changed_fields() }),
        )
    }
}

impl Operation for UpdateObject {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateObject
    }

    fn describe(&self) -> String {
        format!(
            "Update {} on {}",
            self.patch.changed_fields().join(", "),
            self.object_id
        )
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        single_target(&self.object_id)
    }

    fn parameters(&self) -> Value {
        json!({ "object_id": self.object_id, "patch": self.patch })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        if self.patch.is_empty() {
            return Err(CommandError::validation(
                "EMPTY_PATCH",
                "Update changes no properties",
            ));
        }
        let object = require_object(context, &self.object_id)?;
        let only_unlocks = self.patch.changed_fields() == ["locked"];
        if object.locked && !only_unlocks {
            return Err(CommandError::validation(
                "OBJECT_LOCKED",
                format!("Object '{}' is locked", self.object_id),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let current = fetch_object(context, &self.object_id)?;
        let baseline = self.patch.inverse_for(&current);
        context
            .document()?
            .update_object(&self.object_id, &self.patch)?;
        self.baseline = Some(baseline);
        Ok(Effect::new()
            .touching(self.object_id.clone())
            .with_event(self.changed_event(&self.patch)))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let baseline = self.baseline.as_ref().ok_or_else(|| {
            CommandError::execution("MISSING_BASELINE", "Update was never applied")
        })?;
        context
            .document()?
            .update_object(&self.object_id, baseline)?;
        Ok(Effect::new()
            .touching(self.object_id.clone())
            .with_event(self.changed_event(baseline)))
    }

    fn merge_intent(&self) -> Option<MergeIntent> {
        Some(MergeIntent::Properties {
            object_id: self.object_id.clone(),
            patch: self.patch.clone(),
            baseline: self.baseline.clone(),
        })
    }

    fn absorb(&mut self, intent: MergeIntent) -> Result<(), CommandError> {
        match intent {
            MergeIntent::Properties {
                object_id,
                patch,
                baseline,
            } if object_id == self.object_id => {
                self.patch = patch;
                if let (Some(mine), Some(theirs)) = (self.baseline.as_mut(), baseline.as_ref()) {
                    mine.extend_baseline(theirs);
                }
                Ok(())
            }
            other => Err(CommandError::validation(
                "MERGE_MISMATCH",
                format!("Cannot absorb {:?} into update of {}", other, self.object_id),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

pub struct RemoveObject {
    object_id: ObjectId,
    removed: Option<(CanvasObject, Vec<ObjectId>)>,
}

impl RemoveObject {
    pub fn new(object_id: impl Into<ObjectId>) -> Self {
        Self {
            object_id: object_id.into(),
            removed: None,
        }
    }
}

impl Operation for RemoveObject {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveObject
    }

    fn describe(&self) -> String {
        format!("Remove {}", self.object_id)
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        single_target(&self.object_id)
    }

    fn parameters(&self) -> Value {
        json!({ "object_id": self.object_id })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        require_object(context, &self.object_id).map(|_| ())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let document = context.document()?;
        let order = document.object_order();
        let object = document.remove_object(&self.object_id)?;
        let event = DomainEvent::new(
            OBJECT_REMOVED,
            object.id.clone(),
            json!({ "kind": object.kind.as_str() }),
        );
        self.removed = Some((object, order));
        Ok(Effect::new()
            .touching(self.object_id.clone())
            .with_event(event))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let (object, order) = self.removed.as_ref().ok_or_else(|| {
            CommandError::execution("MISSING_BASELINE", "Remove was never applied")
        })?;
        let document = context.document()?;
        document.add_object(object.clone())?;
        document.set_object_order(order)?;
        Ok(Effect::new()
            .touching(object.id.clone())
            .with_event(DomainEvent::new(
                OBJECT_ADDED,
                object.id.clone(),
                json!({ "kind": object.kind.as_str() }),
            )))
    }
}

// ---------------------------------------------------------------------------
// Group / ungroup
// ---------------------------------------------------------------------------

/// Wraps existing objects in a new group placed just above the topmost
/// member.
pub struct GroupObjects {
    member_ids: Vec<ObjectId>,
    group_id: ObjectId,
    previous_order: Option<Vec<ObjectId>>,
}

impl GroupObjects {
    pub fn new(member_ids: Vec<ObjectId>) -> Self {
        Self {
            member_ids,
            group_id: Uuid::new_v4().to_string(),
            previous_order: None,
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<ObjectId>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    fn build_group(&self, members: &[CanvasObject]) -> CanvasObject {
        let left = members.iter().map(|m| m.x).fold(f64::INFINITY, f64::min);
        let top = members.iter().map(|m| m.y).fold(f64::INFINITY, f64::min);
        let right = members
            .iter()
            .map(|m| m.x + m.width)
            .fold(f64::NEG_INFINITY, f64::max);
        let bottom = members
            .iter()
            .map(|m| m.y + m.height)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut group = CanvasObject::new(ObjectKind::Group)
            .with_id(self.group_id.clone())
            .at(left, top)
            .sized(right - left, bottom - top);
        group.children = self.member_ids.clone();
        group
    }
}

impl Operation for GroupObjects {
    fn kind(&self) -> CommandKind {
        CommandKind::GroupObjects
    }

    fn describe(&self) -> String {
        format!("Group {} objects", self.member_ids.len())
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.group_id.clone()];
        ids.extend(self.member_ids.iter().cloned());
        ids
    }

    fn created_ids(&self) -> Vec<ObjectId> {
        vec![self.group_id.clone()]
    }

    fn parameters(&self) -> Value {
        json!({ "member_ids": self.member_ids, "group_id": self.group_id })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        if self.member_ids.len() < 2 {
            return Err(CommandError::validation(
                "PRECONDITION_FAILED",
                "Grouping needs at least two objects",
            ));
        }
        for (i, id) in self.member_ids.iter().enumerate() {
            if self.member_ids[..i].contains(id) {
                return Err(CommandError::validation(
                    "PRECONDITION_FAILED",
                    format!("Object '{}' listed twice", id),
                ));
            }
            require_object(context, id)?;
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let document = context.document()?;
        let members = self
            .member_ids
            .iter()
            .map(|id| fetch_object(context, id))
            .collect::<Result<Vec<_>, _>>()?;
        let previous_order = document.object_order();

        document.add_object(self.build_group(&members))?;

        let topmost = previous_order
            .iter()
            .rposition(|id| self.member_ids.contains(id))
            .unwrap_or(previous_order.len().saturating_sub(1));
        let mut order = previous_order.clone();
        order.insert(topmost + 1, self.group_id.clone());
        document.set_object_order(&order)?;

        if let Some(selection) = &context.selection {
            selection.select_object(&self.group_id)?;
        }
        self.previous_order = Some(previous_order);

        Ok(Effect::new()
            .touching(self.group_id.clone())
            .touching_all(self.member_ids.iter().cloned())
            .with_event(DomainEvent::new(
                OBJECTS_GROUPED,
                self.group_id.clone(),
                json!({ "children": self.member_ids }),
            )))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let previous_order = self.previous_order.as_ref().ok_or_else(|| {
            CommandError::execution("MISSING_BASELINE", "Group was never applied")
        })?;
        let document = context.document()?;
        document.remove_object(&self.group_id)?;
        document.set_object_order(previous_order)?;
        Ok(Effect::new()
            .touching(self.group_id.clone())
            .touching_all(self.member_ids.iter().cloned())
            .with_event(DomainEvent::new(
                OBJECT_UNGROUPED,
                self.group_id.clone(),
                json!({ "children": self.member_ids }),
            )))
    }
}

/// Dissolves a group, leaving its members in place and selected.
pub struct UngroupObject {
    group_id: ObjectId,
    removed: Option<(CanvasObject, Vec<ObjectId>)>,
}

impl UngroupObject {
    pub fn new(group_id: impl Into<ObjectId>) -> Self {
        Self {
            group_id: group_id.into(),
            removed: None,
        }
    }
}

impl Operation for UngroupObject {
    fn kind(&self) -> CommandKind {
        CommandKind::UngroupObject
    }

    fn describe(&self) -> String {
        format!("Ungroup {}", self.group_id)
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        single_target(&self.group_id)
    }

    fn parameters(&self) -> Value {
        json!({ "object_id": self.group_id })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        let object = require_object(context, &self.group_id)?;
        if !object.is_group() {
            return Err(CommandError::validation(
                "PRECONDITION_FAILED",
                format!("Object '{}' is not a group", self.group_id),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let document = context.document()?;
        let order = document.object_order();
        let group = document.remove_object(&self.group_id)?;
        let members: Vec<ObjectId> = group
            .children
            .iter()
            .filter(|id| document.get_object(id).is_some())
            .cloned()
            .collect();

        if let Some(selection) = &context.selection {
            selection.select_multiple(&members)?;
        }
        self.removed = Some((group, order));

        Ok(Effect::new()
            .touching(self.group_id.clone())
            .touching_all(members.iter().cloned())
            .with_event(DomainEvent::new(
                OBJECT_UNGROUPED,
                self.group_id.clone(),
                json!({ "children": members }),
            )))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let (group, order) = self.removed.as_ref().ok_or_else(|| {
            CommandError::execution("MISSING_BASELINE", "Ungroup was never applied")
        })?;
        let document = context.document()?;
        document.add_object(group.clone())?;
        document.set_object_order(order)?;
        Ok(Effect::new()
            .touching(self.group_id.clone())
            .touching_all(group.children.iter().cloned())
            .with_event(DomainEvent::new(
                OBJECTS_GROUPED,
                self.group_id.clone(),
                json!({ "children": group.children }),
            )))
    }
}

// ---------------------------------------------------------------------------
// Reorder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderAction {
    BringForward,
    BringToFront,
    SendBackward,
    SendToBack,
}

impl ReorderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BringForward => "bring_forward",
            Self::BringToFront => "bring_to_front",
            Self::SendBackward => "send_backward",
            Self::SendToBack => "send_to_back",
        }
    }
}

pub struct ReorderObject {
    object_id: ObjectId,
    action: ReorderAction,
    previous_order: Option<Vec<ObjectId>>,
}

impl ReorderObject {
    pub fn new(object_id: impl Into<ObjectId>, action: ReorderAction) -> Self {
        Self {
            object_id: object_id.into(),
            action,
            previous_order: None,
        }
    }
}

impl Operation for ReorderObject {
    fn kind(&self) -> CommandKind {
        CommandKind::ReorderObject
    }

    fn describe(&self) -> String {
        format!("{} {}", self.action.as_str().replace('_', " "), self.object_id)
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        single_target(&self.object_id)
    }

    fn parameters(&self) -> Value {
        json!({ "object_id": self.object_id, "action": self.action })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        require_object(context, &self.object_id).map(|_| ())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let document = context.document()?;
        let previous = document.object_order();
        match self.action {
            ReorderAction::BringForward => document.bring_forward(&self.object_id)?,
            ReorderAction::BringToFront => document.bring_to_front(&self.object_id)?,
            ReorderAction::SendBackward => document.send_backward(&self.object_id)?,
            ReorderAction::SendToBack => document.send_to_back(&self.object_id)?,
        }
        self.previous_order = Some(previous);
        Ok(Effect::new()
            .touching(self.object_id.clone())
            .with_event(DomainEvent::new(
                OBJECT_REORDERED,
                self.object_id.clone(),
                json!({ "action": self.action, "order": document.object_order() }),
            )))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let previous = self.previous_order.as_ref().ok_or_else(|| {
            CommandError::execution("MISSING_BASELINE", "Reorder was never applied")
        })?;
        let document = context.document()?;
        document.set_object_order(previous)?;
        Ok(Effect::new()
            .touching(self.object_id.clone())
            .with_event(DomainEvent::new(
                OBJECT_REORDERED,
                self.object_id.clone(),
                json!({ "action": "restore", "order": previous }),
            )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::commands::{BaseCommand, Command};
    use crate::ports::{DocumentPort, SelectionPort};
    use crate::{InMemoryCanvas, RecordingEventBus};

    fn setup(ids: &[&str]) -> (Arc<InMemoryCanvas>, CommandContext) {
        let objects = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                CanvasObject::new(ObjectKind::Shape)
                    .with_id(*id)
                    .at(i as f64 * 10.0, 0.0)
                    .sized(10.0, 10.0)
            })
            .collect();
        let canvas = Arc::new(InMemoryCanvas::with_objects(objects));
        let ctx = CommandContext::new(
            canvas.clone(),
            canvas.clone(),
            Arc::new(RecordingEventBus::new()),
        );
        (canvas, ctx)
    }

    #[test]
    fn test_add_then_undo() {
        let (canvas, ctx) = setup(&[]);
        let mut command = BaseCommand::new(
            AddObject::new(CanvasObject::new(ObjectKind::Shape).with_id("new")),
            ctx,
        );

        command.execute().unwrap();
        assert_eq!(canvas.object_order(), vec!["new"]);
        assert_eq!(canvas.selection().object_ids, vec!["new"]);

        command.undo().unwrap();
        assert_eq!(canvas.object_count(), 0);
    }

    #[test]
    fn test_add_existing_id_fails_precheck() {
        let (_canvas, ctx) = setup(&["a"]);
        let mut command = BaseCommand::new(
            AddObject::new(CanvasObject::new(ObjectKind::Shape).with_id("a")),
            ctx,
        );
        assert_eq!(command.execute().unwrap_err().code(), "OBJECT_EXISTS");
    }

    #[test]
    fn test_update_captures_baseline() {
        let (canvas, ctx) = setup(&["a"]);
        let patch = ObjectPatch {
            opacity: Some(0.3),
            x: Some(50.0),
            ..Default::default()
        };
        let mut command = BaseCommand::new(UpdateObject::new("a", patch), ctx);

        command.execute().unwrap();
        let baseline = command.operation().baseline().unwrap();
        assert_eq!(baseline.opacity, Some(1.0));
        assert_eq!(baseline.x, Some(0.0));

        command.undo().unwrap();
        let object = canvas.get_object("a").unwrap();
        assert_eq!(object.opacity, 1.0);
        assert_eq!(object.x, 0.0);
    }

    #[test]
    fn test_update_locked_object_is_rejected() {
        let (canvas, ctx) = setup(&["a"]);
        let lock = ObjectPatch {
            locked: Some(true),
            ..Default::default()
        };
        canvas.update_object("a", &lock).unwrap();

        let mut command = BaseCommand::new(
            UpdateObject::new(
                "a",
                ObjectPatch {
                    x: Some(1.0),
                    ..Default::default()
                },
            ),
            ctx.clone(),
        );
        assert_eq!(command.execute().unwrap_err().code(), "OBJECT_LOCKED");

        let unlock = ObjectPatch {
            locked: Some(false),
            ..Default::default()
        };
        let mut command = BaseCommand::new(UpdateObject::new("a", unlock), ctx);
        command.execute().unwrap();
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let (_canvas, ctx) = setup(&["a"]);
        let mut command = BaseCommand::new(UpdateObject::new("a", ObjectPatch::default()), ctx);
        assert_eq!(command.execute().unwrap_err().code(), "EMPTY_PATCH");
    }

    #[test]
    fn test_remove_restores_position() {
        let (canvas, ctx) = setup(&["a", "b", "c"]);
        let mut command = BaseCommand::new(RemoveObject::new("b"), ctx);

        command.execute().unwrap();
        assert_eq!(canvas.object_order(), vec!["a", "c"]);

        command.undo().unwrap();
        assert_eq!(canvas.object_order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_group_and_undo() {
        let (canvas, ctx) = setup(&["a", "b", "c"]);
        let mut command = BaseCommand::new(
            GroupObjects::new(vec!["a".into(), "b".into()]).with_group_id("g"),
            ctx,
        );

        command.execute().unwrap();
        assert_eq!(canvas.object_order(), vec!["a", "b", "g", "c"]);
        let group = canvas.get_object("g").unwrap();
        assert!(group.is_group());
        assert_eq!(group.children, vec!["a", "b"]);
        assert_eq!((group.x, group.width), (0.0, 20.0));

        command.undo().unwrap();
        assert_eq!(canvas.object_order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_group_needs_two_members() {
        let (_canvas, ctx) = setup(&["a"]);
        let command = BaseCommand::new(GroupObjects::new(vec!["a".into()]), ctx);
        assert!(!command.can_execute());
    }

    #[test]
    fn test_ungroup_selects_members() {
        let (canvas, ctx) = setup(&["a", "b"]);
        let mut group = BaseCommand::new(
            GroupObjects::new(vec!["a".into(), "b".into()]).with_group_id("g"),
            ctx.clone(),
        );
        group.execute().unwrap();

        let mut ungroup = BaseCommand::new(UngroupObject::new("g"), ctx);
        ungroup.execute().unwrap();
        assert!(canvas.get_object("g").is_none());
        assert_eq!(canvas.selection().object_ids, vec!["a", "b"]);

        ungroup.undo().unwrap();
        assert_eq!(canvas.object_order(), vec!["a", "b", "g"]);
    }

    #[test]
    fn test_ungroup_rejects_plain_object() {
        let (_canvas, ctx) = setup(&["a"]);
        let mut command = BaseCommand::new(UngroupObject::new("a"), ctx);
        assert_eq!(command.execute().unwrap_err().code(), "PRECONDITION_FAILED");
    }

    #[test]
    fn test_reorder_round_trip() {
        let (canvas, ctx) = setup(&["a", "b", "c"]);
        let mut command =
            BaseCommand::new(ReorderObject::new("a", ReorderAction::BringToFront), ctx);

        command.execute().unwrap();
        assert_eq!(canvas.object_order(), vec!["b", "c", "a"]);
        command.undo().unwrap();
        assert_eq!(canvas.object_order(), vec!["a", "b", "c"]);
    }
}
