use serde_json::{json, Value};

use crate::commands::object_commands::require_object;
use crate::commands::{CommandContext, CommandError, CommandKind, Effect, Operation};
use crate::event::SELECTION_CHANGED;
use crate::{DomainEvent, ObjectId, Selection, SelectionMask, SelectionMode};

fn selection_event(selection: &Selection) -> DomainEvent {
    DomainEvent::new(
        SELECTION_CHANGED,
        "selection",
        json!({
            "object_ids": selection.object_ids,
            "bounds": selection.bounds,
        }),
    )
}

/// Put a previously captured selection back.
fn restore(
    context: &CommandContext,
    previous: &Option<Selection>,
) -> Result<Effect, CommandError> {
    let previous = previous.as_ref().ok_or_else(|| {
        CommandError::execution("MISSING_BASELINE", "Selection change was never applied")
    })?;
    context.selection()?.restore_selection(previous)?;
    Ok(Effect::new()
        .touching_all(previous.object_ids.iter().cloned())
        .with_event(selection_event(previous)))
}

/// Combine a pixel mask into the current selection.
pub struct CreateSelection {
    mask: SelectionMask,
    mode: SelectionMode,
    previous: Option<Selection>,
}

impl CreateSelection {
    pub fn new(mask: SelectionMask, mode: SelectionMode) -> Self {
        Self {
            mask,
            mode,
            previous: None,
        }
    }
}

impl Operation for CreateSelection {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateSelection
    }

    fn describe(&self) -> String {
        format!("Selection ({:?})", self.mode).to_lowercase()
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn parameters(&self) -> Value {
        json!({ "mask": self.mask, "mode": self.mode })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        context.selection()?;
        let expected = (self.mask.width as usize) * (self.mask.height as usize);
        if self.mask.data.len() != expected {
            return Err(CommandError::validation(
                "INVALID_MASK",
                format!(
                    "Mask of {}x{} has {} pixels",
                    self.mask.width,
                    self.mask.height,
                    self.mask.data.len()
                ),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let port = context.selection()?;
        let previous = port.selection();
        port.apply_selection(&self.mask, self.mode)?;
        self.previous = Some(previous);
        Ok(Effect::new().with_event(selection_event(&port.selection())))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        restore(context, &self.previous)
    }
}

pub struct ClearSelection {
    previous: Option<Selection>,
}

impl ClearSelection {
    pub fn new() -> Self {
        Self { previous: None }
    }
}

impl Default for ClearSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for ClearSelection {
    fn kind(&self) -> CommandKind {
        CommandKind::ClearSelection
    }

    fn describe(&self) -> String {
        "Clear selection".to_string()
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn parameters(&self) -> Value {
        json!({})
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        context.selection().map(|_| ())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let port = context.selection()?;
        let previous = port.selection();
        port.clear();
        let effect = Effect::new()
            .touching_all(previous.object_ids.iter().cloned())
            .with_event(selection_event(&port.selection()));
        self.previous = Some(previous);
        Ok(effect)
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        restore(context, &self.previous)
    }
}

/// Replace the object selection with the given ids.
pub struct SelectObjects {
    object_ids: Vec<ObjectId>,
    previous: Option<Selection>,
}

impl SelectObjects {
    pub fn new(object_ids: Vec<ObjectId>) -> Self {
        Self {
            object_ids,
            previous: None,
        }
    }
}

impl Operation for SelectObjects {
    fn kind(&self) -> CommandKind {
        CommandKind::SelectObjects
    }

    fn describe(&self) -> String {
        format!("Select {} objects", self.object_ids.len())
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        self.object_ids.clone()
    }

    fn parameters(&self) -> Value {
        json!({ "object_ids": self.object_ids })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        context.selection()?;
        for id in &self.object_ids {
            require_object(context, id)?;
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let port = context.selection()?;
        let previous = port.selection();
        port.select_multiple(&self.object_ids)?;
        self.previous = Some(previous);
        Ok(Effect::new()
            .touching_all(self.object_ids.iter().cloned())
            .with_event(selection_event(&port.selection())))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        restore(context, &self.previous)
    }
}
