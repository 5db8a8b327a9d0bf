use serde_json::{json, Value};

use crate::commands::object_commands::{fetch_object, require_object};
use crate::commands::{CommandContext, CommandError, CommandKind, Effect, MergeIntent, Operation};
use crate::event::TEXT_EDITED;
use crate::{DomainEvent, FieldUpdate, ObjectId, ObjectKind, ObjectPatch};

/// Replace the content of a text object. Typing bursts merge.
pub struct EditText {
    object_id: ObjectId,
    text: String,
    previous: Option<Option<String>>,
}

impl EditText {
    pub fn new(object_id: impl Into<ObjectId>, text: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            text: text.into(),
            previous: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn set_text(
        &self,
        context: &CommandContext,
        text: FieldUpdate<String>,
    ) -> Result<Effect, CommandError> {
        let length = match &text {
            FieldUpdate::Set(value) => value.chars().count(),
            _ => 0,
        };
        let patch = ObjectPatch {
            text,
            ..Default::default()
        };
        context.document()?.update_object(&self.object_id, &patch)?;
        Ok(Effect::new()
            .touching(self.object_id.clone())
            .with_event(DomainEvent::new(
                TEXT_EDITED,
                self.object_id.clone(),
                json!({ "length": length }),
            )))
    }
}

impl Operation for EditText {
    fn kind(&self) -> CommandKind {
        CommandKind::EditText
    }

    fn describe(&self) -> String {
        format!("Edit text of {}", self.object_id)
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        vec![self.object_id.clone()]
    }

    fn parameters(&self) -> Value {
        json!({ "object_id": self.object_id, "text": self.text })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        let object = require_object(context, &self.object_id)?;
        if object.kind != ObjectKind::Text {
            return Err(CommandError::validation(
                "PRECONDITION_FAILED",
                format!("Object '{}' is not a text object", self.object_id),
            ));
        }
        if object.locked {
            return Err(CommandError::validation(
                "OBJECT_LOCKED",
                format!("Object '{}' is locked", self.object_id),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let current = fetch_object(context, &self.object_id)?;
        let effect = self.set_text(context, FieldUpdate::Set(self.text.clone()))?;
        self.previous = Some(current.text);
        Ok(effect)
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let previous = self.previous.clone().ok_or_else(|| {
            CommandError::execution("MISSING_BASELINE", "Text edit was never applied")
        })?;
        self.set_text(context, previous.into())
    }

    fn merge_intent(&self) -> Option<MergeIntent> {
        Some(MergeIntent::Text {
            object_id: self.object_id.clone(),
            text: self.text.clone(),
            baseline: self.previous.clone(),
        })
    }

    fn absorb(&mut self, intent: MergeIntent) -> Result<(), CommandError> {
        match intent {
            MergeIntent::Text {
                object_id, text, ..
            } if object_id == self.object_id => {
                self.text = text;
                Ok(())
            }
            other => Err(CommandError::validation(
                "MERGE_MISMATCH",
                format!("Cannot absorb {:?} into text edit of {}", other, self.object_id),
            )),
        }
    }
}
