use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::commands::object_commands::{fetch_object, require_object};
use crate::commands::{CommandContext, CommandError, CommandKind, Effect, Operation};
use crate::event::{CLIPBOARD_CHANGED, OBJECT_ADDED, OBJECT_REMOVED};
use crate::ports::DocumentPort;
use crate::{CanvasObject, Clipboard, DomainEvent, ObjectId};

/// Offset applied to pasted objects when no target position is given.
pub const PASTE_OFFSET: f64 = 10.0;

fn require_ids(ids: &[ObjectId], context: &CommandContext) -> Result<(), CommandError> {
    if ids.is_empty() {
        return Err(CommandError::validation(
            "PRECONDITION_FAILED",
            "No objects given",
        ));
    }
    for (index, id) in ids.iter().enumerate() {
        if ids[..index].contains(id) {
            return Err(CommandError::validation(
                "DUPLICATE_OBJECT_ID",
                format!("Object {} is listed more than once", id),
            )
            .with_context("object_id", id.as_str()));
        }
        require_object(context, id)?;
    }
    Ok(())
}

fn clipboard_event(clipboard: &Clipboard) -> DomainEvent {
    DomainEvent::new(
        CLIPBOARD_CHANGED,
        "clipboard",
        json!({ "count": clipboard.len() }),
    )
}

/// Put copies of objects on the clipboard. Does not touch the document,
/// so it is not recorded in history.
pub struct CopyObjects {
    object_ids: Vec<ObjectId>,
    clipboard: Arc<Clipboard>,
    previous_contents: Option<Vec<CanvasObject>>,
}

impl CopyObjects {
    pub fn new(object_ids: Vec<ObjectId>, clipboard: Arc<Clipboard>) -> Self {
        Self {
            object_ids,
            clipboard,
            previous_contents: None,
        }
    }
}

impl Operation for CopyObjects {
    fn kind(&self) -> CommandKind {
        CommandKind::CopyObjects
    }

    fn describe(&self) -> String {
        format!("Copy {} objects", self.object_ids.len())
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        self.object_ids.clone()
    }

    fn parameters(&self) -> Value {
        json!({ "object_ids": self.object_ids })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        require_ids(&self.object_ids, context)
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let objects = self
            .object_ids
            .iter()
            .map(|id| fetch_object(context, id))
            .collect::<Result<Vec<_>, _>>()?;
        self.previous_contents = Some(self.clipboard.replace(objects));
        Ok(Effect::new().with_event(clipboard_event(&self.clipboard)))
    }

    fn revert(&mut self, _context: &CommandContext) -> Result<Effect, CommandError> {
        if let Some(previous) = self.previous_contents.take() {
            self.clipboard.replace(previous);
        }
        Ok(Effect::new().with_event(clipboard_event(&self.clipboard)))
    }

    fn is_reversible(&self) -> bool {
        false
    }
}

/// Copy, then remove the originals.
pub struct CutObjects {
    object_ids: Vec<ObjectId>,
    clipboard: Arc<Clipboard>,
    previous_contents: Option<Vec<CanvasObject>>,
    removed: Vec<CanvasObject>,
    previous_order: Vec<ObjectId>,
}

impl CutObjects {
    pub fn new(object_ids: Vec<ObjectId>, clipboard: Arc<Clipboard>) -> Self {
        Self {
            object_ids,
            clipboard,
            previous_contents: None,
            removed: Vec::new(),
            previous_order: Vec::new(),
        }
    }

    /// Re-insert removed objects and restore the previous stacking order.
    fn put_back(&self, document: &Arc<dyn DocumentPort>) -> Result<Effect, CommandError> {
        let mut effect = Effect::new();
        for object in &self.removed {
            document.add_object(object.clone())?;
            effect = effect
                .touching(object.id.clone())
                .with_event(DomainEvent::new(
                    OBJECT_ADDED,
                    object.id.clone(),
                    json!({ "kind": object.kind.as_str() }),
                ));
        }
        document.set_object_order(&self.previous_order)?;
        Ok(effect)
    }
}

impl Operation for CutObjects {
    fn kind(&self) -> CommandKind {
        CommandKind::CutObjects
    }

    fn describe(&self) -> String {
        format!("Cut {} objects", self.object_ids.len())
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        self.object_ids.clone()
    }

    fn parameters(&self) -> Value {
        json!({ "object_ids": self.object_ids })
    }

    fn precheck(&self, context: &CommandContext) -> Result<(), CommandError> {
        require_ids(&self.object_ids, context)
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let document = context.document()?;
        let objects = self
            .object_ids
            .iter()
            .map(|id| fetch_object(context, id))
            .collect::<Result<Vec<_>, _>>()?;
        self.previous_order = document.object_order();
        self.removed.clear();

        let mut effect = Effect::new();
        for id in &self.object_ids {
            let object = match document.remove_object(id) {
                Ok(object) => object,
                Err(error) => {
                    if let Err(e) = self.put_back(document) {
                        tracing::warn!("Could not put back objects after failed cut: {}", e);
                    }
                    self.removed.clear();
                    return Err(error.into());
                }
            };
            effect = effect.touching(id.clone()).with_event(DomainEvent::new(
                OBJECT_REMOVED,
                id.clone(),
                json!({ "kind": object.kind.as_str() }),
            ));
            self.removed.push(object);
        }
        self.previous_contents = Some(self.clipboard.replace(objects));
        Ok(effect.with_event(clipboard_event(&self.clipboard)))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let effect = self.put_back(context.document()?)?;
        if let Some(previous) = self.previous_contents.take() {
            self.clipboard.replace(previous);
        }
        Ok(effect.with_event(clipboard_event(&self.clipboard)))
    }
}

/// Insert copies of the clipboard contents under fresh ids.
///
/// Copies are made once, on first execution; redo re-inserts the same ids.
pub struct PasteObjects {
    clipboard: Arc<Clipboard>,
    position: Option<(f64, f64)>,
    pasted: Vec<CanvasObject>,
}

impl PasteObjects {
    pub fn new(clipboard: Arc<Clipboard>) -> Self {
        Self {
            clipboard,
            position: None,
            pasted: Vec::new(),
        }
    }

    /// Paste so the top-left of the pasted content lands at `(x, y)`.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn pasted_ids(&self) -> Vec<ObjectId> {
        self.pasted.iter().map(|o| o.id.clone()).collect()
    }

    fn prepare(&self, source: Vec<CanvasObject>) -> Vec<CanvasObject> {
        let (dx, dy) = match self.position {
            Some((x, y)) => {
                let left = source.iter().map(|o| o.x).fold(f64::INFINITY, f64::min);
                let top = source.iter().map(|o| o.y).fold(f64::INFINITY, f64::min);
                (x - left, y - top)
            }
            None => (PASTE_OFFSET, PASTE_OFFSET),
        };
        let remap: HashMap<ObjectId, ObjectId> = source
            .iter()
            .map(|o| (o.id.clone(), Uuid::new_v4().to_string()))
            .collect();

        source
            .into_iter()
            .map(|mut object| {
                if let Some(new_id) = remap.get(&object.id) {
                    object.id = new_id.clone();
                }
                object.x += dx;
                object.y += dy;
                for child in &mut object.children {
                    if let Some(new_id) = remap.get(child) {
                        *child = new_id.clone();
                    }
                }
                object
            })
            .collect()
    }

    fn insert(&self, context: &CommandContext) -> Result<Effect, CommandError> {
        let document = context.document()?;
        let mut effect = Effect::new();
        for object in &self.pasted {
            let id = document.add_object(object.clone())?;
            effect = effect.touching(id.clone()).with_event(DomainEvent::new(
                OBJECT_ADDED,
                id,
                json!({ "kind": object.kind.as_str(), "pasted": true }),
            ));
        }
        if let Some(selection) = &context.selection {
            selection.select_multiple(&self.pasted_ids())?;
        }
        Ok(effect)
    }
}

impl Operation for PasteObjects {
    fn kind(&self) -> CommandKind {
        CommandKind::PasteObjects
    }

    fn describe(&self) -> String {
        "Paste".to_string()
    }

    /// Known only once the paste has run.
    fn target_ids(&self) -> Vec<ObjectId> {
        self.pasted_ids()
    }

    fn parameters(&self) -> Value {
        json!({ "position": self.position.map(|(x, y)| [x, y]) })
    }

    fn precheck(&self, _context: &CommandContext) -> Result<(), CommandError> {
        if self.pasted.is_empty() && self.clipboard.is_empty() {
            return Err(CommandError::validation(
                "CLIPBOARD_EMPTY",
                "Nothing to paste",
            ));
        }
        Ok(())
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        self.pasted = self.prepare(self.clipboard.contents());
        self.insert(context)
    }

    fn reapply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        self.insert(context)
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let document = context.document()?;
        let mut effect = Effect::new();
        for object in self.pasted.iter().rev() {
            document.remove_object(&object.id)?;
            effect = effect
                .touching(object.id.clone())
                .with_event(DomainEvent::new(
                    OBJECT_REMOVED,
                    object.id.clone(),
                    json!({ "kind": object.kind.as_str() }),
                ));
        }
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{BaseCommand, Command};
    use crate::ports::{DocumentPort, SelectionPort};
    use crate::{InMemoryCanvas, ObjectKind, RecordingEventBus};

    fn setup() -> (Arc<InMemoryCanvas>, Arc<Clipboard>, CommandContext) {
        let canvas = Arc::new(InMemoryCanvas::with_objects(vec![
            CanvasObject::new(ObjectKind::Shape).with_id("a").at(5.0, 5.0),
            CanvasObject::new(ObjectKind::Shape).with_id("b").at(50.0, 20.0),
        ]));
        let ctx = CommandContext::new(
            canvas.clone(),
            canvas.clone(),
            Arc::new(RecordingEventBus::new()),
        );
        (canvas, Arc::new(Clipboard::new()), ctx)
    }

    #[test]
    fn test_copy_is_not_undoable() {
        let (canvas, clipboard, ctx) = setup();
        let mut command = BaseCommand::new(
            CopyObjects::new(vec!["a".into()], clipboard.clone()),
            ctx,
        );

        command.execute().unwrap();
        assert_eq!(clipboard.len(), 1);
        assert_eq!(canvas.object_count(), 2);
        assert!(!command.can_undo());
    }

    #[test]
    fn test_cut_and_undo() {
        let (canvas, clipboard, ctx) = setup();
        let mut command = BaseCommand::new(
            CutObjects::new(vec!["a".into()], clipboard.clone()),
            ctx,
        );

        command.execute().unwrap();
        assert_eq!(canvas.object_order(), vec!["b"]);
        assert_eq!(clipboard.contents()[0].id, "a");

        command.undo().unwrap();
        assert_eq!(canvas.object_order(), vec!["a", "b"]);
        assert!(clipboard.is_empty());
    }

    #[test]
    fn test_cut_rejects_repeated_ids() {
        let (canvas, clipboard, ctx) = setup();
        clipboard.replace(vec![canvas.get_object("b").unwrap()]);
        let mut command = crate::commands::TransactionalCommand::new(
            CutObjects::new(vec!["a".into(), "a".into()], clipboard.clone()),
            ctx,
        );

        let failure = command.execute().unwrap_err();
        assert_eq!(failure.code(), "DUPLICATE_OBJECT_ID");
        assert_eq!(canvas.object_order(), vec!["a", "b"]);
        assert_eq!(clipboard.contents()[0].id, "b");
    }

    #[test]
    fn test_cut_failing_midway_leaves_clipboard_and_document() {
        let (canvas, clipboard, ctx) = setup();
        clipboard.replace(vec![canvas.get_object("b").unwrap()]);
        let mut cut = CutObjects::new(vec!["b".into(), "a".into(), "b".into()], clipboard.clone());

        let error = cut.apply(&ctx).unwrap_err();
        assert_eq!(error.code(), "OBJECT_NOT_FOUND");
        assert_eq!(canvas.object_order(), vec!["a", "b"]);
        assert_eq!(clipboard.len(), 1);
        assert_eq!(clipboard.contents()[0].id, "b");
    }

    #[test]
    fn test_paste_uses_fresh_ids_and_offset() {
        let (canvas, clipboard, ctx) = setup();
        clipboard.replace(vec![canvas.get_object("a").unwrap()]);
        let mut command = BaseCommand::new(PasteObjects::new(clipboard), ctx);

        command.execute().unwrap();
        let pasted = command.operation().pasted_ids();
        assert_eq!(pasted.len(), 1);
        assert_ne!(pasted[0], "a");
        let copy = canvas.get_object(&pasted[0]).unwrap();
        assert_eq!((copy.x, copy.y), (15.0, 15.0));
        assert_eq!(canvas.selection().object_ids, pasted);

        command.undo().unwrap();
        assert_eq!(canvas.object_count(), 2);
        command.redo().unwrap();
        assert!(canvas.get_object(&pasted[0]).is_some());
    }

    #[test]
    fn test_paste_at_position() {
        let (canvas, clipboard, ctx) = setup();
        clipboard.replace(vec![
            canvas.get_object("a").unwrap(),
            canvas.get_object("b").unwrap(),
        ]);
        let mut command = BaseCommand::new(PasteObjects::new(clipboard).at(100.0, 100.0), ctx);

        command.execute().unwrap();
        let ids = command.operation().pasted_ids();
        let first = canvas.get_object(&ids[0]).unwrap();
        let second = canvas.get_object(&ids[1]).unwrap();
        assert_eq!((first.x, first.y), (100.0, 100.0));
        assert_eq!((second.x, second.y), (145.0, 115.0));
    }

    #[test]
    fn test_paste_empty_clipboard() {
        let (_canvas, clipboard, ctx) = setup();
        let mut command = BaseCommand::new(PasteObjects::new(clipboard), ctx);
        assert_eq!(command.execute().unwrap_err().code(), "CLIPBOARD_EMPTY");
    }

    #[test]
    fn test_paste_remaps_group_children() {
        let (canvas, clipboard, ctx) = setup();
        let mut group = CanvasObject::new(ObjectKind::Group).with_id("g");
        group.children = vec!["a".into()];
        clipboard.replace(vec![canvas.get_object("a").unwrap(), group]);

        let mut command = BaseCommand::new(PasteObjects::new(clipboard), ctx);
        command.execute().unwrap();
        let ids = command.operation().pasted_ids();
        let pasted_group = canvas.get_object(&ids[1]).unwrap();
        assert_eq!(pasted_group.children, vec![ids[0].clone()]);
    }
}
