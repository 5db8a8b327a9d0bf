use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use easel_core::{EaselError, EaselResult};
use easel_domain::commands::*;
use easel_domain::*;
use mockall::{mock, predicate, Sequence};
use serde_json::{json, Value};

mock! {
    pub Bus {}

    impl EventPort for Bus {
        fn emit(&self, event: DomainEvent);
    }
}

trait Journal: Send + Sync {
    fn record(&self, entry: String);
}

mock! {
    pub Journal {}

    impl Journal for Journal {
        fn record(&self, entry: String);
    }
}

/// In-memory document whose snapshot restore can be made to fail.
struct BrittleCanvas {
    inner: InMemoryCanvas,
    refusals: AtomicUsize,
}

impl BrittleCanvas {
    fn new(objects: Vec<CanvasObject>) -> Self {
        Self {
            inner: InMemoryCanvas::with_objects(objects),
            refusals: AtomicUsize::new(0),
        }
    }

    fn refuse_restore(&self) {
        self.refusals.store(usize::MAX, Ordering::SeqCst);
    }

    fn refuse_next_restore(&self) {
        self.refusals.store(1, Ordering::SeqCst);
    }
}

impl DocumentPort for BrittleCanvas {
    fn add_object(&self, object: CanvasObject) -> EaselResult<ObjectId> {
        self.inner.add_object(object)
    }

    fn remove_object(&self, id: &str) -> EaselResult<CanvasObject> {
        self.inner.remove_object(id)
    }

    fn update_object(&self, id: &str, patch: &ObjectPatch) -> EaselResult<()> {
        self.inner.update_object(id, patch)
    }

    fn get_object(&self, id: &str) -> Option<CanvasObject> {
        self.inner.get_object(id)
    }

    fn get_selected_objects(&self) -> Vec<CanvasObject> {
        self.inner.get_selected_objects()
    }

    fn object_order(&self) -> Vec<ObjectId> {
        self.inner.object_order()
    }

    fn set_object_order(&self, ids: &[ObjectId]) -> EaselResult<()> {
        self.inner.set_object_order(ids)
    }

    fn bring_forward(&self, id: &str) -> EaselResult<()> {
        self.inner.bring_forward(id)
    }

    fn bring_to_front(&self, id: &str) -> EaselResult<()> {
        self.inner.bring_to_front(id)
    }

    fn send_backward(&self, id: &str) -> EaselResult<()> {
        self.inner.send_backward(id)
    }

    fn send_to_back(&self, id: &str) -> EaselResult<()> {
        self.inner.send_to_back(id)
    }

    fn capture_state(&self) -> DocumentStateSnapshot {
        self.inner.capture_state()
    }

    fn restore_state(&self, snapshot: &DocumentStateSnapshot) -> EaselResult<()> {
        let remaining = self.refusals.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.refusals.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(EaselError::Internal("renderer lost the document".into()));
        }
        self.inner.restore_state(snapshot)
    }
}

/// Fades an object, then optionally fails before finishing.
struct Fade {
    id: String,
    fail_forward: bool,
    fail_backward: bool,
}

impl Operation for Fade {
    fn kind(&self) -> CommandKind {
        CommandKind::Custom("fade")
    }

    fn describe(&self) -> String {
        format!("Fade {}", self.id)
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        vec![self.id.clone()]
    }

    fn parameters(&self) -> Value {
        json!({ "object_id": self.id })
    }

    fn apply(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let patch = ObjectPatch {
            opacity: Some(0.2),
            ..Default::default()
        };
        context.document()?.update_object(&self.id, &patch)?;
        if self.fail_forward {
            return Err(CommandError::execution("EXECUTION_FAILED", "fade interrupted"));
        }
        Ok(Effect::new().touching(self.id.clone()))
    }

    fn revert(&mut self, context: &CommandContext) -> Result<Effect, CommandError> {
        let patch = ObjectPatch {
            opacity: Some(1.0),
            visible: Some(false),
            ..Default::default()
        };
        context.document()?.update_object(&self.id, &patch)?;
        if self.fail_backward {
            return Err(CommandError::execution("EXECUTION_FAILED", "unfade interrupted"));
        }
        Ok(Effect::new().touching(self.id.clone()))
    }
}

/// Reports each step to a journal; the step named `failing` refuses to apply.
struct Step {
    name: &'static str,
    failing: bool,
    journal: Arc<dyn Journal>,
}

impl Operation for Step {
    fn kind(&self) -> CommandKind {
        CommandKind::Custom("step")
    }

    fn describe(&self) -> String {
        format!("Step {}", self.name)
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn parameters(&self) -> Value {
        json!({ "name": self.name })
    }

    fn apply(&mut self, _context: &CommandContext) -> Result<Effect, CommandError> {
        self.journal.record(format!("apply {}", self.name));
        if self.failing {
            return Err(CommandError::execution("EXECUTION_FAILED", "step refused"));
        }
        Ok(Effect::new())
    }

    fn revert(&mut self, _context: &CommandContext) -> Result<Effect, CommandError> {
        self.journal.record(format!("revert {}", self.name));
        Ok(Effect::new())
    }
}

fn brittle_context(canvas: &Arc<BrittleCanvas>) -> CommandContext {
    CommandContext::empty()
        .with_document(canvas.clone())
        .with_events(Arc::new(RecordingEventBus::new()))
}

fn fade(fail_forward: bool, fail_backward: bool) -> Fade {
    Fade {
        id: "a".into(),
        fail_forward,
        fail_backward,
    }
}

#[test]
fn test_failed_restore_is_fatal() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    canvas.refuse_restore();
    let mut command = TransactionalCommand::new(fade(true, false), brittle_context(&canvas));

    let failure = command.execute().unwrap_err();
    assert!(failure.is_fatal());
    match &failure.error {
        CommandError::RollbackFailed { original, message } => {
            assert_eq!(original.code(), "EXECUTION_FAILED");
            assert!(message.contains("renderer lost the document"));
        }
        other => panic!("expected rollback failure, got {other:?}"),
    }
}

#[test]
fn test_successful_restore_is_not_fatal() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let mut command = TransactionalCommand::new(fade(true, false), brittle_context(&canvas));

    let failure = command.execute().unwrap_err();
    assert!(!failure.is_fatal());
    assert_eq!(canvas.get_object("a").unwrap().opacity, 1.0);
}

#[test]
fn test_guarded_undo_restores_on_failure() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let mut command = TransactionalCommand::new(fade(false, true), brittle_context(&canvas));

    command.execute().unwrap();
    let failure = command.undo().unwrap_err();
    assert!(!failure.is_fatal());

    let object = canvas.get_object("a").unwrap();
    assert_eq!(object.opacity, 0.2);
    assert!(object.visible);
    assert!(command.can_undo());
}

#[test]
fn test_fatal_undo_clears_history() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let mut history = CommandHistory::new();
    let context = brittle_context(&canvas);

    history
        .execute(Box::new(TransactionalCommand::new(
            fade(false, false),
            context.fork(),
        )))
        .unwrap();
    history
        .execute(Box::new(TransactionalCommand::new(
            fade(false, true),
            context.fork(),
        )))
        .unwrap();
    assert_eq!(history.undo_depth(), 2);

    canvas.refuse_restore();
    let failure = history.undo().unwrap_err();
    assert!(failure.is_fatal());
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn test_failed_unwind_without_snapshot_is_fatal() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let context = brittle_context(&canvas);
    let children: Vec<Box<dyn Command>> = vec![
        Box::new(BaseCommand::new(fade(false, true), context.fork())),
        Box::new(BaseCommand::new(fade(true, false), context.fork())),
    ];
    let mut composite = CompositeCommand::new("Fade twice", Some(context), children);

    let failure = composite.execute().unwrap_err();
    assert!(failure.is_fatal());
}

#[test]
fn test_failed_unwind_with_snapshot_recovers() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let before = canvas.capture_state();
    let context = brittle_context(&canvas);
    let children: Vec<Box<dyn Command>> = vec![
        Box::new(BaseCommand::new(fade(false, true), context.fork())),
        Box::new(BaseCommand::new(fade(true, false), context.fork())),
    ];
    let mut composite = CompositeCommand::transactional("Fade twice", context, children);

    let failure = composite.execute().unwrap_err();
    assert!(!failure.is_fatal());
    assert_eq!(canvas.capture_state(), before);
}

#[test]
fn test_fatal_execute_clears_history() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let mut history = CommandHistory::new();
    let context = brittle_context(&canvas);

    history
        .execute(Box::new(TransactionalCommand::new(
            fade(false, false),
            context.fork(),
        )))
        .unwrap();
    canvas.refuse_restore();

    let failure = history
        .execute(Box::new(TransactionalCommand::new(
            fade(true, false),
            context.fork(),
        )))
        .unwrap_err();
    assert!(failure.is_fatal());
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn test_fatal_batch_clears_history() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let mut history = CommandHistory::new();
    let context = brittle_context(&canvas);

    history
        .execute(Box::new(TransactionalCommand::new(
            fade(false, false),
            context.fork(),
        )))
        .unwrap();
    canvas.refuse_restore();

    let batch: Vec<Box<dyn Command>> = vec![Box::new(TransactionalCommand::new(
        fade(true, false),
        context.fork(),
    ))];
    let failure = history.execute_batch("Fade again", batch).unwrap_err();
    assert!(failure.is_fatal());
    assert_eq!(history.undo_depth(), 0);
}

#[test]
fn test_transactional_composite_recovers_from_a_fatal_child() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let before = canvas.capture_state();
    let context = brittle_context(&canvas);
    let children: Vec<Box<dyn Command>> = vec![
        Box::new(BaseCommand::new(fade(false, false), context.fork())),
        Box::new(TransactionalCommand::new(fade(true, false), context.fork())),
    ];
    let mut composite = CompositeCommand::transactional("Fade twice", context, children);

    canvas.refuse_next_restore();
    let failure = composite.execute().unwrap_err();
    assert!(!failure.is_fatal());
    assert_eq!(failure.code(), "EXECUTION_FAILED");
    assert_eq!(canvas.capture_state(), before);
    assert_eq!(composite.executed_count(), 0);
    assert_eq!(composite.state(), CommandState::Created);
}

#[test]
fn test_unrecoverable_composite_refuses_to_run_again() {
    let canvas = Arc::new(BrittleCanvas::new(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let context = brittle_context(&canvas);
    let children: Vec<Box<dyn Command>> = vec![
        Box::new(BaseCommand::new(fade(false, false), context.fork())),
        Box::new(TransactionalCommand::new(fade(true, false), context.fork())),
    ];
    let mut composite = CompositeCommand::new("Fade twice", Some(context), children);

    canvas.refuse_next_restore();
    let failure = composite.execute().unwrap_err();
    match &failure.error {
        CommandError::RollbackFailed { original, message } => {
            assert_eq!(original.code(), "EXECUTION_FAILED");
            assert!(message.contains("renderer lost the document"));
        }
        other => panic!("expected rollback failure, got {other:?}"),
    }
    assert!(!composite.can_execute());
    assert_eq!(composite.execute().unwrap_err().code(), "INVALID_STATE");
}

#[test]
fn test_composite_unwinds_in_reverse_order() {
    let canvas = Arc::new(InMemoryCanvas::new());
    let context = CommandContext::new(
        canvas.clone(),
        canvas.clone(),
        Arc::new(RecordingEventBus::new()),
    );
    let mut journal = MockJournal::new();
    let mut sequence = Sequence::new();
    for entry in [
        "apply one",
        "apply two",
        "apply three",
        "revert two",
        "revert one",
    ] {
        journal
            .expect_record()
            .with(predicate::eq(entry.to_string()))
            .times(1)
            .in_sequence(&mut sequence)
            .return_const(());
    }
    let journal: Arc<dyn Journal> = Arc::new(journal);
    let step = |name: &'static str, failing: bool| -> Box<dyn Command> {
        Box::new(BaseCommand::new(
            Step {
                name,
                failing,
                journal: journal.clone(),
            },
            context.fork(),
        ))
    };

    let mut composite = CompositeCommand::new(
        "Three steps",
        Some(context.clone()),
        vec![step("one", false), step("two", false), step("three", true)],
    );
    let failure = composite.execute().unwrap_err();
    assert!(!failure.is_fatal());
    assert_eq!(composite.executed_count(), 0);
}

#[test]
fn test_composite_unwinds_a_copy_without_failing_fatally() {
    let canvas = Arc::new(InMemoryCanvas::with_objects(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let factory = CommandFactory::new(CommandContext::new(
        canvas.clone(),
        canvas.clone(),
        Arc::new(RecordingEventBus::new()),
    ));
    factory
        .clipboard()
        .replace(vec![CanvasObject::text("kept").with_id("note")]);
    let before = canvas.capture_state();

    let mut composite = factory.composite(
        "Copy then remove",
        vec![
            factory.copy_objects(vec!["a".into()]),
            factory.remove_object("missing"),
        ],
    );
    let failure = composite.execute().unwrap_err();
    assert!(!failure.is_fatal());
    assert_eq!(failure.code(), "PRECONDITION_FAILED");
    assert_eq!(canvas.capture_state(), before);
    assert_eq!(factory.clipboard().contents()[0].id, "note");
}

#[test]
fn test_events_published_only_on_success() {
    let canvas = Arc::new(InMemoryCanvas::new());
    let mut bus = MockBus::new();
    bus.expect_emit()
        .withf(|event| event.event_type == "object.added" && event.aggregate_id == "obj-1")
        .times(1)
        .return_const(());
    let factory = CommandFactory::new(CommandContext::new(
        canvas.clone(),
        canvas.clone(),
        Arc::new(bus),
    ));

    let mut ok = factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("obj-1"));
    ok.execute().unwrap();

    let mut duplicate = factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("obj-1"));
    assert!(duplicate.execute().is_err());
    let mut missing = factory.remove_object("nope");
    assert!(missing.execute().is_err());
}

#[test]
fn test_composite_events_are_aggregated_in_order() {
    let canvas = Arc::new(InMemoryCanvas::with_objects(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let mut bus = MockBus::new();
    let mut sequence = mockall::Sequence::new();
    for expected in ["object.updated", "object.reordered"] {
        bus.expect_emit()
            .withf(move |event| event.event_type == expected)
            .times(1)
            .in_sequence(&mut sequence)
            .return_const(());
    }
    let factory = CommandFactory::new(CommandContext::new(
        canvas.clone(),
        canvas.clone(),
        Arc::new(bus),
    ));

    let mut composite = factory.composite(
        "Tweak",
        vec![
            factory.update_object(
                "a",
                ObjectPatch {
                    rotation: Some(45.0),
                    ..Default::default()
                },
            ),
            factory.reorder_object("a", ReorderAction::SendToBack),
        ],
    );
    let success = composite.execute().unwrap();
    assert_eq!(success.events.len(), 2);
    assert_eq!(success.metadata.affected_object_ids, vec!["a"]);
}
