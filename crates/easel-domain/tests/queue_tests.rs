use std::sync::mpsc;
use std::sync::Arc;

use easel_domain::commands::*;
use easel_domain::*;
use serde_json::{json, Value};

/// Blocks inside `apply` until the test releases it.
struct Gate {
    started: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

impl Operation for Gate {
    fn kind(&self) -> CommandKind {
        CommandKind::Custom("gate")
    }

    fn describe(&self) -> String {
        "Wait for release".into()
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn parameters(&self) -> Value {
        json!({})
    }

    fn apply(&mut self, _context: &CommandContext) -> Result<Effect, CommandError> {
        let _ = self.started.send(());
        self.release
            .recv()
            .map_err(|_| CommandError::execution("GATE_DROPPED", "release channel closed"))?;
        Ok(Effect::new())
    }

    fn revert(&mut self, _context: &CommandContext) -> Result<Effect, CommandError> {
        Ok(Effect::new())
    }
}

/// Takes the worker down with it.
struct Crash;

impl Operation for Crash {
    fn kind(&self) -> CommandKind {
        CommandKind::Custom("crash")
    }

    fn describe(&self) -> String {
        "Crash".into()
    }

    fn target_ids(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn parameters(&self) -> Value {
        json!({})
    }

    fn apply(&mut self, _context: &CommandContext) -> Result<Effect, CommandError> {
        panic!("renderer crashed");
    }

    fn revert(&mut self, _context: &CommandContext) -> Result<Effect, CommandError> {
        Ok(Effect::new())
    }
}

fn factory(canvas: &Arc<InMemoryCanvas>) -> CommandFactory {
    CommandFactory::new(CommandContext::new(
        canvas.clone(),
        canvas.clone(),
        Arc::new(RecordingEventBus::new()),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_try_submit_is_refused_while_a_command_runs() {
    let canvas = Arc::new(InMemoryCanvas::new());
    let factory = factory(&canvas);
    let (queue, _worker) = CommandQueue::spawn(CommandHistory::new());

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let gate = BaseCommand::new(
        Gate {
            started: started_tx,
            release: release_rx,
        },
        factory.context().fork(),
    );

    let running = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(Box::new(gate)).await })
    };
    tokio::task::spawn_blocking(move || started_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(queue.is_busy());

    let refused = queue
        .try_submit(factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("late")))
        .await
        .unwrap_err();
    assert_eq!(refused.code(), "COMMAND_IN_PROGRESS");
    assert!(matches!(refused.error, CommandError::Concurrency { .. }));

    release_tx.send(()).unwrap();
    running.await.unwrap().unwrap();
    assert!(!queue.is_busy());

    queue
        .try_submit(factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("late")))
        .await
        .unwrap();
    assert_eq!(canvas.object_count(), 1);
    assert_eq!(queue.status().await.unwrap().undo_depth, 2);
}

#[tokio::test]
async fn test_submissions_apply_in_arrival_order() {
    let canvas = Arc::new(InMemoryCanvas::with_objects(vec![
        CanvasObject::new(ObjectKind::Shape).with_id("a")
    ]));
    let factory = factory(&canvas);
    let (queue, worker) = CommandQueue::spawn(CommandHistory::new());

    for x in [10.0, 20.0, 30.0] {
        let command = BaseCommand::new(
            UpdateObject::new(
                "a",
                ObjectPatch {
                    x: Some(x),
                    ..Default::default()
                },
            ),
            factory.context().fork(),
        );
        queue.submit(Box::new(command)).await.unwrap();
    }
    assert_eq!(canvas.get_object("a").unwrap().x, 30.0);

    queue.undo().await.unwrap();
    assert_eq!(canvas.get_object("a").unwrap().x, 20.0);

    let status = queue.status().await.unwrap();
    assert_eq!((status.undo_depth, status.redo_depth), (2, 1));

    drop(queue);
    let history = worker.await.unwrap();
    assert!(history.can_redo());
}

#[tokio::test]
async fn test_batches_go_through_the_queue() {
    let canvas = Arc::new(InMemoryCanvas::new());
    let factory = factory(&canvas);
    let (queue, _worker) = CommandQueue::spawn(CommandHistory::new());

    queue
        .submit_batch(
            "Two shapes",
            vec![
                factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("one")),
                factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("two")),
            ],
        )
        .await
        .unwrap();
    assert_eq!(canvas.object_count(), 2);

    let status = queue.status().await.unwrap();
    assert_eq!(status.next_undo.as_deref(), Some("Two shapes"));
}

#[tokio::test]
async fn test_stopped_worker_releases_queued_requests() {
    let canvas = Arc::new(InMemoryCanvas::new());
    let factory = factory(&canvas);
    let (queue, worker) = CommandQueue::spawn(CommandHistory::new());

    let crash = BaseCommand::new(Crash, factory.context().fork());
    let (crashed, queued) = tokio::join!(
        queue.submit(Box::new(crash)),
        queue.submit(factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("a"))),
    );
    assert_eq!(crashed.unwrap_err().code(), "QUEUE_CLOSED");
    assert_eq!(queued.unwrap_err().code(), "QUEUE_CLOSED");
    assert!(worker.await.is_err());

    assert_eq!(queue.pending(), 0);
    let refused = queue
        .try_submit(factory.add_object(CanvasObject::new(ObjectKind::Shape).with_id("b")))
        .await
        .unwrap_err();
    assert_eq!(refused.code(), "QUEUE_CLOSED");
    assert_eq!(canvas.object_count(), 0);
}
