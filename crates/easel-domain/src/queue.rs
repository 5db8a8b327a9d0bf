//! Serialized access to a `CommandHistory` from many tasks.
//!
//! A single worker task owns the history and processes requests in arrival
//! order, so at most one command is ever executing against the document.
//! Handles are cheap to clone and can be passed to UI and AI tasks alike.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::commands::{Command, CommandError, CommandResult};
use crate::history::CommandHistory;

enum Request {
    Execute {
        command: Box<dyn Command>,
        reply: oneshot::Sender<CommandResult<()>>,
    },
    ExecuteBatch {
        description: String,
        commands: Vec<Box<dyn Command>>,
        reply: oneshot::Sender<CommandResult<()>>,
    },
    Undo {
        reply: oneshot::Sender<CommandResult<()>>,
    },
    Redo {
        reply: oneshot::Sender<CommandResult<()>>,
    },
    Status {
        reply: oneshot::Sender<HistoryStatus>,
    },
}

/// Point-in-time view of the history, e.g. for enabling menu items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryStatus {
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub next_undo: Option<String>,
    pub next_redo: Option<String>,
}

impl HistoryStatus {
    fn of(history: &CommandHistory) -> Self {
        Self {
            undo_depth: history.undo_depth(),
            redo_depth: history.redo_depth(),
            next_undo: history.peek_undo_description(),
            next_redo: history.peek_redo_description(),
        }
    }
}

pub struct CommandQueue;

impl CommandQueue {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker stops once every handle is dropped and hands the history
    /// back through the join handle.
    pub fn spawn(history: CommandHistory) -> (CommandQueueHandle, JoinHandle<CommandHistory>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker = tokio::spawn(run(history, rx, Arc::clone(&in_flight)));
        (CommandQueueHandle { tx, in_flight }, worker)
    }
}

async fn run(
    mut history: CommandHistory,
    mut rx: mpsc::UnboundedReceiver<Request>,
    in_flight: Arc<AtomicUsize>,
) -> CommandHistory {
    tracing::debug!("Command queue started");
    while let Some(request) = rx.recv().await {
        let (outcome, reply) = match request {
            Request::Execute { command, reply } => (history.execute(command), reply),
            Request::ExecuteBatch {
                description,
                commands,
                reply,
            } => (history.execute_batch(description, commands), reply),
            Request::Undo { reply } => (history.undo(), reply),
            Request::Redo { reply } => (history.redo(), reply),
            Request::Status { reply } => {
                let _ = reply.send(HistoryStatus::of(&history));
                continue;
            }
        };
        // Released before replying so a caller that got its answer sees an idle queue.
        in_flight.fetch_sub(1, Ordering::AcqRel);
        if reply.send(outcome).is_err() {
            tracing::debug!("Requester went away before its reply");
        }
    }
    tracing::debug!("Command queue stopped");
    history
}

fn closed() -> CommandError {
    CommandError::execution("QUEUE_CLOSED", "Command queue is no longer running")
}

#[derive(Clone)]
pub struct CommandQueueHandle {
    tx: mpsc::UnboundedSender<Request>,
    in_flight: Arc<AtomicUsize>,
}

impl CommandQueueHandle {
    /// Number of requests queued or running.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.pending() > 0
    }

    /// Queue `command` behind whatever is already pending.
    pub async fn submit(&self, command: Box<dyn Command>) -> CommandResult<()> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.round_trip(|reply| Request::Execute { command, reply })
            .await
    }

    /// Run `command` only if nothing else is queued or running.
    pub async fn try_submit(&self, command: Box<dyn Command>) -> CommandResult<()> {
        if self
            .in_flight
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CommandError::concurrency(
                "COMMAND_IN_PROGRESS",
                format!("Another command is running; '{}' was refused", command.description()),
            )
            .into());
        }
        self.round_trip(|reply| Request::Execute { command, reply })
            .await
    }

    pub async fn submit_batch(
        &self,
        description: impl Into<String>,
        commands: Vec<Box<dyn Command>>,
    ) -> CommandResult<()> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let description = description.into();
        self.round_trip(|reply| Request::ExecuteBatch {
            description,
            commands,
            reply,
        })
        .await
    }

    pub async fn undo(&self) -> CommandResult<()> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.round_trip(|reply| Request::Undo { reply }).await
    }

    pub async fn redo(&self) -> CommandResult<()> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.round_trip(|reply| Request::Redo { reply }).await
    }

    pub async fn status(&self) -> Result<HistoryStatus, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Status { reply })
            .map_err(|_| closed())?;
        rx.await.map_err(|_| closed())
    }

    /// Send a counted request and wait for its reply.
    async fn round_trip<F>(&self, build: F) -> CommandResult<()>
    where
        F: FnOnce(oneshot::Sender<CommandResult<()>>) -> Request,
    {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(build(reply)).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(closed().into());
        }
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                // Dropped unanswered: the worker stopped before reaching it.
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                Err(closed().into())
            }
        }
    }
}
