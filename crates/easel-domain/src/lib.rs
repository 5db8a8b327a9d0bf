pub mod clipboard;
pub mod commands;
pub mod document;
pub mod event;
pub mod field_update;
pub mod history;
pub mod object;
pub mod ports;
pub mod queue;
pub mod selection;
pub mod validation;

pub use clipboard::Clipboard;
pub use commands::{
    Command, CommandContext, CommandError, CommandFactory, CommandFailure, CommandKind,
    CommandMetadata, CommandResult, CommandSource, CommandState, CommandSuccess,
    CompositeCommand, MergePolicy, TransactionalCommand,
};
pub use document::{Camera, DocumentStateSnapshot, InMemoryCanvas, Viewport};
pub use event::{DomainEvent, RecordingEventBus};
pub use field_update::FieldUpdate;
pub use history::CommandHistory;
pub use object::{CanvasObject, ObjectId, ObjectKind, ObjectPatch};
pub use ports::{DocumentPort, EventPort, SelectionPort};
pub use queue::{CommandQueue, CommandQueueHandle, HistoryStatus};
pub use selection::{Bounds, Selection, SelectionMask, SelectionMode};
pub use validation::{
    BatchValidationResult, CommandValidationService, ValidationIssue, ValidationResult,
};
