//! Capabilities the command engine consumes but does not implement.
//!
//! The rendering adapter owns the live document; commands only ever reach
//! it through these traits, which keeps every mutation observable and
//! every command testable against `InMemoryCanvas`.

use easel_core::EaselResult;

use crate::{
    CanvasObject, DocumentStateSnapshot, DomainEvent, ObjectId, ObjectPatch, Selection,
    SelectionMask, SelectionMode,
};

/// Single writer of document state.
pub trait DocumentPort: Send + Sync {
    /// Append an object at the top of the z-order.
    fn add_object(&self, object: CanvasObject) -> EaselResult<ObjectId>;

    /// Remove an object, returning it as it was.
    fn remove_object(&self, id: &str) -> EaselResult<CanvasObject>;

    fn update_object(&self, id: &str, patch: &ObjectPatch) -> EaselResult<()>;

    fn get_object(&self, id: &str) -> Option<CanvasObject>;

    fn get_selected_objects(&self) -> Vec<CanvasObject>;

    /// Ids from bottom to top.
    fn object_order(&self) -> Vec<ObjectId>;

    /// Reorder objects; `ids` must be a permutation of the current order.
    fn set_object_order(&self, ids: &[ObjectId]) -> EaselResult<()>;

    fn bring_forward(&self, id: &str) -> EaselResult<()>;
    fn bring_to_front(&self, id: &str) -> EaselResult<()>;
    fn send_backward(&self, id: &str) -> EaselResult<()>;
    fn send_to_back(&self, id: &str) -> EaselResult<()>;

    /// Deep copy of the whole mutable document.
    fn capture_state(&self) -> DocumentStateSnapshot;

    /// Replace the whole document with `snapshot`.
    fn restore_state(&self, snapshot: &DocumentStateSnapshot) -> EaselResult<()>;
}

pub trait SelectionPort: Send + Sync {
    fn selection(&self) -> Selection;
    fn apply_selection(&self, mask: &SelectionMask, mode: SelectionMode) -> EaselResult<()>;
    fn restore_selection(&self, selection: &Selection) -> EaselResult<()>;
    fn clear(&self);
    fn select_object(&self, id: &str) -> EaselResult<()>;
    fn select_multiple(&self, ids: &[ObjectId]) -> EaselResult<()>;
    fn deselect_all(&self);
}

/// Fire-and-forget publication of domain events.
pub trait EventPort: Send + Sync {
    fn emit(&self, event: DomainEvent);
}
