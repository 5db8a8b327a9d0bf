//! Point-in-time capture of the document, and an in-memory document.
//!
//! `DocumentStateSnapshot` is plain owned data: cloning it out of the live
//! document shares nothing with it, so later mutations cannot leak into a
//! snapshot. Transactional commands use it as rollback insurance.
//!
//! `InMemoryCanvas` implements both the document and the selection port
//! without a renderer. Headless tools and the test suite run against it.

use std::collections::BTreeSet;

use easel_core::{EaselError, EaselResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ports::{DocumentPort, SelectionPort};
use crate::{CanvasObject, ObjectId, ObjectPatch, Selection, SelectionMask, SelectionMode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Deep copy of all mutable document state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStateSnapshot {
    /// Objects from bottom to top of the z-order.
    #[serde(default)]
    pub objects: Vec<CanvasObject>,

    /// In selection order.
    #[serde(default)]
    pub selected_object_ids: Vec<ObjectId>,

    #[serde(default = "default_background")]
    pub background_color: String,

    #[serde(default)]
    pub viewport: Viewport,

    #[serde(default)]
    pub camera: Camera,
}

fn default_background() -> String {
    "#ffffff".to_string()
}

impl Default for DocumentStateSnapshot {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            selected_object_ids: Vec::new(),
            background_color: default_background(),
            viewport: Viewport::default(),
            camera: Camera::default(),
        }
    }
}

impl DocumentStateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.selected_object_ids.is_empty()
    }

    pub fn object(&self, id: &str) -> Option<&CanvasObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id.clone()).collect()
    }
}

#[derive(Debug, Default)]
struct CanvasState {
    objects: Vec<CanvasObject>,
    selection: Selection,
    background_color: String,
    viewport: Viewport,
    camera: Camera,
}

impl CanvasState {
    fn index_of(&self, id: &str) -> EaselResult<usize> {
        self.objects
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| EaselError::not_found("object", id))
    }

    fn move_to(&mut self, id: &str, target: usize) -> EaselResult<()> {
        let from = self.index_of(id)?;
        let object = self.objects.remove(from);
        let target = target.min(self.objects.len());
        self.objects.insert(target, object);
        Ok(())
    }

    fn ensure_exists(&self, ids: &[ObjectId]) -> EaselResult<()> {
        for id in ids {
            self.index_of(id)?;
        }
        Ok(())
    }
}

/// Document and selection ports backed by plain memory.
#[derive(Debug)]
pub struct InMemoryCanvas {
    state: Mutex<CanvasState>,
}

impl Default for InMemoryCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCanvas {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CanvasState {
                background_color: default_background(),
                ..Default::default()
            }),
        }
    }

    pub fn with_objects(objects: Vec<CanvasObject>) -> Self {
        let canvas = Self::new();
        canvas.state.lock().objects = objects;
        canvas
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn objects(&self) -> Vec<CanvasObject> {
        self.state.lock().objects.clone()
    }

    pub fn set_background_color(&self, color: impl Into<String>) {
        self.state.lock().background_color = color.into();
    }

    pub fn set_camera(&self, camera: Camera) {
        self.state.lock().camera = camera;
    }
}

impl DocumentPort for InMemoryCanvas {
    fn add_object(&self, object: CanvasObject) -> EaselResult<ObjectId> {
        let mut state = self.state.lock();
        if state.objects.iter().any(|o| o.id == object.id) {
            return Err(EaselError::Validation(format!(
                "object '{}' already exists",
                object.id
            )));
        }
        let id = object.id.clone();
        state.objects.push(object);
        Ok(id)
    }

    fn remove_object(&self, id: &str) -> EaselResult<CanvasObject> {
        let mut state = self.state.lock();
        let index = state.index_of(id)?;
        state.selection.object_ids.retain(|selected| selected != id);
        Ok(state.objects.remove(index))
    }

    fn update_object(&self, id: &str, patch: &ObjectPatch) -> EaselResult<()> {
        let mut state = self.state.lock();
        let index = state.index_of(id)?;
        patch.apply_to(&mut state.objects[index]);
        Ok(())
    }

    fn get_object(&self, id: &str) -> Option<CanvasObject> {
        self.state.lock().objects.iter().find(|o| o.id == id).cloned()
    }

    fn get_selected_objects(&self) -> Vec<CanvasObject> {
        let state = self.state.lock();
        state
            .selection
            .object_ids
            .iter()
            .filter_map(|id| state.objects.iter().find(|o| &o.id == id).cloned())
            .collect()
    }

    fn object_order(&self) -> Vec<ObjectId> {
        self.state.lock().objects.iter().map(|o| o.id.clone()).collect()
    }

    fn set_object_order(&self, ids: &[ObjectId]) -> EaselResult<()> {
        let mut state = self.state.lock();
        let current: BTreeSet<&str> = state.objects.iter().map(|o| o.id.as_str()).collect();
        let requested: BTreeSet<&str> = ids.iter().map(|id| id.as_str()).collect();
        if ids.len() != state.objects.len() || current != requested {
            return Err(EaselError::Validation(
                "object order must be a permutation of the current objects".to_string(),
            ));
        }
        let mut reordered = Vec::with_capacity(ids.len());
        for id in ids {
            let index = state.index_of(id)?;
            reordered.push(state.objects[index].clone());
        }
        state.objects = reordered;
        Ok(())
    }

    fn bring_forward(&self, id: &str) -> EaselResult<()> {
        let mut state = self.state.lock();
        let index = state.index_of(id)?;
        state.move_to(id, index + 1)
    }

    fn bring_to_front(&self, id: &str) -> EaselResult<()> {
        let mut state = self.state.lock();
        let last = state.objects.len();
        state.move_to(id, last)
    }

    fn send_backward(&self, id: &str) -> EaselResult<()> {
        let mut state = self.state.lock();
        let index = state.index_of(id)?;
        state.move_to(id, index.saturating_sub(1))
    }

    fn send_to_back(&self, id: &str) -> EaselResult<()> {
        self.state.lock().move_to(id, 0)
    }

    fn capture_state(&self) -> DocumentStateSnapshot {
        let state = self.state.lock();
        DocumentStateSnapshot {
            objects: state.objects.clone(),
            selected_object_ids: state.selection.object_ids.clone(),
            background_color: state.background_color.clone(),
            viewport: state.viewport,
            camera: state.camera,
        }
    }

    fn restore_state(&self, snapshot: &DocumentStateSnapshot) -> EaselResult<()> {
        let mut state = self.state.lock();
        state.objects = snapshot.objects.clone();
        state.selection.object_ids = snapshot.selected_object_ids.clone();
        state.background_color = snapshot.background_color.clone();
        state.viewport = snapshot.viewport;
        state.camera = snapshot.camera;
        Ok(())
    }
}

impl SelectionPort for InMemoryCanvas {
    fn selection(&self) -> Selection {
        self.state.lock().selection.clone()
    }

    fn apply_selection(&self, mask: &SelectionMask, mode: SelectionMode) -> EaselResult<()> {
        let mut state = self.state.lock();
        let combined = match &state.selection.mask {
            Some(existing) => existing.combine(mask, mode),
            None if mode == SelectionMode::Subtract || mode == SelectionMode::Intersect => {
                SelectionMask::empty(mask.width, mask.height)
            }
            None => mask.clone(),
        };
        state.selection.bounds = combined.bounds();
        state.selection.mask = Some(combined);
        Ok(())
    }

    fn restore_selection(&self, selection: &Selection) -> EaselResult<()> {
        let mut state = self.state.lock();
        let mut restored = selection.clone();
        restored
            .object_ids
            .retain(|id| state.objects.iter().any(|o| &o.id == id));
        state.selection = restored;
        Ok(())
    }

    fn clear(&self) {
        self.state.lock().selection = Selection::default();
    }

    fn select_object(&self, id: &str) -> EaselResult<()> {
        let mut state = self.state.lock();
        state.index_of(id)?;
        state.selection.object_ids = vec![id.to_string()];
        Ok(())
    }

    fn select_multiple(&self, ids: &[ObjectId]) -> EaselResult<()> {
        let mut state = self.state.lock();
        state.ensure_exists(ids)?;
        state.selection.object_ids = ids.to_vec();
        Ok(())
    }

    fn deselect_all(&self) {
        self.state.lock().selection.object_ids.clear();
    }
}
