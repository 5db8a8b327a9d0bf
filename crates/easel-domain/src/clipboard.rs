use parking_lot::Mutex;

use crate::CanvasObject;

/// Application clipboard shared by copy, cut and paste commands.
#[derive(Debug, Default)]
pub struct Clipboard {
    contents: Mutex<Vec<CanvasObject>>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<CanvasObject> {
        self.contents.lock().clone()
    }

    /// Replace the contents, returning what was there.
    pub fn replace(&self, objects: Vec<CanvasObject>) -> Vec<CanvasObject> {
        std::mem::replace(&mut *self.contents.lock(), objects)
    }

    pub fn is_empty(&self) -> bool {
        self.contents.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.contents.lock().len()
    }
}
