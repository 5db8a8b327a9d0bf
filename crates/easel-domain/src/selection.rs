//! Selection value types exchanged with the selection port.
//!
//! These are plain data; hit testing and marching-ants geometry live in the
//! rendering adapter.

use serde::{Deserialize, Serialize};

use crate::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Replace,
    Add,
    Subtract,
    Intersect,
}

/// Per-pixel coverage mask, 0 = unselected, 255 = fully selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl SelectionMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// A mask with the axis-aligned rectangle `[x, x + w) x [y, y + h)` selected.
    pub fn rect(width: u32, height: u32, x: u32, y: u32, w: u32, h: u32) -> Self {
        let mut mask = Self::empty(width, height);
        for row in y..(y + h).min(height) {
            for col in x..(x + w).min(width) {
                mask.data[(row * width + col) as usize] = 255;
            }
        }
        mask
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// Bounding box of all non-zero pixels.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;
        for (idx, &value) in self.data.iter().enumerate() {
            if value == 0 {
                continue;
            }
            any = true;
            let col = idx as u32 % self.width;
            let row = idx as u32 / self.width;
            min_x = min_x.min(col);
            min_y = min_y.min(row);
            max_x = max_x.max(col);
            max_y = max_y.max(row);
        }
        any.then(|| Bounds {
            x: min_x as f64,
            y: min_y as f64,
            width: (max_x - min_x + 1) as f64,
            height: (max_y - min_y + 1) as f64,
        })
    }

    /// Combine `other` into this mask. Masks of different dimensions cannot
    /// be combined pixelwise, so `other` replaces this one.
    pub fn combine(&self, other: &SelectionMask, mode: SelectionMode) -> SelectionMask {
        if mode == SelectionMode::Replace
            || self.width != other.width
            || self.height != other.height
        {
            return other.clone();
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| match mode {
                SelectionMode::Add => a.max(b),
                SelectionMode::Subtract => a.saturating_sub(b),
                SelectionMode::Intersect => a.min(b),
                SelectionMode::Replace => b,
            })
            .collect();
        SelectionMask {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Everything the selection port knows, captured as a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub object_ids: Vec<ObjectId>,
    pub mask: Option<SelectionMask>,
    pub bounds: Option<Bounds>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty() && self.mask.as_ref().map_or(true, |m| m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_bounds() {
        let mask = SelectionMask::rect(10, 10, 2, 3, 4, 2);
        let bounds = mask.bounds().unwrap();
        assert_eq!(bounds.x, 2.0);
        assert_eq!(bounds.y, 3.0);
        assert_eq!(bounds.width, 4.0);
        assert_eq!(bounds.height, 2.0);
    }

    #[test]
    fn test_empty_mask_has_no_bounds() {
        assert!(SelectionMask::empty(4, 4).bounds().is_none());
    }

    #[test]
    fn test_combine_modes() {
        let a = SelectionMask::rect(4, 1, 0, 0, 2, 1);
        let b = SelectionMask::rect(4, 1, 1, 0, 2, 1);

        assert_eq!(a.combine(&b, SelectionMode::Add).data, vec![255, 255, 255, 0]);
        assert_eq!(a.combine(&b, SelectionMode::Subtract).data, vec![255, 0, 0, 0]);
        assert_eq!(a.combine(&b, SelectionMode::Intersect).data, vec![0, 255, 0, 0]);
        assert_eq!(a.combine(&b, SelectionMode::Replace), b);
    }

    #[test]
    fn test_combine_mismatched_sizes_replaces() {
        let a = SelectionMask::rect(4, 4, 0, 0, 1, 1);
        let b = SelectionMask::rect(2, 2, 0, 0, 1, 1);
        assert_eq!(a.combine(&b, SelectionMode::Add), b);
    }
}
