use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FieldUpdate;

pub type ObjectId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Shape,
    Text,
    Image,
    Path,
    Group,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Shape => "shape",
            ObjectKind::Text => "text",
            ObjectKind::Image => "image",
            ObjectKind::Path => "path",
            ObjectKind::Group => "group",
        }
    }
}

/// A layer on the canvas, as seen through the document port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    #[serde(default)]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size: Option<f64>,
    /// Member ids, only populated for groups.
    #[serde(default)]
    pub children: Vec<ObjectId>,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_blend_mode() -> String {
    "normal".to_string()
}

fn default_visible() -> bool {
    true
}

impl CanvasObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name: None,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            opacity: default_opacity(),
            blend_mode: default_blend_mode(),
            visible: true,
            locked: false,
            fill: None,
            stroke: None,
            text: None,
            font_family: None,
            font_size: None,
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        let mut object = Self::new(ObjectKind::Text);
        object.text = Some(content.into());
        object.font_family = Some("Inter".to_string());
        object.font_size = Some(16.0);
        object
    }

    pub fn with_id(mut self, id: impl Into<ObjectId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == ObjectKind::Group
    }
}

/// Partial update of a `CanvasObject`.
///
/// `Option` fields are left alone when `None`; nullable properties use
/// `FieldUpdate` so they can also be cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub name: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub fill: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub stroke: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub text: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub font_family: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub font_size: FieldUpdate<f64>,
}

fn fold<T: Clone>(earlier: &mut Option<T>, later: &Option<T>) {
    if later.is_some() {
        earlier.clone_from(later);
    }
}

fn baseline<T: Clone>(update: &Option<T>, current: &T) -> Option<T> {
    update.as_ref().map(|_| current.clone())
}

impl ObjectPatch {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_change() {
            fields.push("name");
        }
        if self.x.is_some() {
            fields.push("x");
        }
        if self.y.is_some() {
            fields.push("y");
        }
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.rotation.is_some() {
            fields.push("rotation");
        }
        if self.opacity.is_some() {
            fields.push("opacity");
        }
        if self.blend_mode.is_some() {
            fields.push("blend_mode");
        }
        if self.visible.is_some() {
            fields.push("visible");
        }
        if self.locked.is_some() {
            fields.push("locked");
        }
        if self.fill.is_change() {
            fields.push("fill");
        }
        if self.stroke.is_change() {
            fields.push("stroke");
        }
        if self.text.is_change() {
            fields.push("text");
        }
        if self.font_family.is_change() {
            fields.push("font_family");
        }
        if self.font_size.is_change() {
            fields.push("font_size");
        }
        fields
    }

    pub fn apply_to(&self, object: &mut CanvasObject) {
        self.name.apply_to(&mut object.name);
        if let Some(x) = self.x {
            object.x = x;
        }
        if let Some(y) = self.y {
            object.y = y;
        }
        if let Some(width) = self.width {
            object.width = width;
        }
        if let Some(height) = self.height {
            object.height = height;
        }
        if let Some(rotation) = self.rotation {
            object.rotation = rotation;
        }
        if let Some(opacity) = self.opacity {
            object.opacity = opacity;
        }
        if let Some(blend_mode) = &self.blend_mode {
            object.blend_mode = blend_mode.clone();
        }
        if let Some(visible) = self.visible {
            object.visible = visible;
        }
        if let Some(locked) = self.locked {
            object.locked = locked;
        }
        self.fill.apply_to(&mut object.fill);
        self.stroke.apply_to(&mut object.stroke);
        self.text.apply_to(&mut object.text);
        self.font_family.apply_to(&mut object.font_family);
        self.font_size.apply_to(&mut object.font_size);
    }

    /// The patch that restores `object`'s current values for every field
    /// this patch touches.
    pub fn inverse_for(&self, object: &CanvasObject) -> ObjectPatch {
        ObjectPatch {
            name: self.name.inverse_of(&object.name),
            x: baseline(&self.x, &object.x),
            y: baseline(&self.y, &object.y),
            width: baseline(&self.width, &object.width),
            height: baseline(&self.height, &object.height),
            rotation: baseline(&self.rotation, &object.rotation),
            opacity: baseline(&self.opacity, &object.opacity),
            blend_mode: baseline(&self.blend_mode, &object.blend_mode),
            visible: baseline(&self.visible, &object.visible),
            locked: baseline(&self.locked, &object.locked),
            fill: self.fill.inverse_of(&object.fill),
            stroke: self.stroke.inverse_of(&object.stroke),
            text: self.text.inverse_of(&object.text),
            font_family: self.font_family.inverse_of(&object.font_family),
            font_size: self.font_size.inverse_of(&object.font_size),
        }
    }

    /// Fold `later` over this patch, last write wins per field.
    pub fn merge(&mut self, later: &ObjectPatch) {
        self.name.merge(&later.name);
        fold(&mut self.x, &later.x);
        fold(&mut self.y, &later.y);
        fold(&mut self.width, &later.width);
        fold(&mut self.height, &later.height);
        fold(&mut self.rotation, &later.rotation);
        fold(&mut self.opacity, &later.opacity);
        fold(&mut self.blend_mode, &later.blend_mode);
        fold(&mut self.visible, &later.visible);
        fold(&mut self.locked, &later.locked);
        self.fill.merge(&later.fill);
        self.stroke.merge(&later.stroke);
        self.text.merge(&later.text);
        self.font_family.merge(&later.font_family);
        self.font_size.merge(&later.font_size);
    }

    /// Add the baseline values of `later` for fields this baseline does not
    /// cover yet. Values already present win, since they are older.
    pub fn extend_baseline(&mut self, later: &ObjectPatch) {
        let mut combined = later.clone();
        combined.merge(self);
        *self = combined;
    }
}
