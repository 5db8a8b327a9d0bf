//! Parameter schemas, one per command kind.
//!
//! A schema inspects the JSON produced by `Command::parameters` and records
//! problems on a [`ValidationResult`]. Plain functions and closures work as
//! schemas.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::commands::CommandKind;
use crate::validation::ValidationResult;

pub trait CommandSchema: Send + Sync {
    fn validate(&self, parameters: &Value, result: &mut ValidationResult);
}

impl<F> CommandSchema for F
where
    F: Fn(&Value, &mut ValidationResult) + Send + Sync,
{
    fn validate(&self, parameters: &Value, result: &mut ValidationResult) {
        self(parameters, result)
    }
}

#[derive(Default)]
pub struct SchemaRegistry {
    schemas: HashMap<CommandKind, Box<dyn CommandSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a schema for every built-in kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CommandKind::AddObject, add_object_schema);
        registry.register(CommandKind::UpdateObject, update_object_schema);
        registry.register(CommandKind::RemoveObject, object_id_schema);
        registry.register(CommandKind::UngroupObject, object_id_schema);
        registry.register(CommandKind::ReorderObject, reorder_schema);
        registry.register(CommandKind::EditText, edit_text_schema);
        registry.register(CommandKind::GroupObjects, group_schema);
        registry.register(CommandKind::CopyObjects, object_ids_schema);
        registry.register(CommandKind::CutObjects, object_ids_schema);
        registry.register(CommandKind::PasteObjects, paste_schema);
        registry.register(CommandKind::CreateSelection, selection_mask_schema);
        registry.register(CommandKind::ClearSelection, |_: &Value, _: &mut ValidationResult| {});
        registry.register(CommandKind::SelectObjects, select_objects_schema);
        registry.register(CommandKind::Composite, composite_schema);
        registry
    }

    pub fn register(&mut self, kind: CommandKind, schema: impl CommandSchema + 'static) {
        self.schemas.insert(kind, Box::new(schema));
    }

    pub fn get(&self, kind: CommandKind) -> Option<&dyn CommandSchema> {
        self.schemas.get(&kind).map(|s| s.as_ref())
    }

    pub fn contains(&self, kind: CommandKind) -> bool {
        self.schemas.contains_key(&kind)
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.schemas.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("SchemaRegistry").field("kinds", &kinds).finish()
    }
}

fn invalid(result: &mut ValidationResult, field: &str, message: impl Into<String>) {
    result.add_field_error("INVALID_PARAMETER", field, message);
}

fn require_string(parameters: &Value, field: &str, result: &mut ValidationResult) {
    match parameters.get(field).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => {}
        _ => invalid(result, field, format!("'{}' must be a non-empty string", field)),
    }
}

fn require_id_list(parameters: &Value, field: &str, min: usize, result: &mut ValidationResult) {
    let Some(items) = parameters.get(field).and_then(Value::as_array) else {
        invalid(result, field, format!("'{}' must be a list of ids", field));
        return;
    };
    if items.len() < min {
        invalid(
            result,
            field,
            format!("'{}' needs at least {} ids, got {}", field, min, items.len()),
        );
    }
    if items
        .iter()
        .any(|item| item.as_str().map_or(true, |s| s.is_empty()))
    {
        invalid(result, field, format!("'{}' contains an empty id", field));
    }
}

fn check_geometry(object: &Value, prefix: &str, result: &mut ValidationResult) {
    for field in ["width", "height"] {
        if let Some(value) = object.get(field).and_then(Value::as_f64) {
            if value < 0.0 {
                invalid(
                    result,
                    &format!("{prefix}{field}"),
                    format!("{} must not be negative", field),
                );
            }
        }
    }
    if let Some(opacity) = object.get("opacity").and_then(Value::as_f64) {
        if !(0.0..=1.0).contains(&opacity) {
            invalid(
                result,
                &format!("{prefix}opacity"),
                format!("opacity {} is outside 0..=1", opacity),
            );
        }
    }
}

fn add_object_schema(parameters: &Value, result: &mut ValidationResult) {
    let Some(object) = parameters.get("object").filter(|o| o.is_object()) else {
        invalid(result, "object", "'object' is required");
        return;
    };
    require_string(object, "id", result);
    check_geometry(object, "object.", result);
}

fn update_object_schema(parameters: &Value, result: &mut ValidationResult) {
    require_string(parameters, "object_id", result);
    match parameters.get("patch").and_then(Value::as_object) {
        Some(patch) if !patch.is_empty() => check_geometry(&parameters["patch"], "patch.", result),
        _ => invalid(result, "patch", "'patch' must change at least one property"),
    }
}

fn object_id_schema(parameters: &Value, result: &mut ValidationResult) {
    require_string(parameters, "object_id", result);
}

fn reorder_schema(parameters: &Value, result: &mut ValidationResult) {
    require_string(parameters, "object_id", result);
    require_string(parameters, "action", result);
}

fn edit_text_schema(parameters: &Value, result: &mut ValidationResult) {
    require_string(parameters, "object_id", result);
    if !parameters.get("text").is_some_and(Value::is_string) {
        invalid(result, "text", "'text' must be a string");
    }
}

fn group_schema(parameters: &Value, result: &mut ValidationResult) {
    require_id_list(parameters, "member_ids", 2, result);
    require_string(parameters, "group_id", result);
}

fn object_ids_schema(parameters: &Value, result: &mut ValidationResult) {
    require_id_list(parameters, "object_ids", 1, result);
}

fn select_objects_schema(parameters: &Value, result: &mut ValidationResult) {
    require_id_list(parameters, "object_ids", 0, result);
}

fn paste_schema(parameters: &Value, result: &mut ValidationResult) {
    match parameters.get("position") {
        None | Some(Value::Null) => {}
        Some(Value::Array(xy)) if xy.len() == 2 && xy.iter().all(Value::is_number) => {}
        Some(_) => invalid(result, "position", "'position' must be [x, y]"),
    }
}

fn selection_mask_schema(parameters: &Value, result: &mut ValidationResult) {
    let Some(mask) = parameters.get("mask") else {
        invalid(result, "mask", "'mask' is required");
        return;
    };
    let width = mask.get("width").and_then(Value::as_u64);
    let height = mask.get("height").and_then(Value::as_u64);
    let len = mask.get("data").and_then(Value::as_array).map(Vec::len);
    match (width, height, len) {
        (Some(w), Some(h), Some(len)) if (w * h) as usize == len => {}
        (Some(_), Some(_), Some(_)) => {
            invalid(result, "mask.data", "mask data does not match its dimensions")
        }
        _ => invalid(result, "mask", "'mask' needs width, height and data"),
    }
    if parameters.get("mode").and_then(Value::as_str).is_none() {
        invalid(result, "mode", "'mode' is required");
    }
}

fn composite_schema(parameters: &Value, result: &mut ValidationResult) {
    let count = parameters
        .get("children")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if count == 0 {
        invalid(result, "children", "composite has no commands");
    }
}
