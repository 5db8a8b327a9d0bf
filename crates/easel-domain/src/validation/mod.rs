//! Pre-execution checks for single commands and batches.
//!
//! Validation never mutates anything. Problems that make a command unsafe
//! to run are errors; problems worth flagging but harmless are warnings.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use easel_core::EditorConfig;
use serde::Serialize;
use serde_json::{json, Value};

use crate::commands::{Command, CommandId, CommandKind};
use crate::ObjectId;

pub mod schema;

pub use schema::{CommandSchema, SchemaRegistry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ValidationIssue {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            context: None,
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub success: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.success = false;
        self.errors.push(issue);
    }

    pub fn add_error(&mut self, code: &str, message: impl Into<String>) {
        self.push_error(ValidationIssue::new(code, message));
    }

    pub fn add_field_error(&mut self, code: &str, field: &str, message: impl Into<String>) {
        self.push_error(ValidationIssue::new(code, message).on_field(field));
    }

    pub fn add_warning(&mut self, code: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(code, message));
    }

    /// Fold another result in, e.g. a child command's.
    pub fn absorb(&mut self, other: ValidationResult) {
        self.success &= other.success;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    pub fn error_codes(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.code.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchValidationResult {
    pub success: bool,
    pub per_command: HashMap<CommandId, ValidationResult>,
    pub global_errors: Vec<ValidationIssue>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl BatchValidationResult {
    pub fn has_global_error(&self, code: &str) -> bool {
        self.global_errors.iter().any(|e| e.code == code)
    }

    /// Every error code, global first.
    pub fn error_codes(&self) -> Vec<&str> {
        self.global_errors
            .iter()
            .chain(self.per_command.values().flat_map(|r| r.errors.iter()))
            .map(|e| e.code.as_str())
            .collect()
    }
}

pub struct CommandValidationService {
    schemas: SchemaRegistry,
    max_batch_size: usize,
    min_execution_id_length: usize,
    stale_after: Duration,
}

impl Default for CommandValidationService {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl CommandValidationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            schemas: SchemaRegistry::with_defaults(),
            max_batch_size: config.max_batch_size,
            min_execution_id_length: config.min_execution_id_length,
            stale_after: config.stale_timestamp_threshold(),
        }
    }

    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn register_schema(&mut self, kind: CommandKind, schema: impl CommandSchema + 'static) {
        self.schemas.register(kind, schema);
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn validate_command(&self, command: &dyn Command) -> ValidationResult {
        self.validate_at(command, Utc::now())
    }

    fn validate_at(&self, command: &dyn Command, now: DateTime<Utc>) -> ValidationResult {
        let mut result = ValidationResult::new();
        self.check_structure(command, now, &mut result);
        self.check_parameters(command, &mut result);

        for (index, child) in command.children().iter().enumerate() {
            let mut child_result = self.validate_at(child.as_ref(), now);
            for issue in child_result
                .errors
                .iter_mut()
                .chain(child_result.warnings.iter_mut())
            {
                issue.message = format!("child {}: {}", index, issue.message);
            }
            result.absorb(child_result);
        }
        result
    }

    fn check_structure(
        &self,
        command: &dyn Command,
        now: DateTime<Utc>,
        result: &mut ValidationResult,
    ) {
        if command.description().trim().is_empty() {
            result.add_error("MISSING_DESCRIPTION", "Command has no description");
        }

        let timestamp = command.timestamp();
        if timestamp > now {
            result.add_warning(
                "FUTURE_TIMESTAMP",
                format!("Timestamp {} is in the future", timestamp),
            );
        } else if (now - timestamp).to_std().is_ok_and(|age| age > self.stale_after) {
            result.add_warning(
                "STALE_TIMESTAMP",
                format!("Timestamp {} is older than {:?}", timestamp, self.stale_after),
            );
        }

        let Some(context) = command.context() else {
            result.add_error("MISSING_CONTEXT", "Command has no execution context");
            return;
        };

        let execution_id = context.execution_id.trim();
        if execution_id.is_empty() {
            result.add_error("MISSING_EXECUTION_ID", "Execution id is empty");
        } else if execution_id.len() < self.min_execution_id_length {
            result.add_warning(
                "WEAK_EXECUTION_ID",
                format!(
                    "Execution id '{}' is shorter than {} characters",
                    execution_id, self.min_execution_id_length
                ),
            );
        }

        if !context.has_document() {
            result.add_error("MISSING_CANVAS_MANAGER", "No document port in context");
        }
        if !context.has_events() {
            result.add_error("MISSING_EVENT_BUS", "No event port in context");
        }
    }

    fn check_parameters(&self, command: &dyn Command, result: &mut ValidationResult) {
        match self.schemas.get(command.kind()) {
            Some(schema) => schema.validate(&command.parameters(), result),
            None => result.add_warning(
                "MISSING_SCHEMA",
                format!("No parameter schema for {}", command.kind()),
            ),
        }
    }

    pub fn validate_batch(&self, commands: &[Box<dyn Command>]) -> BatchValidationResult {
        let now = Utc::now();
        let mut global_errors = Vec::new();

        if commands.len() > self.max_batch_size {
            global_errors.push(
                ValidationIssue::new(
                    "BATCH_SIZE_LIMIT",
                    format!(
                        "Batch of {} commands exceeds the limit of {}",
                        commands.len(),
                        self.max_batch_size
                    ),
                )
                .with_context(json!({ "size": commands.len(), "limit": self.max_batch_size })),
            );
        }

        let per_command: HashMap<CommandId, ValidationResult> = commands
            .iter()
            .map(|c| (c.id(), self.validate_at(c.as_ref(), now)))
            .collect();

        global_errors.extend(duplicate_execution_ids(commands));
        global_errors.extend(create_delete_conflicts(commands));

        let total_errors = global_errors.len()
            + per_command.values().map(|r| r.errors.len()).sum::<usize>();
        let total_warnings = per_command.values().map(|r| r.warnings.len()).sum();

        if total_errors > 0 {
            tracing::debug!(
                "Batch of {} commands failed validation with {} errors",
                commands.len(),
                total_errors
            );
        }

        BatchValidationResult {
            success: total_errors == 0,
            per_command,
            global_errors,
            total_errors,
            total_warnings,
        }
    }
}

/// One error per repeated occurrence of an execution id.
fn duplicate_execution_ids(commands: &[Box<dyn Command>]) -> Vec<ValidationIssue> {
    let mut seen: HashMap<&str, CommandId> = HashMap::new();
    let mut issues = Vec::new();
    for command in commands {
        let Some(context) = command.context() else {
            continue;
        };
        let execution_id = context.execution_id.as_str();
        if let Some(first) = seen.get(execution_id) {
            issues.push(
                ValidationIssue::new(
                    "DUPLICATE_EXECUTION_ID",
                    format!("Execution id '{}' is used more than once", execution_id),
                )
                .with_context(json!({
                    "execution_id": execution_id,
                    "command_id": command.id(),
                    "first_command_id": first,
                })),
            );
        } else {
            seen.insert(execution_id, command.id());
        }
    }
    issues
}

fn collect_leaves<'a>(command: &'a dyn Command, out: &mut Vec<&'a dyn Command>) {
    if command.children().is_empty() {
        out.push(command);
    } else {
        for child in command.children() {
            collect_leaves(child.as_ref(), out);
        }
    }
}

/// Ids that one command in the batch creates and another deletes.
fn create_delete_conflicts(commands: &[Box<dyn Command>]) -> Vec<ValidationIssue> {
    let mut leaves = Vec::new();
    for command in commands {
        collect_leaves(command.as_ref(), &mut leaves);
    }

    let mut creates: BTreeMap<ObjectId, Vec<&'static str>> = BTreeMap::new();
    let mut deletes: BTreeMap<ObjectId, Vec<&'static str>> = BTreeMap::new();
    for leaf in leaves {
        let kind = leaf.kind();
        let (bucket, ids) = if kind.is_create_like() {
            (&mut creates, leaf.created_ids())
        } else if kind.is_delete_like() {
            (&mut deletes, leaf.target_ids())
        } else {
            continue;
        };
        for id in ids {
            bucket.entry(id).or_default().push(kind.as_str());
        }
    }

    creates
        .iter()
        .filter_map(|(id, create_kinds)| {
            let delete_kinds = deletes.get(id)?;
            Some(
                ValidationIssue::new(
                    "CREATE_DELETE_CONFLICT",
                    format!("Object '{}' is both created and deleted in one batch", id),
                )
                .with_context(json!({
                    "object_id": id,
                    "create_kinds": create_kinds,
                    "delete_kinds": delete_kinds,
                })),
            )
        })
        .collect()
}
