//! Coalescing of rapid, related edits into one history entry.
//!
//! Mergeability is a table lookup on `(previous kind, next kind)`. Each rule
//! carries a time window and a fold over the two commands' [`MergeIntent`]s.
//! The folded intent is handed to the previous command's `absorb`.

use std::collections::HashMap;
use std::time::Duration;

use easel_core::EditorConfig;

use crate::commands::{Command, CommandError, CommandKind};
use crate::{ObjectId, ObjectPatch};

/// The mergeable payload of a command, plus the baseline it captured.
///
/// `baseline` is the state before the command ran, as far as it is known.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeIntent {
    Properties {
        object_id: ObjectId,
        patch: ObjectPatch,
        baseline: Option<ObjectPatch>,
    },
    Text {
        object_id: ObjectId,
        text: String,
        baseline: Option<Option<String>>,
    },
}

impl MergeIntent {
    pub fn object_id(&self) -> &str {
        match self {
            Self::Properties { object_id, .. } | Self::Text { object_id, .. } => object_id,
        }
    }
}

pub type MergeFold = fn(MergeIntent, MergeIntent) -> Option<MergeIntent>;

#[derive(Debug, Clone, Copy)]
pub struct MergeRule {
    pub window: Duration,
    pub fold: MergeFold,
}

/// Later property values win; the later command's baseline rides along so
/// the absorbing command can cover fields it never touched.
pub fn fold_properties(earlier: MergeIntent, later: MergeIntent) -> Option<MergeIntent> {
    match (earlier, later) {
        (
            MergeIntent::Properties {
                object_id,
                mut patch,
                ..
            },
            MergeIntent::Properties {
                object_id: later_id,
                patch: later_patch,
                baseline,
            },
        ) if object_id == later_id => {
            patch.merge(&later_patch);
            Some(MergeIntent::Properties {
                object_id,
                patch,
                baseline,
            })
        }
        _ => None,
    }
}

/// Text edits are whole-content replacements, so the later text wins.
pub fn fold_text(earlier: MergeIntent, later: MergeIntent) -> Option<MergeIntent> {
    match (earlier, later) {
        (
            MergeIntent::Text { object_id, .. },
            MergeIntent::Text {
                object_id: later_id,
                text,
                baseline,
            },
        ) if object_id == later_id => Some(MergeIntent::Text {
            object_id,
            text,
            baseline,
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergePolicy {
    rules: HashMap<(CommandKind, CommandKind), MergeRule>,
}

impl MergePolicy {
    /// A policy that merges nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::empty()
            .with_rule(
                CommandKind::UpdateObject,
                CommandKind::UpdateObject,
                MergeRule {
                    window: config.property_merge_window(),
                    fold: fold_properties,
                },
            )
            .with_rule(
                CommandKind::EditText,
                CommandKind::EditText,
                MergeRule {
                    window: config.text_merge_window(),
                    fold: fold_text,
                },
            )
    }

    pub fn with_rule(mut self, previous: CommandKind, next: CommandKind, rule: MergeRule) -> Self {
        self.register(previous, next, rule);
        self
    }

    pub fn register(&mut self, previous: CommandKind, next: CommandKind, rule: MergeRule) {
        self.rules.insert((previous, next), rule);
    }

    pub fn rule_for(&self, previous: CommandKind, next: CommandKind) -> Option<&MergeRule> {
        self.rules.get(&(previous, next))
    }

    /// Both opted in, a rule exists, same target, inside the window.
    pub fn can_merge(&self, previous: &dyn Command, next: &dyn Command) -> bool {
        if !previous.metadata().can_merge || !next.metadata().can_merge {
            return false;
        }
        let Some(rule) = self.rule_for(previous.kind(), next.kind()) else {
            return false;
        };
        let (Some(a), Some(b)) = (previous.merge_intent(), next.merge_intent()) else {
            return false;
        };
        if a.object_id() != b.object_id() {
            return false;
        }
        let gap = (next.timestamp() - previous.timestamp())
            .num_milliseconds()
            .unsigned_abs();
        u128::from(gap) <= rule.window.as_millis()
    }

    /// Fold `next` into `previous`. `next` should be discarded afterwards.
    pub fn merge(
        &self,
        previous: &mut dyn Command,
        next: &dyn Command,
    ) -> Result<(), CommandError> {
        if !self.can_merge(previous, next) {
            return Err(CommandError::validation(
                "NOT_MERGEABLE",
                format!(
                    "'{}' cannot merge into '{}'",
                    next.description(),
                    previous.description()
                ),
            ));
        }
        let rule = self
            .rule_for(previous.kind(), next.kind())
            .ok_or_else(|| CommandError::validation("NOT_MERGEABLE", "no merge rule"))?;
        let (Some(a), Some(b)) = (previous.merge_intent(), next.merge_intent()) else {
            return Err(CommandError::validation("NOT_MERGEABLE", "no merge intent"));
        };
        let folded = (rule.fold)(a, b)
            .ok_or_else(|| CommandError::validation("NOT_MERGEABLE", "intents do not fold"))?;
        previous.absorb(folded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(id: &str, opacity: f64) -> MergeIntent {
        MergeIntent::Properties {
            object_id: id.into(),
            patch: ObjectPatch {
                opacity: Some(opacity),
                ..Default::default()
            },
            baseline: None,
        }
    }

    #[test]
    fn test_fold_properties_later_wins() {
        let folded = fold_properties(props("a", 0.5), props("a", 0.8)).unwrap();
        match folded {
            MergeIntent::Properties { patch, .. } => assert_eq!(patch.opacity, Some(0.8)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_fold_rejects_different_targets() {
        assert!(fold_properties(props("a", 0.5), props("b", 0.8)).is_none());
        let text = MergeIntent::Text {
            object_id: "a".into(),
            text: "x".into(),
            baseline: None,
        };
        assert!(fold_text(props("a", 0.5), text).is_none());
    }

    #[test]
    fn test_default_windows_come_from_config() {
        let config = EditorConfig::default();
        let policy = MergePolicy::from_config(&config);
        let rule = policy
            .rule_for(CommandKind::UpdateObject, CommandKind::UpdateObject)
            .unwrap();
        assert_eq!(rule.window, Duration::from_millis(500));
        let rule = policy
            .rule_for(CommandKind::EditText, CommandKind::EditText)
            .unwrap();
        assert_eq!(rule.window, Duration::from_millis(1000));
        assert!(policy
            .rule_for(CommandKind::UpdateObject, CommandKind::EditText)
            .is_none());
    }
}
