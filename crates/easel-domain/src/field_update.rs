use serde::{Deserialize, Serialize};

/// Three-state update for optional object properties such as `fill`.
///
/// - `NoChange`: property keeps its existing value
/// - `Set(value)`: property is replaced
/// - `Clear`: property is removed
///
/// # Example
///
/// ```
/// use easel_domain::FieldUpdate;
///
/// let mut fill = Some("#ff0000".to_string());
/// FieldUpdate::Set("#00ff00".to_string()).apply_to(&mut fill);
/// assert_eq!(fill.as_deref(), Some("#00ff00"));
///
/// FieldUpdate::<String>::Clear.apply_to(&mut fill);
/// assert_eq!(fill, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldUpdate<T> {
    NoChange,
    Set(T),
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::NoChange
    }
}

impl<T> FieldUpdate<T> {
    pub fn is_change(&self) -> bool {
        !matches!(self, FieldUpdate::NoChange)
    }

    pub fn is_no_change(&self) -> bool {
        !self.is_change()
    }
}

impl<T: Clone> FieldUpdate<T> {
    pub fn apply_to(&self, field: &mut Option<T>) {
        match self {
            FieldUpdate::NoChange => {}
            FieldUpdate::Set(value) => *field = Some(value.clone()),
            FieldUpdate::Clear => *field = None,
        }
    }

    /// The update that puts `current` back, if this update touches the field.
    pub fn inverse_of(&self, current: &Option<T>) -> FieldUpdate<T> {
        if !self.is_change() {
            return FieldUpdate::NoChange;
        }
        current.clone().into()
    }

    /// Fold a later update over this one; the later one wins when it changes
    /// the field.
    pub fn merge(&mut self, later: &FieldUpdate<T>) {
        if later.is_change() {
            *self = later.clone();
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_of_unchanged_field_is_no_change() {
        let update: FieldUpdate<String> = FieldUpdate::NoChange;
        assert_eq!(update.inverse_of(&Some("a".into())), FieldUpdate::NoChange);
    }

    #[test]
    fn test_inverse_restores_previous_value() {
        let update = FieldUpdate::Set("#fff".to_string());
        assert_eq!(
            update.inverse_of(&Some("#000".to_string())),
            FieldUpdate::Set("#000".to_string())
        );
        assert_eq!(update.inverse_of(&None), FieldUpdate::Clear);
    }

    #[test]
    fn test_merge_keeps_earlier_when_later_is_no_change() {
        let mut first = FieldUpdate::Set(1);
        first.merge(&FieldUpdate::NoChange);
        assert_eq!(first, FieldUpdate::Set(1));

        first.merge(&FieldUpdate::Clear);
        assert_eq!(first, FieldUpdate::Clear);
    }
}
