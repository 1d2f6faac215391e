//! Tri-state payload fields.
//!
//! Provider payloads distinguish a key that is not sent at all from a key that
//! is sent as an explicit null. [`Tristate`] keeps the two apart so payload
//! records can be converted to a field map without losing that information.

use serde_json::Value;

/// A payload field that is absent, explicitly null, or set.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tristate<T> {
    /// The key is not part of the payload.
    #[default]
    Absent,
    /// The key is sent with a null value.
    Null,
    /// The key is sent with a value.
    Value(T),
}

impl<T> Tristate<T> {
    /// Maps the contained value, preserving absent/null.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Tristate<U> {
        match self {
            Tristate::Absent => Tristate::Absent,
            Tristate::Null => Tristate::Null,
            Tristate::Value(v) => Tristate::Value(f(v)),
        }
    }

    /// Keeps the field only when it holds a value accepted by `keep`.
    ///
    /// Null and rejected values both collapse to [`Tristate::Absent`].
    pub fn filter<F: FnOnce(&T) -> bool>(self, keep: F) -> Tristate<T> {
        match self {
            Tristate::Value(v) if keep(&v) => Tristate::Value(v),
            _ => Tristate::Absent,
        }
    }
}

impl<T> From<Option<T>> for Tristate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Tristate::Value(v),
            None => Tristate::Absent,
        }
    }
}

impl<T: Into<Value>> Tristate<T> {
    /// Converts the field into its wire form. `None` means "omit the key".
    pub fn into_json(self) -> Option<Value> {
        match self {
            Tristate::Absent => None,
            Tristate::Null => Some(Value::Null),
            Tristate::Value(v) => Some(v.into()),
        }
    }
}

/// Integer truthiness: zero is treated as "not provided".
pub fn non_zero(value: &i64) -> bool {
    *value != 0
}
