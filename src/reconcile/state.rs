//! Desired/observed field maps, field diffs and the resource lifecycle.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Ordered field map in the provider's native naming.
pub type FieldMap = IndexMap<String, Value>;

/// Desired configuration supplied by the caller.
///
/// Holds every field that is sent on a write, comparable or write-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredSpec {
    fields: FieldMap,
}

impl DesiredSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Inserts the field only when a wire value is present.
    pub fn insert_opt(&mut self, name: impl Into<String>, value: Option<Value>) {
        if let Some(value) = value {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl From<FieldMap> for DesiredSpec {
    fn from(fields: FieldMap) -> Self {
        Self { fields }
    }
}

/// Current state as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedState {
    fields: FieldMap,
}

impl ObservedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builds a state from a JSON object. Anything else is rejected.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                fields: map.into_iter().collect(),
            }),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<FieldMap> for ObservedState {
    fn from(fields: FieldMap) -> Self {
        Self { fields }
    }
}

/// Observed values that will change (`before`) and the desired values that
/// replace them (`after`). Only differing keys are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub before: FieldMap,
    pub after: FieldMap,
}

impl FieldDiff {
    /// Compares `desired` to `observed` over `comparable` fields only.
    ///
    /// Comparable fields the desired spec does not set are not compared. A
    /// desired null matches an observed null or a missing observed key. No
    /// other coercion is applied: callers normalize defaults beforehand.
    pub fn compute(desired: &DesiredSpec, observed: &ObservedState, comparable: &[&str]) -> Self {
        let mut diff = FieldDiff::default();

        for field in comparable {
            let Some(want) = desired.get(field) else {
                continue;
            };
            let have = observed.get(field);

            let equal = match (want, have) {
                (Value::Null, None) => true,
                (want, Some(have)) => want == have,
                (_, None) => false,
            };

            if !equal {
                diff.before
                    .insert((*field).to_string(), have.cloned().unwrap_or(Value::Null));
                diff.after.insert((*field).to_string(), want.clone());
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Names of the fields that differ.
    pub fn fields(&self) -> Vec<&str> {
        self.after.keys().map(String::as_str).collect()
    }
}

/// Logical lifecycle of one resource key.
///
/// Never persisted; derived fresh from each observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Absent,
    PresentClean,
    PresentDirty,
}

/// Events that move a resource through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Create,
    Drift,
    Update,
    Delete,
}

impl ResourceState {
    /// Applies an event, rejecting transitions the reconciler never makes.
    pub fn on(self, event: LifecycleEvent) -> Result<ResourceState> {
        use LifecycleEvent::*;
        use ResourceState::*;

        match (self, event) {
            (Absent, Create) => Ok(PresentClean),
            (PresentClean, Drift) => Ok(PresentDirty),
            (PresentDirty, Update) => Ok(PresentClean),
            (PresentClean, Delete) | (PresentDirty, Delete) => Ok(Absent),
            (from, event) => Err(Error::InvalidTransition {
                from: from.to_string(),
                event: format!("{:?}", event).to_lowercase(),
            }),
        }
    }

    /// A dirty resource always has a pending update.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResourceState::PresentDirty)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Absent => write!(f, "absent"),
            ResourceState::PresentClean => write!(f, "present_clean"),
            ResourceState::PresentDirty => write!(f, "present_dirty"),
        }
    }
}
