//! Cloud provider client contract.
//!
//! A [`ResourceProvider`] is the only thing the reconciler talks to. It speaks
//! the provider's native field names; translating module parameters into those
//! names is the caller's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::{DesiredSpec, ObservedState};
use crate::error::ProviderError;

/// Result type for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Identifier of one remote resource within a provider namespace.
///
/// `name` is the natural key (policy name, log group name, ...). `scope`
/// optionally narrows the lookup, e.g. the autoscaling group that owns a
/// scaling policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Resource name or ARN
    pub name: String,
    /// Optional enclosing namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ResourceKey {
    /// Creates an unscoped key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }

    /// Narrows the key to a scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}/{}", scope, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Client for one kind of remote resource.
///
/// All calls are synchronous from the reconciler's point of view. No call is
/// retried here; failures surface as [`ProviderError`].
pub trait ResourceProvider: Send + Sync {
    /// Short resource kind used in log messages (e.g. `scaling_policy`).
    fn kind(&self) -> &'static str;

    /// Fetches the current state, or `None` if the resource does not exist.
    fn describe(&self, key: &ResourceKey) -> ProviderResult<Option<ObservedState>>;

    /// Creates the resource from the full payload.
    fn create(&self, payload: &DesiredSpec) -> ProviderResult<ObservedState>;

    /// Replaces the resource configuration with the full payload.
    fn update(&self, key: &ResourceKey, payload: &DesiredSpec) -> ProviderResult<ObservedState>;

    /// Deletes the resource.
    fn delete(&self, key: &ResourceKey) -> ProviderResult<()>;

    /// Derives the authoritative key of an existing resource from its
    /// observed state. The default keeps the caller's key.
    fn key_for(&self, _observed: &ObservedState) -> Option<ResourceKey> {
        None
    }
}
