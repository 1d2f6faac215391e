//! Declarative state reconciliation.
//!
//! The [`Reconciler`] compares a caller's desired configuration against the
//! provider's current view of one resource and issues at most one write to
//! close the gap.
//!
//! ## Flow
//!
//! ```text
//!   describe(key) ──► None ──────────────► create(desired) ─► describe ─► changed
//!        │
//!        └────────► Some(observed)
//!                        │ diff(comparable fields)
//!                        ├── empty ─────────────────────────────────────► unchanged
//!                        └── non-empty ──► update(desired) ─► describe ─► changed
//! ```
//!
//! Write payloads always carry the complete desired spec, write-only fields
//! included. Only the comparable fields decide whether a write happens.

pub mod provider;
pub mod state;

pub use provider::{ProviderResult, ResourceKey, ResourceProvider};
pub use state::{DesiredSpec, FieldDiff, FieldMap, LifecycleEvent, ObservedState, ResourceState};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Checks a desired spec before any provider call is made.
pub trait SpecValidator: Send + Sync {
    fn validate(&self, desired: &DesiredSpec) -> Result<()>;
}

/// Write action chosen by a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    Create,
    Update,
    None,
}

/// Outcome of [`Reconciler::reconcile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub action: ReconcileAction,
    /// Empty on create and on no-op
    pub diff: FieldDiff,
    /// Provider state after the call. Empty only for a create in check mode.
    pub final_state: ObservedState,
    pub state: ResourceState,
}

/// Outcome of [`Reconciler::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub changed: bool,
}

/// Reconciles one resource kind against a provider client.
pub struct Reconciler {
    provider: Arc<dyn ResourceProvider>,
    natural_key: Option<String>,
    validator: Option<Arc<dyn SpecValidator>>,
    require_existing: bool,
    check_mode: bool,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self {
            provider,
            natural_key: None,
            validator: None,
            require_existing: false,
            check_mode: false,
        }
    }

    /// Desired field used as the resource key when the caller passes none.
    pub fn with_natural_key(mut self, field: impl Into<String>) -> Self {
        self.natural_key = Some(field.into());
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn SpecValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Treat a missing resource as [`Error::NotFound`] instead of creating it.
    pub fn require_existing(mut self, require: bool) -> Self {
        self.require_existing = require;
        self
    }

    /// Compute the outcome without issuing writes.
    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Brings the resource identified by `key` to `desired`.
    ///
    /// `comparable` names the fields that participate in the diff. Every other
    /// desired field is write-only: sent on create/update, never compared.
    pub fn reconcile(
        &self,
        key: Option<&ResourceKey>,
        desired: &DesiredSpec,
        comparable: &[&str],
    ) -> Result<ReconcileResult> {
        if let Some(validator) = &self.validator {
            validator.validate(desired)?;
        }

        let key = self.resolve_key(key, desired)?;
        let kind = self.provider.kind();
        debug!(kind, key = %key, "Reconciling resource");

        let observed = self.provider.describe(&key)?;

        let Some(observed) = observed else {
            if self.require_existing {
                return Err(Error::NotFound(key.to_string()));
            }
            let state = ResourceState::Absent.on(LifecycleEvent::Create)?;

            if self.check_mode {
                info!(kind, key = %key, "Would create resource");
                return Ok(ReconcileResult {
                    changed: true,
                    action: ReconcileAction::Create,
                    diff: FieldDiff::default(),
                    final_state: ObservedState::new(),
                    state,
                });
            }

            info!(kind, key = %key, fields = desired.len(), "Creating resource");
            let created = self.provider.create(desired)?;
            let key = self.provider.key_for(&created).unwrap_or(key);
            let final_state = self.refetch(&key, created)?;

            return Ok(ReconcileResult {
                changed: true,
                action: ReconcileAction::Create,
                diff: FieldDiff::default(),
                final_state,
                state,
            });
        };

        let diff = FieldDiff::compute(desired, &observed, comparable);
        if diff.is_empty() {
            debug!(kind, key = %key, "Resource is up to date");
            return Ok(ReconcileResult {
                changed: false,
                action: ReconcileAction::None,
                diff,
                final_state: observed,
                state: ResourceState::PresentClean,
            });
        }

        let state = ResourceState::PresentClean
            .on(LifecycleEvent::Drift)?
            .on(LifecycleEvent::Update)?;
        let key = self.provider.key_for(&observed).unwrap_or(key);

        if self.check_mode {
            info!(kind, key = %key, fields = ?diff.fields(), "Would update resource");
            return Ok(ReconcileResult {
                changed: true,
                action: ReconcileAction::Update,
                diff,
                final_state: observed,
                state,
            });
        }

        info!(kind, key = %key, fields = ?diff.fields(), "Updating resource");
        let updated = self.provider.update(&key, desired)?;
        let final_state = self.refetch(&key, updated)?;

        Ok(ReconcileResult {
            changed: true,
            action: ReconcileAction::Update,
            diff,
            final_state,
            state,
        })
    }

    /// Removes the resource if it exists. Deleting something already gone is
    /// not an error.
    pub fn delete(&self, key: &ResourceKey) -> Result<DeleteResult> {
        let kind = self.provider.kind();

        let Some(observed) = self.provider.describe(key)? else {
            debug!(kind, key = %key, "Resource already absent");
            return Ok(DeleteResult { changed: false });
        };
        ResourceState::PresentClean.on(LifecycleEvent::Delete)?;

        let key = self.provider.key_for(&observed).unwrap_or_else(|| key.clone());
        if self.check_mode {
            info!(kind, key = %key, "Would delete resource");
            return Ok(DeleteResult { changed: true });
        }

        info!(kind, key = %key, "Deleting resource");
        match self.provider.delete(&key) {
            Ok(()) => Ok(DeleteResult { changed: true }),
            Err(e) if e.is_not_found() => {
                debug!(kind, key = %key, "Resource vanished before delete");
                Ok(DeleteResult { changed: false })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn resolve_key(&self, key: Option<&ResourceKey>, desired: &DesiredSpec) -> Result<ResourceKey> {
        if let Some(key) = key {
            return Ok(key.clone());
        }

        let field = self.natural_key.as_deref().ok_or_else(|| {
            Error::validation("no resource key given and no natural key configured")
        })?;
        desired
            .get_str(field)
            .map(ResourceKey::new)
            .ok_or_else(|| Error::validation(format!("desired spec is missing key field '{}'", field)))
    }

    /// Re-reads the resource after a write. The write response is only used
    /// if the provider has not caught up yet.
    fn refetch(&self, key: &ResourceKey, written: ObservedState) -> Result<ObservedState> {
        match self.provider.describe(key)? {
            Some(state) => Ok(state),
            None => {
                warn!(
                    kind = self.provider.kind(),
                    key = %key,
                    "Resource not visible after write; using write response"
                );
                Ok(written)
            }
        }
    }
}
