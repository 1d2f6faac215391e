//! # Awsible - Idempotent AWS modules for Ansible-style automation
//!
//! Awsible provides a handful of AWS resource modules that report
//! changed/unchanged state the way Ansible modules do, a KMS lookup plugin,
//! and two project helpers: Galaxy role synchronization and vault re-keying.
//!
//! ## Core Concepts
//!
//! - **Reconciler**: compares a desired resource spec with what the provider
//!   reports and issues at most one create or update
//! - **Providers**: describe/create/update/delete clients keyed by resource name
//! - **Modules**: translate parameters into a desired spec and shape the result
//! - **Lookups**: value producers such as `kms`
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │            module | lookup | galaxy | vault (clap-based)             │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │ Module Registry │   │  Lookup Registry    │   │ Galaxy / Vault      │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!          │                         │
//!          ▼                         │
//! ┌─────────────────┐                │
//! │   Reconciler    │                │
//! └─────────────────┘                │
//!          │                         │
//!          ▼                         ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Provider traits (AWS SDK behind `aws`)                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use awsible::prelude::*;
//! use awsible::modules::cloud::aws::{register_modules, sdk::load_clients};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let clients = load_clients(&Default::default()).await;
//!     let mut registry = ModuleRegistry::new();
//!     register_modules(&mut registry, &clients);
//!
//!     let params: ModuleParams = serde_json::from_value(serde_json::json!({
//!         "name": "scale-up",
//!         "asg_name": "web",
//!         "adjustment_type": "ChangeInCapacity",
//!         "scaling_adjustment": 1,
//!     }))?;
//!     let output = tokio::task::spawn_blocking(move || {
//!         registry.execute("ec2_scaling_policy", &params, &ModuleContext::new())
//!     })
//!     .await??;
//!     println!("changed: {}", output.changed);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Error handling
    pub use crate::error::{Error, ProviderError, Result};

    // Field presence
    pub use crate::field::Tristate;

    // Reconciliation
    pub use crate::reconcile::{
        DesiredSpec, ObservedState, ReconcileAction, ReconcileResult, Reconciler, ResourceKey,
        ResourceProvider,
    };

    // Module system
    pub use crate::modules::{
        Module, ModuleContext, ModuleOutput, ModuleParams, ModuleRegistry, ModuleResult,
    };

    // Lookups
    pub use crate::lookup::{Lookup, LookupContext, LookupRegistry};
}

// ============================================================================
// Core
// ============================================================================

/// Error types and the crate-wide `Result` alias.
pub mod error;

/// Tri-state payload fields: absent, explicit null, or a value.
pub mod field;

/// Declarative-state reconciliation.
///
/// Given a desired spec and an optional key, fetches the current state,
/// diffs the comparable fields, and creates or updates only when something
/// differs. Deletion is idempotent.
pub mod reconcile;

// ============================================================================
// Modules and Lookups
// ============================================================================

/// Module trait, registry, and the AWS modules.
///
/// - `ec2_scaling_policy`
/// - `cloudwatch_log`
/// - `aws_elasticsearch_facts`
/// - `rds_instance_facts`
pub mod modules;

/// Lookup plugins (`kms`).
pub mod lookup;

// ============================================================================
// Project Helpers
// ============================================================================

/// Galaxy role synchronization against `requirements.yml`.
pub mod galaxy;

/// AES-256-GCM vault and re-keying of vaulted YAML values.
pub mod vault;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration management.
///
/// Handles loading and merging configuration from multiple sources:
/// environment variables, config files, and command-line arguments.
pub mod config;

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of Awsible.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
