//! Shared test utilities and fixtures for the Awsible test suite.
//!
//! This module provides:
//! - An in-memory [`ResourceProvider`] that records every call
//! - A fake `ansible-galaxy` command runner
//! - Vault and requirements fixtures in temporary directories
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;

use awsible::error::ProviderError;
use awsible::galaxy::{CommandOutput, CommandRunner, GalaxyResult};
use awsible::modules::{ModuleParams, ModuleRegistry};
use awsible::reconcile::{DesiredSpec, ObservedState, ProviderResult, ResourceKey, ResourceProvider};

// ============================================================================
// Recording Provider
// ============================================================================

/// One provider call, as seen by [`RecordingProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Describe(ResourceKey),
    Create(DesiredSpec),
    Update(ResourceKey, DesiredSpec),
    Delete(ResourceKey),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Describe(_))
    }
}

/// In-memory resource store keyed by the value of one natural-key field.
///
/// Writes store the payload verbatim plus any `server_fields`, so a later
/// describe reports provider-computed values the way a real API does.
pub struct RecordingProvider {
    key_field: &'static str,
    resources: Mutex<IndexMap<String, ObservedState>>,
    calls: Mutex<Vec<Call>>,
    server_fields: Vec<(String, Value)>,
    fail_delete_with: Mutex<Option<ProviderError>>,
}

impl RecordingProvider {
    pub fn new(key_field: &'static str) -> Self {
        Self {
            key_field,
            resources: Mutex::new(IndexMap::new()),
            calls: Mutex::new(Vec::new()),
            server_fields: Vec::new(),
            fail_delete_with: Mutex::new(None),
        }
    }

    /// Adds a field the "server" sets on every stored resource.
    pub fn with_server_field(mut self, name: &str, value: Value) -> Self {
        self.server_fields.push((name.to_string(), value));
        self
    }

    /// Seeds an existing resource without recording a call.
    pub fn seed(&self, state: ObservedState) {
        if let Some(name) = state.get_str(self.key_field).map(str::to_string) {
            self.resources.lock().insert(name, state);
        }
    }

    /// Makes the next delete fail with `error`.
    pub fn fail_next_delete(&self, error: ProviderError) {
        *self.fail_delete_with.lock() = Some(error);
    }

    pub fn stored(&self, name: &str) -> Option<ObservedState> {
        self.resources.lock().get(name).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn store(&self, payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        let name = payload
            .get_str(self.key_field)
            .ok_or_else(|| ProviderError::new("ValidationError", "missing key field"))?
            .to_string();

        let mut state = ObservedState::from(payload.fields().clone());
        for (field, value) in &self.server_fields {
            state = state.with(field.as_str(), value.clone());
        }
        self.resources.lock().insert(name, state.clone());
        Ok(state)
    }
}

impl ResourceProvider for RecordingProvider {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn describe(&self, key: &ResourceKey) -> ProviderResult<Option<ObservedState>> {
        self.calls.lock().push(Call::Describe(key.clone()));
        Ok(self.resources.lock().get(&key.name).cloned())
    }

    fn create(&self, payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        self.calls.lock().push(Call::Create(payload.clone()));
        self.store(payload)
    }

    fn update(&self, key: &ResourceKey, payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        self.calls.lock().push(Call::Update(key.clone(), payload.clone()));
        self.store(payload)
    }

    fn delete(&self, key: &ResourceKey) -> ProviderResult<()> {
        self.calls.lock().push(Call::Delete(key.clone()));
        if let Some(error) = self.fail_delete_with.lock().take() {
            return Err(error);
        }
        match self.resources.lock().shift_remove(&key.name) {
            Some(_) => Ok(()),
            None => Err(ProviderError::not_found("ResourceNotFound", key.to_string())),
        }
    }

    fn key_for(&self, observed: &ObservedState) -> Option<ResourceKey> {
        observed.get_str(self.key_field).map(ResourceKey::new)
    }
}

// ============================================================================
// Galaxy Runner
// ============================================================================

/// Command runner that answers from a script and records every command.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<Vec<(String, CommandOutput)>>,
    commands: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any command starting with `prefix` gets `output`. Later entries win.
    pub fn on(self, prefix: &str, output: CommandOutput) -> Self {
        self.responses.lock().push((prefix.to_string(), output));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> GalaxyResult<CommandOutput> {
        self.commands.lock().push(command.to_string());
        let output = self
            .responses
            .lock()
            .iter()
            .rev()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::success(""));
        Ok(output)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds module parameters from a JSON object literal.
pub fn params(value: Value) -> ModuleParams {
    serde_json::from_value(value).expect("module params must be a JSON object")
}

/// Registers the AWS modules against one recording provider and no-op
/// clients for everything else.
pub fn registry_with(provider: Arc<RecordingProvider>) -> ModuleRegistry {
    use awsible::modules::cloud::aws::ScalingPolicyModule;

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(ScalingPolicyModule::new(provider)));
    registry
}

/// Creates a temp dir holding `files` (relative path, content).
pub fn temp_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (relative, content) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write fixture");
    }
    dir
}

/// Writes a password file and returns its path.
pub fn password_file(dir: &Path, name: &str, password: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("{}\n", password)).expect("write password file");
    path
}
