//! CloudWatch Logs log group module.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `log_group_name` | present/absent | Log group name |
//! | `filter_prefix` | No | Prefix used to find existing groups (default: exact `log_group_name` match) |
//! | `state` | No | present, absent, list (default: present) |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::modules::{
    Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use crate::reconcile::{
    DesiredSpec, ObservedState, ProviderResult, Reconciler, ResourceKey, ResourceProvider,
};

/// Maximum number of groups returned by one describe call.
pub const DESCRIBE_LIMIT: i32 = 50;

/// One log group as reported by `DescribeLogGroups`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroup {
    pub log_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_bytes: Option<i64>,
}

impl LogGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            log_group_name: name.into(),
            ..Self::default()
        }
    }

    fn into_state(self) -> ObservedState {
        serde_json::to_value(self)
            .ok()
            .and_then(ObservedState::from_json)
            .unwrap_or_default()
    }
}

/// CloudWatch Logs calls used by the module.
pub trait LogGroupClient: Send + Sync {
    fn describe_log_groups(&self, prefix: Option<&str>, limit: i32) -> ProviderResult<Vec<LogGroup>>;
    fn create_log_group(&self, name: &str) -> ProviderResult<()>;
    fn delete_log_group(&self, name: &str) -> ProviderResult<()>;
}

/// Adapts a [`LogGroupClient`] to the reconciler.
///
/// With a scope, any group whose name starts with it counts as present.
/// Without one, only the group named exactly like the key does.
pub struct LogGroupProvider {
    client: Arc<dyn LogGroupClient>,
}

impl LogGroupProvider {
    pub fn new(client: Arc<dyn LogGroupClient>) -> Self {
        Self { client }
    }
}

impl ResourceProvider for LogGroupProvider {
    fn kind(&self) -> &'static str {
        "log_group"
    }

    fn describe(&self, key: &ResourceKey) -> ProviderResult<Option<ObservedState>> {
        let groups = match key.scope.as_deref() {
            Some(prefix) => self.client.describe_log_groups(Some(prefix), DESCRIBE_LIMIT)?,
            None => self
                .client
                .describe_log_groups(Some(&key.name), DESCRIBE_LIMIT)?
                .into_iter()
                .filter(|group| group.log_group_name == key.name)
                .collect(),
        };
        Ok(groups.into_iter().next().map(LogGroup::into_state))
    }

    fn create(&self, payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        let name = payload
            .get_str("logGroupName")
            .ok_or_else(|| ProviderError::new("InvalidParameterException", "logGroupName is required"))?;
        self.client.create_log_group(name)?;
        Ok(LogGroup::named(name).into_state())
    }

    fn update(&self, key: &ResourceKey, _payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        Err(ProviderError::new(
            "InvalidOperationException",
            format!("log group '{}': log groups have no mutable fields", key.name),
        ))
    }

    fn delete(&self, key: &ResourceKey) -> ProviderResult<()> {
        self.client.delete_log_group(&key.name)
    }
}

/// Module for `cloudwatch_log`.
pub struct CloudWatchLogModule {
    client: Arc<dyn LogGroupClient>,
}

impl CloudWatchLogModule {
    pub fn new(client: Arc<dyn LogGroupClient>) -> Self {
        Self { client }
    }

    fn key(params: &ModuleParams) -> ModuleResult<ResourceKey> {
        let name = params.get_string_required("log_group_name")?;
        let key = ResourceKey::new(name);
        Ok(match params.get_string("filter_prefix")? {
            Some(prefix) => key.with_scope(prefix),
            None => key,
        })
    }

    fn reconciler(&self, context: &ModuleContext) -> Reconciler {
        Reconciler::new(Arc::new(LogGroupProvider::new(self.client.clone())))
            .check_mode(context.check_mode)
    }

    fn list(&self, params: &ModuleParams) -> ModuleResult<ModuleOutput> {
        let prefix = params.get_string("filter_prefix")?;
        let groups = self
            .client
            .describe_log_groups(prefix.as_deref(), DESCRIBE_LIMIT)
            .map_err(|e| ModuleError::provider("Failed to describe log groups", e))?;
        let count = groups.len();
        Ok(ModuleOutput::ok(format!("Found {} log group(s)", count))
            .with_data("results", json!({ "logGroups": groups })))
    }
}

impl Module for CloudWatchLogModule {
    fn name(&self) -> &'static str {
        "cloudwatch_log"
    }

    fn description(&self) -> &'static str {
        "Create, delete or list CloudWatch Logs log groups"
    }

    fn execute(
        &self,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let state = params
            .get_string("state")?
            .unwrap_or_else(|| "present".to_string())
            .to_lowercase();

        match state.as_str() {
            "present" => {
                let key = Self::key(params)?;
                let desired = DesiredSpec::new().with("logGroupName", key.name.clone());
                let result = self.reconciler(context).reconcile(Some(&key), &desired, &[])?;

                let group = Value::Object(result.final_state.into_fields().into_iter().collect());
                let output = if result.changed {
                    ModuleOutput::changed(format!("Log group '{}' created", key.name))
                } else {
                    ModuleOutput::ok(format!("Log group '{}' exists", key.name))
                };
                Ok(output.with_data("results", json!({ "logGroups": [group] })))
            }
            "absent" => {
                let key = Self::key(params)?;
                let result = self.reconciler(context).delete(&key)?;
                Ok(if result.changed {
                    ModuleOutput::changed(format!("Log group '{}' deleted", key.name))
                } else {
                    ModuleOutput::ok(format!("Log group '{}' does not exist", key.name))
                })
            }
            "list" => self.list(params),
            other => Err(ModuleError::InvalidParameter(format!(
                "Invalid state '{}'. Valid states: present, absent, list",
                other
            ))),
        }
    }
}
