use aws_config::SdkConfig;
use aws_sdk_autoscaling::types::{ScalingPolicy, StepAdjustment as SdkStep};
use aws_sdk_autoscaling::Client;
use serde_json::{Map, Value};

use super::{block_on, put, sdk_error};
use crate::error::ProviderError;
use crate::modules::cloud::aws::step_adjustment::{observed_wire_step, StepAdjustment};
use crate::reconcile::{DesiredSpec, ObservedState, ProviderResult, ResourceKey, ResourceProvider};

/// Scaling policies through the AutoScaling API.
pub struct SdkScalingPolicies {
    client: Client,
}

impl SdkScalingPolicies {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn put_policy(&self, payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        let steps = match payload.get("StepAdjustments") {
            Some(raw) => {
                let steps: Vec<StepAdjustment> = serde_json::from_value(raw.clone())
                    .map_err(|e| invalid(format!("StepAdjustments: {}", e)))?;
                Some(steps.iter().map(to_sdk_step).collect::<ProviderResult<Vec<_>>>()?)
            }
            None => None,
        };

        let output = self
            .client
            .put_scaling_policy()
            .set_policy_name(payload.get_str("PolicyName").map(str::to_string))
            .set_auto_scaling_group_name(payload.get_str("AutoScalingGroupName").map(str::to_string))
            .set_policy_type(payload.get_str("PolicyType").map(str::to_string))
            .set_adjustment_type(payload.get_str("AdjustmentType").map(str::to_string))
            .set_min_adjustment_magnitude(int32(payload, "MinAdjustmentMagnitude")?)
            .set_scaling_adjustment(int32(payload, "ScalingAdjustment")?)
            .set_cooldown(int32(payload, "Cooldown")?)
            .set_metric_aggregation_type(payload.get_str("MetricAggregationType").map(str::to_string))
            .set_estimated_instance_warmup(int32(payload, "EstimatedInstanceWarmup")?)
            .set_step_adjustments(steps)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut state = ObservedState::from(payload.fields().clone());
        if let Some(arn) = output.policy_arn() {
            state = state.with("PolicyARN", arn);
        }
        Ok(state)
    }
}

fn invalid(message: impl Into<String>) -> ProviderError {
    ProviderError::new("ValidationError", message)
}

fn int32(payload: &DesiredSpec, field: &str) -> ProviderResult<Option<i32>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| invalid(format!("{} must be a 32-bit integer", field))),
    }
}

fn to_sdk_step(step: &StepAdjustment) -> ProviderResult<SdkStep> {
    let adjustment = i32::try_from(step.scaling_adjustment)
        .map_err(|_| invalid("ScalingAdjustment must be a 32-bit integer"))?;
    SdkStep::builder()
        .set_metric_interval_lower_bound(step.lower_bound.map(|v| v as f64))
        .set_metric_interval_upper_bound(step.upper_bound.map(|v| v as f64))
        .scaling_adjustment(adjustment)
        .build()
        .map_err(|e| invalid(e.to_string()))
}

fn from_sdk_step(step: &SdkStep) -> Value {
    let adjustment: Option<i32> = step.scaling_adjustment().into();
    observed_wire_step(
        step.metric_interval_lower_bound(),
        step.metric_interval_upper_bound(),
        i64::from(adjustment.unwrap_or_default()),
    )
}

/// Converts a described policy into AutoScaling field names.
fn policy_state(policy: &ScalingPolicy) -> ObservedState {
    let mut doc = Map::new();
    put(&mut doc, "PolicyARN", policy.policy_arn());
    put(&mut doc, "PolicyName", policy.policy_name());
    put(&mut doc, "AutoScalingGroupName", policy.auto_scaling_group_name());
    put(&mut doc, "PolicyType", policy.policy_type());
    put(&mut doc, "AdjustmentType", policy.adjustment_type());
    put(&mut doc, "MinAdjustmentMagnitude", policy.min_adjustment_magnitude());
    put(&mut doc, "ScalingAdjustment", policy.scaling_adjustment());
    put(&mut doc, "Cooldown", policy.cooldown());
    put(&mut doc, "MetricAggregationType", policy.metric_aggregation_type());
    put(&mut doc, "EstimatedInstanceWarmup", policy.estimated_instance_warmup());
    put(&mut doc, "Enabled", policy.enabled());

    let steps = policy.step_adjustments();
    if !steps.is_empty() {
        let steps: Vec<Value> = steps
            .iter()
            .map(from_sdk_step)
            .collect();
        doc.insert("StepAdjustments".to_string(), Value::Array(steps));
    }

    let alarms: Vec<Value> = policy
        .alarms()
        .iter()
        .map(|alarm| {
            let mut a = Map::new();
            put(&mut a, "AlarmName", alarm.alarm_name());
            put(&mut a, "AlarmARN", alarm.alarm_arn());
            Value::Object(a)
        })
        .collect();
    doc.insert("Alarms".to_string(), Value::Array(alarms));

    ObservedState::from_json(Value::Object(doc)).unwrap_or_default()
}

impl ResourceProvider for SdkScalingPolicies {
    fn kind(&self) -> &'static str {
        "scaling_policy"
    }

    fn describe(&self, key: &ResourceKey) -> ProviderResult<Option<ObservedState>> {
        block_on(async {
            let output = self
                .client
                .describe_policies()
                .policy_names(&key.name)
                .set_auto_scaling_group_name(key.scope.clone())
                .send()
                .await
                .map_err(sdk_error)?;
            Ok::<_, ProviderError>(output.scaling_policies().first().map(policy_state))
        })
    }

    fn create(&self, payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        block_on(self.put_policy(payload))
    }

    fn update(&self, _key: &ResourceKey, payload: &DesiredSpec) -> ProviderResult<ObservedState> {
        // PutScalingPolicy replaces the whole policy.
        block_on(self.put_policy(payload))
    }

    fn delete(&self, key: &ResourceKey) -> ProviderResult<()> {
        let group = key
            .scope
            .clone()
            .ok_or_else(|| invalid("AutoScalingGroupName is required to delete a policy"))?;
        block_on(async {
            self.client
                .delete_policy()
                .auto_scaling_group_name(group)
                .policy_name(&key.name)
                .send()
                .await
                .map_err(sdk_error)?;
            Ok::<_, ProviderError>(())
        })
    }

    fn key_for(&self, observed: &ObservedState) -> Option<ResourceKey> {
        let name = observed.get_str("PolicyName")?;
        let group = observed.get_str("AutoScalingGroupName")?;
        Some(ResourceKey::new(name).with_scope(group))
    }
}
