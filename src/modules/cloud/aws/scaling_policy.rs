//! AutoScaling scaling policy module.
//!
//! Manages one scaling policy on an autoscaling group. The policy name is the
//! natural key, scoped by the group it belongs to.
//!
//! ### Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Policy name |
//! | `state` | No | present, absent (default: present) |
//! | `asg_name` | When present | Autoscaling group name |
//! | `adjustment_type` | When present | ChangeInCapacity, ExactCapacity, PercentChangeInCapacity |
//! | `policy_type` | No | SimpleScaling, StepScaling (default: SimpleScaling) |
//! | `scaling_adjustment` | SimpleScaling | Amount by which to scale |
//! | `min_adjustment_step` | No | Minimum change for PercentChangeInCapacity |
//! | `cooldown` | No | Seconds between scaling activities (SimpleScaling) |
//! | `metric_aggregation` | No | Average, Maximum, Minimum (default: Average) |
//! | `step_adjustments` | StepScaling | List of `lower_bound`/`upper_bound`/`scaling_adjustment` |
//! | `estimated_instance_warmup` | No | Seconds until a new instance contributes metrics |
//!
//! ### Example
//!
//! ```yaml
//! - name: Step scale up policy
//!   ec2_scaling_policy:
//!     name: step-scale-up-policy
//!     asg_name: application-asg
//!     policy_type: StepScaling
//!     adjustment_type: PercentChangeInCapacity
//!     metric_aggregation: Maximum
//!     step_adjustments:
//!       - upper_bound: 20
//!         scaling_adjustment: 50
//!       - lower_bound: 21
//!         scaling_adjustment: 100
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::convert::camel_dict_to_snake;
use super::step_adjustment::{self, StepAdjustment};
use crate::error::{Error, Result};
use crate::field::{non_zero, Tristate};
use crate::modules::{
    DesiredState, Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams,
    ModuleResult, ParamExt,
};
use crate::reconcile::{DesiredSpec, Reconciler, ResourceKey, ResourceProvider, SpecValidator};

/// How `scaling_adjustment` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentType {
    ChangeInCapacity,
    ExactCapacity,
    PercentChangeInCapacity,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::ChangeInCapacity => "ChangeInCapacity",
            AdjustmentType::ExactCapacity => "ExactCapacity",
            AdjustmentType::PercentChangeInCapacity => "PercentChangeInCapacity",
        }
    }
}

impl FromStr for AdjustmentType {
    type Err = ModuleError;

    fn from_str(s: &str) -> ModuleResult<Self> {
        match s {
            "ChangeInCapacity" => Ok(AdjustmentType::ChangeInCapacity),
            "ExactCapacity" => Ok(AdjustmentType::ExactCapacity),
            "PercentChangeInCapacity" => Ok(AdjustmentType::PercentChangeInCapacity),
            _ => Err(ModuleError::InvalidParameter(format!(
                "Invalid adjustment_type '{}'. Valid values: ChangeInCapacity, ExactCapacity, PercentChangeInCapacity",
                s
            ))),
        }
    }
}

impl fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyType {
    #[default]
    SimpleScaling,
    StepScaling,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::SimpleScaling => "SimpleScaling",
            PolicyType::StepScaling => "StepScaling",
        }
    }
}

impl FromStr for PolicyType {
    type Err = ModuleError;

    fn from_str(s: &str) -> ModuleResult<Self> {
        match s {
            "SimpleScaling" => Ok(PolicyType::SimpleScaling),
            "StepScaling" => Ok(PolicyType::StepScaling),
            _ => Err(ModuleError::InvalidParameter(format!(
                "Invalid policy_type '{}'. Valid values: SimpleScaling, StepScaling",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricAggregation {
    #[default]
    Average,
    Maximum,
    Minimum,
}

impl MetricAggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricAggregation::Average => "Average",
            MetricAggregation::Maximum => "Maximum",
            MetricAggregation::Minimum => "Minimum",
        }
    }
}

impl FromStr for MetricAggregation {
    type Err = ModuleError;

    fn from_str(s: &str) -> ModuleResult<Self> {
        match s {
            "Average" => Ok(MetricAggregation::Average),
            "Maximum" => Ok(MetricAggregation::Maximum),
            "Minimum" => Ok(MetricAggregation::Minimum),
            _ => Err(ModuleError::InvalidParameter(format!(
                "Invalid metric_aggregation '{}'. Valid values: Average, Maximum, Minimum",
                s
            ))),
        }
    }
}

/// Parsed module parameters.
#[derive(Debug, Clone)]
pub struct ScalingPolicyParams {
    pub name: String,
    pub state: DesiredState,
    pub asg_name: Option<String>,
    pub adjustment_type: Option<AdjustmentType>,
    pub policy_type: PolicyType,
    pub metric_aggregation: MetricAggregation,
    pub scaling_adjustment: Option<i64>,
    pub min_adjustment_step: Option<i64>,
    pub cooldown: Option<i64>,
    pub step_adjustments: Option<Value>,
    pub estimated_instance_warmup: Option<i64>,
}

impl ScalingPolicyParams {
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let parsed = Self {
            name: params.get_string_required("name")?,
            state: DesiredState::from_params(params)?,
            asg_name: params.get_string("asg_name")?,
            adjustment_type: params
                .get_string("adjustment_type")?
                .map(|s| s.parse())
                .transpose()?,
            policy_type: params
                .get_string("policy_type")?
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
            metric_aggregation: params
                .get_string("metric_aggregation")?
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
            scaling_adjustment: params.get_i64("scaling_adjustment")?,
            min_adjustment_step: params.get_i64("min_adjustment_step")?,
            cooldown: params.get_i64("cooldown")?,
            step_adjustments: params
                .get("step_adjustments")
                .filter(|v| !v.is_null())
                .cloned(),
            estimated_instance_warmup: params.get_i64("estimated_instance_warmup")?,
        };

        if parsed.state == DesiredState::Present {
            if parsed.asg_name.is_none() {
                return Err(ModuleError::MissingParameter("asg_name".to_string()));
            }
            if parsed.adjustment_type.is_none() {
                return Err(ModuleError::MissingParameter("adjustment_type".to_string()));
            }
        }

        Ok(parsed)
    }
}

/// Write payload of `PutScalingPolicy`.
///
/// Optional fields keep the difference between "not sent" and "sent as null"
/// so the record maps onto the wire exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyPayload {
    pub policy_name: String,
    pub policy_type: PolicyType,
    pub auto_scaling_group_name: String,
    pub adjustment_type: AdjustmentType,
    pub min_adjustment_magnitude: Tristate<i64>,
    pub scaling_adjustment: Tristate<i64>,
    pub cooldown: Tristate<i64>,
    pub step_adjustments: Tristate<Vec<StepAdjustment>>,
    pub metric_aggregation_type: Tristate<MetricAggregation>,
    pub estimated_instance_warmup: Tristate<i64>,
}

impl PolicyPayload {
    /// Builds the payload for a `present` policy.
    ///
    /// Zero values of `min_adjustment_step`, `cooldown` and
    /// `estimated_instance_warmup` are treated as unset.
    pub fn from_params(params: &ScalingPolicyParams) -> Result<Self> {
        let asg_name = params
            .asg_name
            .clone()
            .ok_or_else(|| Error::validation("asg_name is required when state is present"))?;
        let adjustment_type = params
            .adjustment_type
            .ok_or_else(|| Error::validation("adjustment_type is required when state is present"))?;

        let mut payload = Self {
            policy_name: params.name.clone(),
            policy_type: params.policy_type,
            auto_scaling_group_name: asg_name,
            adjustment_type,
            min_adjustment_magnitude: Tristate::Absent,
            scaling_adjustment: Tristate::Absent,
            cooldown: Tristate::Absent,
            step_adjustments: Tristate::Absent,
            metric_aggregation_type: Tristate::Absent,
            estimated_instance_warmup: Tristate::Absent,
        };

        if adjustment_type == AdjustmentType::PercentChangeInCapacity {
            payload.min_adjustment_magnitude =
                Tristate::from(params.min_adjustment_step).filter(non_zero);
        }

        match params.policy_type {
            PolicyType::SimpleScaling => {
                let adjustment = params.scaling_adjustment.ok_or_else(|| {
                    Error::validation(
                        "scaling_adjustment is required when policy_type is SimpleScaling and state is present",
                    )
                })?;
                payload.scaling_adjustment = Tristate::Value(adjustment);
                payload.cooldown = Tristate::from(params.cooldown).filter(non_zero);
            }
            PolicyType::StepScaling => {
                let raw = params.step_adjustments.as_ref().ok_or_else(|| {
                    Error::validation(
                        "step_adjustments is required when policy_type is StepScaling and state is present",
                    )
                })?;
                payload.step_adjustments = Tristate::Value(step_adjustment::from_params(raw)?);
                payload.metric_aggregation_type = Tristate::Value(params.metric_aggregation);
                payload.estimated_instance_warmup =
                    Tristate::from(params.estimated_instance_warmup).filter(non_zero);
            }
        }

        Ok(payload)
    }

    /// Resource key: the policy name within its group.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.policy_name).with_scope(&self.auto_scaling_group_name)
    }

    /// Converts the record into provider-native field names.
    pub fn into_spec(self) -> DesiredSpec {
        let mut spec = DesiredSpec::new()
            .with("PolicyName", self.policy_name)
            .with("PolicyType", self.policy_type.as_str())
            .with("AutoScalingGroupName", self.auto_scaling_group_name)
            .with("AdjustmentType", self.adjustment_type.as_str());

        spec.insert_opt("MinAdjustmentMagnitude", self.min_adjustment_magnitude.into_json());
        spec.insert_opt("ScalingAdjustment", self.scaling_adjustment.into_json());
        spec.insert_opt("Cooldown", self.cooldown.into_json());
        spec.insert_opt(
            "StepAdjustments",
            self.step_adjustments
                .map(|steps| {
                    Value::Array(
                        steps
                            .iter()
                            .filter_map(|s| serde_json::to_value(s).ok())
                            .collect(),
                    )
                })
                .into_json(),
        );
        spec.insert_opt(
            "MetricAggregationType",
            self.metric_aggregation_type.map(|m| m.as_str()).into_json(),
        );
        spec.insert_opt(
            "EstimatedInstanceWarmup",
            self.estimated_instance_warmup.into_json(),
        );
        spec
    }
}

/// Rejects payloads that `PutScalingPolicy` would refuse.
#[derive(Debug, Default)]
pub struct PolicyValidator;

impl SpecValidator for PolicyValidator {
    fn validate(&self, desired: &DesiredSpec) -> Result<()> {
        for field in ["PolicyName", "AutoScalingGroupName", "AdjustmentType"] {
            if desired.get_str(field).is_none() {
                return Err(Error::validation(format!("{} is required", field)));
            }
        }

        match desired.get_str("PolicyType") {
            Some("SimpleScaling") => {
                if !desired.get("ScalingAdjustment").is_some_and(Value::is_i64) {
                    return Err(Error::validation(
                        "ScalingAdjustment is required for SimpleScaling policies",
                    ));
                }
                Ok(())
            }
            Some("StepScaling") => {
                let raw = desired.get("StepAdjustments").cloned().ok_or_else(|| {
                    Error::validation("StepAdjustments is required for StepScaling policies")
                })?;
                let steps: Vec<StepAdjustment> = serde_json::from_value(raw)
                    .map_err(|e| Error::validation(format!("invalid StepAdjustments: {}", e)))?;
                step_adjustment::validate(&steps)
            }
            Some(other) => Err(Error::validation(format!("unknown PolicyType '{}'", other))),
            None => Err(Error::validation("PolicyType is required")),
        }
    }
}

/// Module for `ec2_scaling_policy`.
pub struct ScalingPolicyModule {
    provider: Arc<dyn ResourceProvider>,
}

impl ScalingPolicyModule {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self { provider }
    }

    fn reconciler(&self, context: &ModuleContext) -> Reconciler {
        Reconciler::new(self.provider.clone())
            .with_natural_key("PolicyName")
            .with_validator(Arc::new(PolicyValidator))
            .check_mode(context.check_mode)
    }

    fn ensure_present(
        &self,
        params: &ScalingPolicyParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let payload = PolicyPayload::from_params(params)?;
        let key = payload.key();
        let desired = payload.into_spec();
        let comparable: Vec<&str> = desired.fields().keys().map(String::as_str).collect();

        let result = self
            .reconciler(context)
            .reconcile(Some(&key), &desired, &comparable)?;

        if result.final_state.is_empty() {
            return Ok(ModuleOutput::changed(format!(
                "Would create scaling policy '{}'",
                params.name
            ))
            .with_data("name", Value::String(params.name.clone())));
        }

        let msg = match (result.changed, context.check_mode) {
            (false, _) => format!("Scaling policy '{}' is up to date", params.name),
            (true, true) => format!("Would update scaling policy '{}'", params.name),
            (true, false) => format!("Scaling policy '{}' applied", params.name),
        };
        let mut output = if result.changed {
            ModuleOutput::changed(msg)
        } else {
            ModuleOutput::ok(msg)
        };
        output = output.with_fields(policy_fields(&Value::Object(
            result.final_state.into_fields().into_iter().collect(),
        )));

        if !result.diff.is_empty() {
            output = output.with_diff(Diff::new(
                Value::Object(result.diff.before.into_iter().collect()),
                Value::Object(result.diff.after.into_iter().collect()),
            ));
        }

        Ok(output)
    }

    fn ensure_absent(
        &self,
        params: &ScalingPolicyParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        // Looked up by name alone; the owning group comes from the observed policy.
        let key = ResourceKey::new(&params.name);
        let result = self.reconciler(context).delete(&key)?;

        if result.changed {
            Ok(ModuleOutput::changed(format!(
                "Scaling policy '{}' deleted",
                params.name
            )))
        } else {
            debug!(policy = %params.name, "Scaling policy already absent");
            Ok(ModuleOutput::ok(format!(
                "Scaling policy '{}' does not exist",
                params.name
            )))
        }
    }
}

/// Snake-cases an observed policy and adds the short aliases `arn`,
/// `as_name` and `name`.
pub fn policy_fields(policy: &Value) -> Map<String, Value> {
    let mut fields = match camel_dict_to_snake(policy) {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (alias, source) in [
        ("arn", "policy_arn"),
        ("as_name", "auto_scaling_group_name"),
        ("name", "policy_name"),
    ] {
        if let Some(value) = fields.get(source).cloned() {
            fields.insert(alias.to_string(), value);
        }
    }
    fields
}

impl Module for ScalingPolicyModule {
    fn name(&self) -> &'static str {
        "ec2_scaling_policy"
    }

    fn description(&self) -> &'static str {
        "Create or delete AWS AutoScaling scaling policies"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name"]
    }

    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        ScalingPolicyParams::from_params(params).map(|_| ())
    }

    fn execute(
        &self,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let params = ScalingPolicyParams::from_params(params)?;
        match params.state {
            DesiredState::Present => self.ensure_present(&params, context),
            DesiredState::Absent => self.ensure_absent(&params, context),
        }
    }
}
