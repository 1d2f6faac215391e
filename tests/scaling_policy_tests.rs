//! End-to-end tests for `ec2_scaling_policy` through the module registry.

mod common;

use std::sync::Arc;

use common::{params, registry_with, Call, RecordingProvider};
use pretty_assertions::assert_eq;
use serde_json::json;

use awsible::modules::{ModuleContext, ModuleError, ModuleStatus};
use awsible::reconcile::{DesiredSpec, ObservedState};

const POLICY_ARN: &str =
    "arn:aws:autoscaling:us-east-1:123456789012:scalingPolicy:abc:autoScalingGroupName/application-asg:policyName/scaledown-policy";

fn provider() -> Arc<RecordingProvider> {
    Arc::new(RecordingProvider::new("PolicyName").with_server_field("PolicyARN", json!(POLICY_ARN)))
}

fn scaledown(cooldown: i64) -> serde_json::Value {
    json!({
        "name": "scaledown-policy",
        "asg_name": "application-asg",
        "adjustment_type": "ChangeInCapacity",
        "scaling_adjustment": -1,
        "cooldown": cooldown
    })
}

#[test]
fn test_simple_policy_lifecycle() {
    let provider = provider();
    let registry = registry_with(provider.clone());
    let context = ModuleContext::new();

    // First run creates the policy with exactly the requested fields
    let created = registry
        .execute("ec2_scaling_policy", &params(scaledown(300)), &context)
        .unwrap();
    assert!(created.changed);
    assert_eq!(created.data["arn"], json!(POLICY_ARN));
    assert_eq!(created.data["as_name"], json!("application-asg"));
    assert_eq!(created.data["name"], json!("scaledown-policy"));
    assert_eq!(created.data["scaling_adjustment"], json!(-1));

    let writes = provider.writes();
    assert_eq!(writes.len(), 1);
    let expected = DesiredSpec::new()
        .with("PolicyName", "scaledown-policy")
        .with("PolicyType", "SimpleScaling")
        .with("AutoScalingGroupName", "application-asg")
        .with("AdjustmentType", "ChangeInCapacity")
        .with("ScalingAdjustment", -1)
        .with("Cooldown", 300);
    assert_eq!(writes[0], Call::Create(expected));

    // Second run with the same parameters is a no-op
    provider.clear_calls();
    let again = registry
        .execute("ec2_scaling_policy", &params(scaledown(300)), &context)
        .unwrap();
    assert!(!again.changed);
    assert_eq!(again.status, ModuleStatus::Ok);
    assert!(provider.writes().is_empty());

    // Removing it deletes once, then reports nothing to do
    let absent = params(json!({"name": "scaledown-policy", "state": "absent"}));
    let deleted = registry.execute("ec2_scaling_policy", &absent, &context).unwrap();
    assert!(deleted.changed);
    assert!(provider.stored("scaledown-policy").is_none());

    let gone = registry.execute("ec2_scaling_policy", &absent, &context).unwrap();
    assert!(!gone.changed);
}

#[test]
fn test_cooldown_change_updates_with_diff() {
    let provider = provider();
    let registry = registry_with(provider.clone());
    let context = ModuleContext::new();

    registry
        .execute("ec2_scaling_policy", &params(scaledown(300)), &context)
        .unwrap();
    provider.clear_calls();

    let updated = registry
        .execute("ec2_scaling_policy", &params(scaledown(600)), &context)
        .unwrap();
    assert!(updated.changed);

    let diff = updated.diff.expect("update carries a diff");
    assert_eq!(diff.before, json!({"Cooldown": 300}));
    assert_eq!(diff.after, json!({"Cooldown": 600}));

    let writes = provider.writes();
    assert_eq!(writes.len(), 1);
    assert!(matches!(&writes[0], Call::Update(key, _) if key.name == "scaledown-policy"));
}

#[test]
fn test_check_mode_reports_without_writing() {
    let provider = provider();
    let registry = registry_with(provider.clone());
    let context = ModuleContext::new().with_check_mode(true);

    let output = registry
        .execute("ec2_scaling_policy", &params(scaledown(300)), &context)
        .unwrap();
    assert!(output.changed);
    assert!(output.msg.starts_with("Would create"));
    assert!(provider.writes().is_empty());
}

#[test]
fn test_existing_policy_in_other_shape_is_replaced() {
    let provider = provider();
    provider.seed(
        ObservedState::new()
            .with("PolicyName", "scaledown-policy")
            .with("PolicyType", "SimpleScaling")
            .with("AutoScalingGroupName", "application-asg")
            .with("AdjustmentType", "ExactCapacity")
            .with("ScalingAdjustment", 2)
            .with("Cooldown", 300)
            .with("PolicyARN", POLICY_ARN),
    );
    let registry = registry_with(provider.clone());

    let output = registry
        .execute("ec2_scaling_policy", &params(scaledown(300)), &ModuleContext::new())
        .unwrap();
    assert!(output.changed);

    let stored = provider.stored("scaledown-policy").unwrap();
    assert_eq!(stored.get_str("AdjustmentType"), Some("ChangeInCapacity"));
    assert_eq!(stored.get("ScalingAdjustment"), Some(&json!(-1)));
}

#[test]
fn test_step_scaling_requires_steps() {
    let registry = registry_with(provider());
    let err = registry
        .execute(
            "ec2_scaling_policy",
            &params(json!({
                "name": "step-policy",
                "asg_name": "application-asg",
                "policy_type": "StepScaling",
                "adjustment_type": "ChangeInCapacity"
            })),
            &ModuleContext::new(),
        )
        .unwrap_err();
    assert!(matches!(err, ModuleError::Validation(_)));
}

#[test]
fn test_step_scaling_creates_wire_steps() {
    let provider = provider();
    let registry = registry_with(provider.clone());

    registry
        .execute(
            "ec2_scaling_policy",
            &params(json!({
                "name": "step-scale-up-policy",
                "asg_name": "application-asg",
                "policy_type": "StepScaling",
                "adjustment_type": "PercentChangeInCapacity",
                "metric_aggregation": "Maximum",
                "step_adjustments": [
                    {"upper_bound": 20, "scaling_adjustment": 50},
                    {"lower_bound": 20, "scaling_adjustment": 100}
                ]
            })),
            &ModuleContext::new(),
        )
        .unwrap();

    let stored = provider.stored("step-scale-up-policy").unwrap();
    assert_eq!(stored.get_str("MetricAggregationType"), Some("Maximum"));
    assert_eq!(
        stored.get("StepAdjustments"),
        Some(&json!([
            {"MetricIntervalLowerBound": 0, "MetricIntervalUpperBound": 20, "ScalingAdjustment": 50},
            {"MetricIntervalLowerBound": 20, "ScalingAdjustment": 100}
        ]))
    );
}

#[test]
fn test_unknown_state_is_rejected() {
    let registry = registry_with(provider());
    let err = registry
        .execute(
            "ec2_scaling_policy",
            &params(json!({"name": "p", "state": "paused"})),
            &ModuleContext::new(),
        )
        .unwrap_err();
    assert!(matches!(err, ModuleError::InvalidParameter(_)));
}
