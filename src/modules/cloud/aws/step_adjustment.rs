//! Step adjustments for `StepScaling` policies.
//!
//! Bounds are offsets from the alarm threshold. A missing lower bound means
//! negative infinity, a missing upper bound positive infinity. Intervals are
//! lower-inclusive and upper-exclusive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One `{lower_bound, upper_bound, scaling_adjustment}` tuple.
///
/// Serializes to the AutoScaling wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAdjustment {
    #[serde(
        rename = "MetricIntervalLowerBound",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub lower_bound: Option<i64>,
    #[serde(
        rename = "MetricIntervalUpperBound",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub upper_bound: Option<i64>,
    #[serde(rename = "ScalingAdjustment")]
    pub scaling_adjustment: i64,
}

impl StepAdjustment {
    pub fn new(scaling_adjustment: i64) -> Self {
        Self {
            lower_bound: None,
            upper_bound: None,
            scaling_adjustment,
        }
    }

    pub fn lower(mut self, bound: i64) -> Self {
        self.lower_bound = Some(bound);
        self
    }

    pub fn upper(mut self, bound: i64) -> Self {
        self.upper_bound = Some(bound);
        self
    }

    /// Reads a tuple from module parameters (`snake_case` keys).
    pub fn from_param(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::validation("each step adjustment must be a mapping"))?;

        let scaling_adjustment = int_field(map, "scaling_adjustment")?.ok_or_else(|| {
            Error::validation("scaling_adjustment is required for every step adjustment")
        })?;

        Ok(Self {
            lower_bound: int_field(map, "lower_bound")?,
            upper_bound: int_field(map, "upper_bound")?,
            scaling_adjustment,
        })
    }

    /// Fills the zero end of an interval that straddles the threshold.
    fn normalized(self) -> Self {
        let mut step = self;
        match (step.lower_bound, step.upper_bound) {
            (None, Some(upper)) if upper > 0 => step.lower_bound = Some(0),
            (Some(lower), None) if lower < 0 => step.upper_bound = Some(0),
            _ => {}
        }
        step
    }

    fn start(&self) -> i128 {
        self.lower_bound.map_or(i128::MIN, i128::from)
    }

    fn end(&self) -> i128 {
        self.upper_bound.map_or(i128::MAX, i128::from)
    }
}

fn int_field(map: &serde_json::Map<String, Value>, key: &str) -> Result<Option<i64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::validation(format!("{} must be an integer", key))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::validation(format!("{} must be an integer", key))),
        Some(_) => Err(Error::validation(format!("{} must be an integer", key))),
    }
}

/// Wire form of a step read back from AutoScaling.
///
/// The API reports bounds as doubles. Whole values become integers so they
/// compare equal to requested bounds; fractional ones stay floats.
pub fn observed_wire_step(lower: Option<f64>, upper: Option<f64>, scaling_adjustment: i64) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(bound) = lower.and_then(bound_value) {
        map.insert("MetricIntervalLowerBound".to_string(), bound);
    }
    if let Some(bound) = upper.and_then(bound_value) {
        map.insert("MetricIntervalUpperBound".to_string(), bound);
    }
    map.insert("ScalingAdjustment".to_string(), Value::from(scaling_adjustment));
    Value::Object(map)
}

fn bound_value(bound: f64) -> Option<Value> {
    if bound.fract() == 0.0 && bound.abs() < i64::MAX as f64 {
        Some(Value::from(bound as i64))
    } else {
        serde_json::Number::from_f64(bound).map(Value::Number)
    }
}

/// Parses, normalizes and validates the `step_adjustments` parameter.
pub fn from_params(value: &Value) -> Result<Vec<StepAdjustment>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::validation("step_adjustments must be a list"))?;
    let steps = items
        .iter()
        .map(StepAdjustment::from_param)
        .collect::<Result<Vec<_>>>()?;
    normalize(steps)
}

/// Applies the zero-fill rule and rejects invalid step lists.
///
/// Open ends are counted before normalization: two tuples without a lower
/// bound are rejected even if one of them would be filled with zero.
pub fn normalize(steps: Vec<StepAdjustment>) -> Result<Vec<StepAdjustment>> {
    check_open_ends(&steps)?;
    let steps: Vec<StepAdjustment> = steps.into_iter().map(StepAdjustment::normalized).collect();
    check_intervals(&steps)?;
    Ok(steps)
}

/// Validates an already normalized list, e.g. one read back from a payload.
pub fn validate(steps: &[StepAdjustment]) -> Result<()> {
    check_open_ends(steps)?;
    check_intervals(steps)
}

fn check_open_ends(steps: &[StepAdjustment]) -> Result<()> {
    if steps.is_empty() {
        return Err(Error::validation("step_adjustments must not be empty"));
    }
    if steps.iter().filter(|s| s.lower_bound.is_none()).count() > 1 {
        return Err(Error::validation(
            "only one step adjustment may omit lower_bound",
        ));
    }
    if steps.iter().filter(|s| s.upper_bound.is_none()).count() > 1 {
        return Err(Error::validation(
            "only one step adjustment may omit upper_bound",
        ));
    }
    Ok(())
}

fn check_intervals(steps: &[StepAdjustment]) -> Result<()> {
    for step in steps {
        if let (Some(lower), Some(upper)) = (step.lower_bound, step.upper_bound) {
            if lower >= upper {
                return Err(Error::validation(format!(
                    "step adjustment lower_bound {} must be less than upper_bound {}",
                    lower, upper
                )));
            }
        }
    }

    let mut sorted: Vec<&StepAdjustment> = steps.iter().collect();
    sorted.sort_by_key(|s| s.start());

    for pair in sorted.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.end() > b.start() {
            return Err(Error::validation(format!(
                "step adjustment intervals overlap: {} and {}",
                describe(a),
                describe(b)
            )));
        }
    }
    Ok(())
}

fn describe(step: &StepAdjustment) -> String {
    let lower = step
        .lower_bound
        .map_or_else(|| "-inf".to_string(), |v| v.to_string());
    let upper = step
        .upper_bound
        .map_or_else(|| "+inf".to_string(), |v| v.to_string());
    format!("[{}, {})", lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_upper_only_gets_zero_lower() {
        let steps = from_params(&json!([
            {"upper_bound": 20, "scaling_adjustment": 50},
            {"lower_bound": 21, "scaling_adjustment": 100}
        ]))
        .unwrap();

        assert_eq!(
            steps,
            vec![
                StepAdjustment::new(50).lower(0).upper(20),
                StepAdjustment::new(100).lower(21),
            ]
        );
    }

    #[test]
    fn test_negative_lower_only_gets_zero_upper() {
        let steps = normalize(vec![
            StepAdjustment::new(-1).lower(-10),
            StepAdjustment::new(-2).upper(-10),
        ])
        .unwrap();
        assert_eq!(steps[0], StepAdjustment::new(-1).lower(-10).upper(0));
        assert_eq!(steps[1], StepAdjustment::new(-2).upper(-10));
    }

    #[test]
    fn test_two_missing_lower_bounds_rejected() {
        let err = from_params(&json!([
            {"upper_bound": 10, "scaling_adjustment": 1},
            {"upper_bound": 20, "scaling_adjustment": 2}
        ]))
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_two_missing_upper_bounds_rejected() {
        let err = normalize(vec![
            StepAdjustment::new(1).lower(10),
            StepAdjustment::new(2).lower(20),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("upper_bound"));
    }

    #[test]
    fn test_overlap_rejected() {
        let err = normalize(vec![
            StepAdjustment::new(1).lower(0).upper(30),
            StepAdjustment::new(2).lower(20).upper(40),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_adjacent_intervals_accepted() {
        let steps = normalize(vec![
            StepAdjustment::new(1).upper(0),
            StepAdjustment::new(2).lower(0).upper(10),
            StepAdjustment::new(3).lower(10),
        ])
        .unwrap();
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(normalize(vec![StepAdjustment::new(1).lower(10).upper(5)]).is_err());
    }

    #[test]
    fn test_missing_scaling_adjustment_rejected() {
        let err = from_params(&json!([{"lower_bound": 0}])).unwrap_err();
        assert!(err.to_string().contains("scaling_adjustment"));
    }

    #[test]
    fn test_wire_form() {
        let value = serde_json::to_value(StepAdjustment::new(50).lower(0).upper(20)).unwrap();
        assert_eq!(
            value,
            json!({
                "MetricIntervalLowerBound": 0,
                "MetricIntervalUpperBound": 20,
                "ScalingAdjustment": 50
            })
        );
        let open = serde_json::to_value(StepAdjustment::new(100).lower(21)).unwrap();
        assert!(open.get("MetricIntervalUpperBound").is_none());
    }

    #[test]
    fn test_observed_whole_bounds_match_requested() {
        let observed = observed_wire_step(Some(0.0), Some(20.0), 50);
        let requested = serde_json::to_value(StepAdjustment::new(50).lower(0).upper(20)).unwrap();
        assert_eq!(observed, requested);
    }

    #[test]
    fn test_observed_fractional_bound_is_kept() {
        let observed = observed_wire_step(Some(0.0), Some(20.5), 50);
        assert_eq!(observed["MetricIntervalUpperBound"], json!(20.5));

        let requested = serde_json::to_value(StepAdjustment::new(50).lower(0).upper(20)).unwrap();
        assert_ne!(observed, requested);
    }

    #[test]
    fn test_observed_open_bound_omitted() {
        let observed = observed_wire_step(Some(-10.0), None, -1);
        assert_eq!(
            observed,
            json!({"MetricIntervalLowerBound": -10, "ScalingAdjustment": -1})
        );
    }
}
