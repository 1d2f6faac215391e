//! Fuzz target for step adjustment normalization.
//!
//! Any list the normalizer accepts must validate again unchanged, and no
//! input may panic.

#![no_main]

use arbitrary::Arbitrary;
use awsible::modules::cloud::aws::step_adjustment;
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Map, Value};

/// One `step_adjustments` entry as a user might write it
#[derive(Debug, Clone, Arbitrary)]
struct FuzzStep {
    lower_bound: Option<FuzzBound>,
    upper_bound: Option<FuzzBound>,
    scaling_adjustment: Option<i64>,
}

#[derive(Debug, Clone, Arbitrary)]
enum FuzzBound {
    Int(i64),
    Text(String),
    Null,
}

impl FuzzBound {
    fn to_json(&self) -> Value {
        match self {
            FuzzBound::Int(n) => json!(n),
            FuzzBound::Text(s) => json!(s),
            FuzzBound::Null => Value::Null,
        }
    }
}

impl FuzzStep {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(lower) = &self.lower_bound {
            map.insert("lower_bound".into(), lower.to_json());
        }
        if let Some(upper) = &self.upper_bound {
            map.insert("upper_bound".into(), upper.to_json());
        }
        if let Some(adjustment) = self.scaling_adjustment {
            map.insert("scaling_adjustment".into(), json!(adjustment));
        }
        Value::Object(map)
    }
}

fuzz_target!(|steps: Vec<FuzzStep>| {
    let raw = Value::Array(steps.iter().map(FuzzStep::to_json).collect());

    if let Ok(normalized) = step_adjustment::from_params(&raw) {
        assert!(!normalized.is_empty());
        assert!(step_adjustment::validate(&normalized).is_ok());
        assert_eq!(
            step_adjustment::normalize(normalized.clone()).ok(),
            Some(normalized)
        );
    }
});
