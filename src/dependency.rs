//! Dependency Evaluator
//!
//! Resolves a parameter's effective `required`/`visible` state from the raw
//! editor values of the other parameters. Conditions are AND-ed; a condition
//! whose source parameter has no entry in the value map (e.g. it was
//! deleted) never holds.

use crate::parameter::{Condition, Effect, Operator, Parameter};
use std::collections::HashMap;

/// Current raw editor value per parameter id.
pub type EditorValues = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveState {
    pub required: bool,
    pub visible: bool,
}

impl EffectiveState {
    /// A hidden parameter is never enforced, whatever its `required` flag.
    pub fn enforces_required(&self) -> bool {
        self.required && self.visible
    }
}

pub fn evaluate(param: &Parameter, values: &EditorValues) -> EffectiveState {
    let base = EffectiveState {
        required: param.required,
        visible: true,
    };

    let Some(dependency) = &param.dependencies else {
        return base;
    };
    if dependency.conditions.is_empty() {
        return base;
    }

    let all_match = dependency
        .conditions
        .iter()
        .all(|c| condition_holds(c, values));
    if !all_match {
        return base;
    }

    match dependency.effect {
        Effect::Required => EffectiveState {
            required: true,
            ..base
        },
        Effect::Visible => EffectiveState {
            visible: true,
            ..base
        },
        Effect::Hidden => EffectiveState {
            visible: false,
            ..base
        },
    }
}

pub fn evaluate_all(
    params: &[Parameter],
    values: &EditorValues,
) -> HashMap<String, EffectiveState> {
    params
        .iter()
        .map(|p| (p.id.clone(), evaluate(p, values)))
        .collect()
}

pub fn condition_holds(condition: &Condition, values: &EditorValues) -> bool {
    let Some(source) = values.get(&condition.param_id) else {
        return false;
    };
    let expected = condition.value.as_str();

    match condition.operator {
        Operator::Equals => source == expected,
        Operator::NotEquals => source != expected,
        Operator::Contains => source.contains(expected),
        Operator::GreaterThan => compare_numeric(source, expected, |a, b| a > b),
        Operator::LessThan => compare_numeric(source, expected, |a, b| a < b),
    }
}

fn compare_numeric(source: &str, expected: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (parse_finite(source), parse_finite(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Names (or ids, for unnamed parameters) of visible, effectively required
/// parameters whose current value is empty.
pub fn missing_required_inputs(params: &[Parameter], values: &EditorValues) -> Vec<String> {
    params
        .iter()
        .filter(|p| evaluate(p, values).enforces_required())
        .filter(|p| values.get(&p.id).map_or(true, |v| v.trim().is_empty()))
        .map(|p| {
            if p.name.is_empty() {
                p.id.clone()
            } else {
                p.name.clone()
            }
        })
        .collect()
}
