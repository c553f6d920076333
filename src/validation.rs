//! Form Validator
//!
//! Every rule is checked independently; a report with no errors is the only
//! gate for a save. Warnings never block.

use crate::parameter::{Parameter, ParameterKind, ParameterType, ParameterValue};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub fields_to_highlight: BTreeSet<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_highlighted(&self, field: &str) -> bool {
        self.fields_to_highlight.contains(field)
    }

    fn fail(&mut self, message: String, field: String) {
        self.errors.push(message);
        self.fields_to_highlight.insert(field);
    }
}

pub fn validate(name: &str, description: &str, parameters: &[Parameter]) -> ValidationReport {
    let mut report = ValidationReport::default();

    if name.trim().is_empty() {
        report.fail("Tool name is required".into(), "name".into());
    }
    if description.trim().is_empty() {
        report.fail("Tool description is required".into(), "description".into());
    }

    let known_ids: HashSet<&str> = parameters.iter().map(|p| p.id.as_str()).collect();
    let mut seen_names = HashSet::new();

    for (index, param) in parameters.iter().enumerate() {
        let display = display_name(index, param);
        let id = &param.id;

        if param.name.trim().is_empty() {
            report.fail(format!("{} name is required", display), format!("param-name-{}", id));
        } else if !seen_names.insert(param.name.as_str()) {
            report.fail(format!("{} name must be unique", display), format!("param-name-{}", id));
        }

        if param.kind.is_none() {
            report.fail(format!("{} type is required", display), format!("param-type-{}", id));
        }

        if param.description.trim().is_empty() {
            report.fail(
                format!("{} description is required", display),
                format!("param-desc-{}", id),
            );
        }

        if let Some(kind) = &param.kind {
            check_kind(&mut report, &display, param, kind);
        }

        check_dependencies(&mut report, &display, param, &known_ids);
    }

    report
}

fn display_name(index: usize, param: &Parameter) -> String {
    if param.name.is_empty() {
        format!("Parameter {}", index + 1)
    } else {
        format!("Parameter {} ({})", index + 1, param.name)
    }
}

fn check_kind(
    report: &mut ValidationReport,
    display: &str,
    param: &Parameter,
    kind: &ParameterKind,
) {
    let id = &param.id;

    match kind {
        ParameterKind::Enum { values } => {
            if values.is_empty() {
                report.fail(
                    format!("{} must have at least one enum value", display),
                    format!("param-enum-{}", id),
                );
            }
        }
        ParameterKind::Array { item_type, .. } => {
            if item_type.is_none() {
                report.fail(
                    format!("{} must specify array item type", display),
                    format!("param-array-{}", id),
                );
            }
            check_json_default(report, display, param, ParameterType::Array);
        }
        ParameterKind::Object { properties } => {
            if properties.is_empty() {
                report.fail(
                    format!("{} must have at least one property defined", display),
                    format!("param-object-{}", id),
                );
            }
            check_json_default(report, display, param, ParameterType::Object);
        }
        ParameterKind::Number(spec) | ParameterKind::Integer(spec) => {
            let param_type = kind.parameter_type();

            if let ParameterValue::Text(_) = spec.minimum {
                report.fail(
                    format!("{} minimum value must be a valid number", display),
                    format!("param-min-{}", id),
                );
            }
            if let ParameterValue::Text(_) = spec.maximum {
                report.fail(
                    format!("{} maximum value must be a valid number", display),
                    format!("param-max-{}", id),
                );
            }

            let minimum = spec.minimum.as_number();
            let maximum = spec.maximum.as_number();
            if let (Some(min), Some(max)) = (minimum, maximum) {
                if min > max {
                    report.fail(
                        format!("{} minimum value cannot be greater than maximum", display),
                        format!("param-min-{}", id),
                    );
                }
            }

            match &param.default {
                ParameterValue::Unset => {}
                ParameterValue::Number(n) => {
                    let field = format!("param-default-{}", id);
                    if minimum.is_some_and(|min| *n < min) {
                        report.fail(
                            format!("{} default value cannot be less than minimum", display),
                            field.clone(),
                        );
                    }
                    if maximum.is_some_and(|max| *n > max) {
                        report.fail(
                            format!("{} default value cannot be greater than maximum", display),
                            field.clone(),
                        );
                    }
                    if param_type == ParameterType::Integer && n.fract() != 0.0 {
                        report.fail(format!("{} default value must be an integer", display), field);
                    }
                }
                ParameterValue::Bool(_) | ParameterValue::Text(_) => {
                    report.fail(
                        format!("{} default value must be a valid {}", display, param_type),
                        format!("param-default-{}", id),
                    );
                }
            }
        }
        ParameterKind::Boolean => {
            if let ParameterValue::Text(_) | ParameterValue::Number(_) = param.default {
                report.fail(
                    format!("{} default value must be either 'true' or 'false'", display),
                    format!("param-default-{}", id),
                );
            }
        }
        ParameterKind::String { .. } => {}
    }
}

/// Array and object defaults are emitted as parsed JSON, so they must parse
/// to the right shape.
fn check_json_default(
    report: &mut ValidationReport,
    display: &str,
    param: &Parameter,
    expected: ParameterType,
) {
    let ParameterValue::Text(raw) = &param.default else {
        return;
    };

    let ok = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(_)) => expected == ParameterType::Array,
        Ok(Value::Object(_)) => expected == ParameterType::Object,
        _ => false,
    };
    if !ok {
        report.fail(
            format!("{} default value must be a valid JSON {}", display, expected),
            format!("param-default-{}", param.id),
        );
    }
}

fn check_dependencies(
    report: &mut ValidationReport,
    display: &str,
    param: &Parameter,
    known_ids: &HashSet<&str>,
) {
    let Some(dependency) = &param.dependencies else {
        return;
    };

    for condition in &dependency.conditions {
        if condition.param_id == param.id {
            report
                .warnings
                .push(format!("{} has a condition that refers to itself", display));
        } else if !known_ids.contains(condition.param_id.as_str()) {
            report.warnings.push(format!(
                "{} has a condition on a parameter that no longer exists",
                display
            ));
        }
    }
}
