//! Schema Assembler
//!
//! Pure transformation from an ordered parameter list to the
//! function-calling tool specification. Properties are keyed in sorted
//! order so identical input always renders byte-identical JSON.

use crate::parameter::{
    Effect, Operator, Parameter, ParameterKind, ParameterType, ParameterValue,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpecification {
    #[serde(rename = "type")]
    pub spec_type: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
    #[serde(
        rename = "dependencyMap",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dependency_map: Option<BTreeMap<String, DependencyEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub conditions: Vec<DependencyCondition>,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyCondition {
    #[serde(rename = "sourceParam")]
    pub source_param: String,
    pub operator: Operator,
    pub value: String,
}

/// Builds the tool specification. Unnamed parameters are skipped; on a name
/// collision the later parameter wins. `required` reflects each
/// parameter's base flag, not its dependency-evaluated state.
pub fn assemble(name: &str, description: &str, parameters: &[Parameter]) -> ToolSpecification {
    let mut properties = BTreeMap::new();
    for param in parameters.iter().filter(|p| !p.name.is_empty()) {
        properties.insert(param.name.clone(), property_schema(param));
    }

    let required = parameters
        .iter()
        .filter(|p| p.required && !p.name.is_empty())
        .map(|p| p.name.clone())
        .collect();

    ToolSpecification {
        spec_type: "function".to_string(),
        function: FunctionSpec {
            name: name.to_string(),
            description: description.to_string(),
            parameters: ParametersSchema {
                schema_type: "object".to_string(),
                properties,
                required,
                dependency_map: dependency_map(parameters),
            },
        },
    }
}

pub fn to_pretty_json(spec: &ToolSpecification) -> crate::types::Result<String> {
    Ok(serde_json::to_string_pretty(spec)?)
}

/// JSON Schema fragment for one parameter.
pub fn property_schema(param: &Parameter) -> PropertySchema {
    let param_type = param.parameter_type().unwrap_or(ParameterType::String);
    let schema_type = match param_type {
        ParameterType::Enum => ParameterType::String,
        other => other,
    };

    let mut schema = PropertySchema {
        schema_type: schema_type.as_str().to_string(),
        description: param.description.clone(),
        format: None,
        enum_values: None,
        minimum: None,
        maximum: None,
        default: default_value(param_type, &param.default),
        items: None,
        properties: None,
    };

    match &param.kind {
        Some(ParameterKind::String { format }) => {
            schema.format = format.map(|f| f.as_str().to_string());
        }
        Some(ParameterKind::Number(spec)) | Some(ParameterKind::Integer(spec)) => {
            schema.format = spec.format.map(|f| f.as_str().to_string());
            schema.minimum = spec.minimum.as_number().map(json_number);
            schema.maximum = spec.maximum.as_number().map(json_number);
        }
        Some(ParameterKind::Enum { values }) if !values.is_empty() => {
            schema.enum_values = Some(values.clone());
        }
        Some(ParameterKind::Array {
            item_type,
            item_description,
            item_properties,
        }) => {
            let item_type = item_type.unwrap_or(ParameterType::String);
            schema.items = Some(ItemsSchema {
                schema_type: item_type.as_str().to_string(),
                description: item_description.clone(),
                properties: (item_type == ParameterType::Object)
                    .then(|| item_properties.clone()),
            });
        }
        Some(ParameterKind::Object { properties }) => {
            schema.properties = Some(properties.clone());
        }
        Some(ParameterKind::Enum { .. }) | Some(ParameterKind::Boolean) | None => {}
    }

    schema
}

/// Type-directed coercion of the stored default. Array and object defaults
/// are JSON-parsed, falling back to an empty container.
fn default_value(param_type: ParameterType, value: &ParameterValue) -> Option<Value> {
    match (param_type, value) {
        (_, ParameterValue::Unset) => None,
        (ParameterType::Number, ParameterValue::Number(n)) => Some(json_number(*n)),
        (ParameterType::Integer, ParameterValue::Number(n)) => Some(Value::from(n.trunc() as i64)),
        (ParameterType::Number | ParameterType::Integer, _) => None,
        (ParameterType::Boolean, ParameterValue::Bool(b)) => Some(Value::Bool(*b)),
        (ParameterType::Boolean, _) => Some(Value::Bool(false)),
        (ParameterType::Array, ParameterValue::Text(s)) => Some(
            serde_json::from_str::<Value>(s)
                .ok()
                .filter(|v| v.is_array())
                .unwrap_or_else(|| Value::Array(Vec::new())),
        ),
        (ParameterType::Object, ParameterValue::Text(s)) => Some(
            serde_json::from_str::<Value>(s)
                .ok()
                .filter(|v| v.is_object())
                .unwrap_or_else(|| Value::Object(Map::new())),
        ),
        (_, other) => Some(Value::String(other.to_wire())),
    }
}

/// Integral values render as JSON integers, matching what a JavaScript
/// client would emit for the same number.
pub fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn dependency_map(parameters: &[Parameter]) -> Option<BTreeMap<String, DependencyEntry>> {
    let mut map = BTreeMap::new();

    for param in parameters.iter().filter(|p| !p.name.is_empty()) {
        let Some(dependency) = &param.dependencies else {
            continue;
        };

        let conditions = dependency
            .conditions
            .iter()
            .filter_map(|c| {
                let source = parameters.iter().find(|p| p.id == c.param_id)?;
                if source.name.is_empty() {
                    return None;
                }
                Some(DependencyCondition {
                    source_param: source.name.clone(),
                    operator: c.operator,
                    value: c.value.clone(),
                })
            })
            .collect();

        map.insert(
            param.name.clone(),
            DependencyEntry {
                conditions,
                effect: dependency.effect,
            },
        );
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}
