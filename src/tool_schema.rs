//! Tool Specification Import
//!
//! Inverse of the assembler: reads a function-calling tool specification
//! back into editable parameters so an exported or hand-written spec can be
//! opened in the editor.

use crate::assembler::DependencyEntry;
use crate::parameter::{Condition, Parameter};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTool {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

impl ImportedTool {
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Returns `None` unless `spec.function.name` is a string.
pub fn import_specification(spec: &Value) -> Option<ImportedTool> {
    let function = spec.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let description = function
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let schema = function.get("parameters");
    let required: Vec<&str> = schema
        .and_then(|s| s.get("required"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let empty = Map::new();
    let properties = schema
        .and_then(|s| s.get("properties"))
        .and_then(|v| v.as_object())
        .unwrap_or(&empty);

    let mut parameters: Vec<Parameter> = properties
        .iter()
        .enumerate()
        .map(|(index, (prop_name, fragment))| {
            import_property(
                format!("p{}", index + 1),
                prop_name,
                fragment,
                required.contains(&prop_name.as_str()),
            )
        })
        .collect();

    if let Some(dependency_map) = schema
        .and_then(|s| s.get("dependencyMap"))
        .cloned()
        .and_then(|v| serde_json::from_value::<BTreeMap<String, DependencyEntry>>(v).ok())
    {
        relink_dependencies(&mut parameters, dependency_map);
    }

    Some(ImportedTool {
        name,
        description,
        parameters,
    })
}

/// Rebuilds the flat editor record for one property and lets the
/// parameter's own wire decoding type its values.
fn import_property(id: String, name: &str, fragment: &Value, required: bool) -> Parameter {
    let field = |key: &str| fragment.get(key).cloned().unwrap_or(Value::Null);

    let enum_values = field("enum");
    let mut param_type = fragment
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("string")
        .to_string();
    if param_type == "string" && enum_values.is_array() {
        param_type = "enum".to_string();
    }

    let items = field("items");
    let item_field = |key: &str| items.get(key).cloned().unwrap_or(Value::Null);
    let object_properties = match param_type.as_str() {
        "array" => item_field("properties"),
        _ => field("properties"),
    };

    let wire = json!({
        "id": id,
        "name": name,
        "type": param_type,
        "description": field("description"),
        "required": required,
        "format": field("format"),
        "enumValues": enum_values,
        "minimum": field("minimum"),
        "maximum": field("maximum"),
        "default": field("default"),
        "arrayItemType": item_field("type"),
        "arrayItemDescription": item_field("description"),
        "objectProperties": object_properties,
    });

    serde_json::from_value(wire).unwrap_or_else(|_| {
        let mut fallback = Parameter::new();
        fallback.id = format!("p-{}", name);
        fallback.name = name.to_string();
        fallback
    })
}

fn relink_dependencies(
    parameters: &mut [Parameter],
    dependency_map: BTreeMap<String, DependencyEntry>,
) {
    let ids_by_name: BTreeMap<String, String> = parameters
        .iter()
        .map(|p| (p.name.clone(), p.id.clone()))
        .collect();

    for param in parameters.iter_mut() {
        let Some(entry) = dependency_map.get(&param.name) else {
            continue;
        };

        let conditions = entry
            .conditions
            .iter()
            .enumerate()
            .filter_map(|(index, c)| {
                let param_id = ids_by_name.get(&c.source_param)?;
                Some(Condition {
                    id: format!("c{}-{}", param.id, index + 1),
                    param_id: param_id.clone(),
                    operator: c.operator,
                    value: c.value.clone(),
                })
            })
            .collect();

        param.set_dependency_conditions(conditions, entry.effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::parameter::{
        Effect, NumericSpec, Operator, ParameterKind, ParameterType, ParameterValue,
    };

    #[test]
    fn test_import_basic_specification() {
        let spec = json!({
            "type": "function",
            "function": {
                "name": "get_weather",
                "description": "Fetch current weather",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "city": {"type": "string", "description": "City name"},
                        "units": {
                            "type": "string",
                            "description": "Units",
                            "enum": ["metric", "imperial"]
                        },
                        "days": {
                            "type": "integer",
                            "description": "Days",
                            "minimum": 1,
                            "maximum": 7,
                            "default": 3
                        }
                    },
                    "required": ["city"]
                }
            }
        });

        let imported = import_specification(&spec).unwrap();
        assert_eq!(imported.name, "get_weather");
        assert_eq!(imported.required_params(), vec!["city"]);

        let days = imported.parameters.iter().find(|p| p.name == "days").unwrap();
        assert_eq!(days.default, ParameterValue::Number(3.0));
        assert_eq!(
            days.kind,
            Some(ParameterKind::Integer(NumericSpec {
                format: None,
                minimum: ParameterValue::Number(1.0),
                maximum: ParameterValue::Number(7.0),
            }))
        );

        let units = imported.parameters.iter().find(|p| p.name == "units").unwrap();
        assert_eq!(units.parameter_type(), Some(ParameterType::Enum));
    }

    #[test]
    fn test_missing_function_name_is_rejected() {
        assert!(import_specification(&json!({"function": {"description": "x"}})).is_none());
        assert!(import_specification(&json!({"name": "x"})).is_none());
    }

    #[test]
    fn test_import_reassembles_to_same_specification() {
        let mut mode = Parameter::with_kind(
            "a",
            "mode",
            "Mode",
            ParameterKind::empty(ParameterType::String),
        );
        mode.required = true;
        let mut tags = Parameter::with_kind(
            "b",
            "tags",
            "Tags",
            ParameterKind::Array {
                item_type: Some(ParameterType::String),
                item_description: "A tag".into(),
                item_properties: Map::new(),
            },
        );
        tags.set_dependency_conditions(
            vec![Condition {
                id: "c1".into(),
                param_id: "a".into(),
                operator: Operator::NotEquals,
                value: "plain".into(),
            }],
            Effect::Visible,
        );

        let original = assemble("tagger", "Tags things", &[mode, tags]);
        let value = serde_json::to_value(&original).unwrap();
        let imported = import_specification(&value).unwrap();
        let reassembled = assemble(&imported.name, &imported.description, &imported.parameters);

        assert_eq!(original, reassembled);
    }
}
