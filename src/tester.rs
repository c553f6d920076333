//! Mock execution of a tool specification.
//!
//! Validates sample input against the specification's parameter schema and
//! fabricates a result shaped like its `returns` schema. Nothing is executed.

use crate::payload::returns_boilerplate;
use crate::types::{Result, ToolforgeError};
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestToolRequest {
    #[serde(default)]
    pub tool_spec: Value,
    #[serde(default)]
    pub test_input: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestToolResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

pub fn run_request(request: &TestToolRequest) -> Result<TestToolResponse> {
    if request.tool_spec.is_null() || request.test_input.is_null() {
        return Err(
            ToolforgeError::BadRequest("Both toolSpec and testInput are required".into()).into(),
        );
    }
    run_test(&request.tool_spec, &request.test_input)
}

/// Input failing the schema is a normal (unsuccessful) answer; only a
/// malformed specification is an error.
pub fn run_test(tool_spec: &Value, test_input: &Value) -> Result<TestToolResponse> {
    let function = tool_spec.get("function");
    let Some(parameters) = function
        .and_then(|f| f.get("parameters"))
        .filter(|p| p.is_object())
    else {
        return Err(ToolforgeError::InvalidSpecification(vec![
            "toolSpec.function.parameters must be an object".into(),
        ])
        .into());
    };

    let input_schema = json!({
        "type": "object",
        "properties": parameters.get("properties").cloned().unwrap_or_else(|| json!({})),
        "required": parameters.get("required").cloned().unwrap_or_else(|| json!([])),
    });

    let validator = jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(&input_schema)
        .map_err(|err| ToolforgeError::InvalidSpecification(vec![err.to_string()]))?;

    let errors: Vec<String> = validator
        .iter_errors(test_input)
        .map(|err| err.to_string())
        .collect();

    if !errors.is_empty() {
        tracing::debug!("Test input rejected: {} error(s)", errors.len());
        return Ok(TestToolResponse {
            success: false,
            message: "Input validation failed".into(),
            validation_errors: Some(errors),
            result: None,
        });
    }

    let returns = function
        .and_then(|f| f.get("returns"))
        .cloned()
        .unwrap_or_else(returns_boilerplate);

    Ok(TestToolResponse {
        success: true,
        message: "Input validation successful".into(),
        validation_errors: None,
        result: Some(mock_result(&returns)),
    })
}

pub fn mock_result(returns: &Value) -> Value {
    let mut result = Map::new();
    if let Some(properties) = returns.get("properties").and_then(|p| p.as_object()) {
        for (key, prop) in properties {
            let value = match prop.get("type").and_then(|t| t.as_str()) {
                Some("string") => Value::String(format!("Sample {}", key)),
                Some("number") => json!(123),
                Some("boolean") => Value::Bool(true),
                Some("array") => json!([]),
                Some("object") => json!({}),
                _ => Value::Null,
            };
            result.insert(key.clone(), value);
        }
    }
    Value::Object(result)
}
