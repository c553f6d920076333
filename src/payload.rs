//! Persisted Tool Payload Builder
//!
//! Editor state and the record sent to the CRUD service on save. The payload
//! differs from the preview specification: `inputSchema` carries no
//! `required` list, and the flat parameter list travels alongside it so the
//! editor can be reopened in exactly the state it was saved in.

use crate::assembler::{assemble, property_schema, PropertySchema, ToolSpecification};
use crate::dependency::EditorValues;
use crate::parameter::Parameter;
use crate::tool::{Annotations, Tool, ToolPatch, ToolStatus};
use crate::validation::{validate, ValidationReport};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const PAYLOAD_VERSION: &str = "1.0";
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    /// Set when editing an existing tool.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub category: String,
    pub parameters: Vec<Parameter>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            parameters: Vec::new(),
        }
    }
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reopens a saved tool. `rawParameters` is preferred because it is the
    /// verbatim editor list; `parameters` is the fallback for older records.
    pub fn from_tool(tool: &Tool) -> Self {
        let parameters = match &tool.raw_parameters {
            Some(raw) if !raw.is_empty() => raw.clone(),
            _ => tool.parameters.clone(),
        };

        Self {
            id: (!tool.id.is_empty()).then(|| tool.id.clone()),
            name: tool.name.clone(),
            description: tool.description.clone(),
            category: if tool.category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                tool.category.clone()
            },
            parameters,
        }
    }

    pub fn add_parameter(&mut self) -> &mut Parameter {
        self.parameters.push(Parameter::new());
        let last = self.parameters.len() - 1;
        &mut self.parameters[last]
    }

    pub fn parameter_mut(&mut self, id: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.id == id)
    }

    /// Conditions that pointed at the removed parameter are left in place and
    /// surface as validation warnings.
    pub fn remove_parameter(&mut self, id: &str) -> Option<Parameter> {
        let index = self.parameters.iter().position(|p| p.id == id)?;
        Some(self.parameters.remove(index))
    }

    /// Raw editor values keyed by parameter id, seeded from the defaults.
    pub fn default_values(&self) -> EditorValues {
        self.parameters
            .iter()
            .map(|p| (p.id.clone(), p.default.to_wire()))
            .collect()
    }

    pub fn validate(&self) -> ValidationReport {
        validate(&self.name, &self.description, &self.parameters)
    }

    pub fn specification(&self) -> ToolSpecification {
        assemble(&self.name, &self.description, &self.parameters)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPayload {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    pub annotations: Annotations,
    pub version: String,
    pub category: String,
    pub parameters: Vec<Parameter>,
    pub returns: Value,
    pub raw_parameters: Vec<Parameter>,
    pub status: ToolStatus,
    pub last_modified: String,
}

/// The fixed `returns` schema attached to every saved tool.
pub fn returns_boilerplate() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": {
                "type": "boolean",
                "description": "Whether the operation was successful"
            },
            "result": {
                "type": "object",
                "description": "Result data from the tool execution"
            }
        }
    })
}

pub fn build_payload(state: &EditorState, now: DateTime<Utc>) -> ToolPayload {
    let properties = state
        .parameters
        .iter()
        .filter(|p| !p.name.is_empty())
        .map(|p| (p.name.clone(), property_schema(p)))
        .collect();

    ToolPayload {
        name: state.name.clone(),
        description: state.description.clone(),
        input_schema: InputSchema {
            schema_type: "object".to_string(),
            properties,
        },
        annotations: Annotations::for_title(state.name.clone()),
        version: PAYLOAD_VERSION.to_string(),
        category: state.category.clone(),
        parameters: state.parameters.clone(),
        returns: returns_boilerplate(),
        raw_parameters: state.parameters.clone(),
        status: ToolStatus::Active,
        last_modified: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

impl From<ToolPayload> for ToolPatch {
    fn from(payload: ToolPayload) -> Self {
        let input_schema = serde_json::to_value(&payload.input_schema).ok();
        ToolPatch {
            name: Some(payload.name),
            description: Some(payload.description),
            category: Some(payload.category),
            status: Some(payload.status),
            parameters: Some(payload.parameters),
            version: Some(payload.version),
            input_schema,
            annotations: Some(payload.annotations),
            returns: Some(payload.returns),
            raw_parameters: Some(payload.raw_parameters),
        }
    }
}
