use crate::parameter::Parameter;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    #[default]
    Active,
    Inactive,
    Draft,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Active => "active",
            ToolStatus::Inactive => "inactive",
            ToolStatus::Draft => "draft",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    pub title: String,
    pub read_only_hint: bool,
    pub destructive_hint: bool,
    pub idempotent_hint: bool,
    pub open_world_hint: bool,
}

impl Annotations {
    pub fn for_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            read_only_hint: false,
            destructive_hint: false,
            idempotent_hint: true,
            open_world_hint: false,
        }
    }
}

/// A persisted tool as returned by the CRUD service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: ToolStatus,
    #[serde(default, deserialize_with = "parameter_list")]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_parameters: Option<Vec<Parameter>>,
}

impl Tool {
    /// Parses `lastModified`; accepts RFC 3339 timestamps and bare dates.
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_modified.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    pub fn is_active(&self) -> bool {
        self.status == ToolStatus::Active
    }
}

/// Partial update body for `PUT /api/tools/:id`. Absent fields keep their
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_parameters: Option<Vec<Parameter>>,
}

impl ToolPatch {
    pub fn apply(&self, tool: &mut Tool) {
        let patch = self.clone();
        if let Some(name) = patch.name {
            tool.name = name;
        }
        if let Some(description) = patch.description {
            tool.description = description;
        }
        if let Some(category) = patch.category {
            tool.category = category;
        }
        if let Some(status) = patch.status {
            tool.status = status;
        }
        if let Some(parameters) = patch.parameters {
            tool.parameters = parameters;
        }
        if patch.version.is_some() {
            tool.version = patch.version;
        }
        if patch.input_schema.is_some() {
            tool.input_schema = patch.input_schema;
        }
        if patch.annotations.is_some() {
            tool.annotations = patch.annotations;
        }
        if patch.returns.is_some() {
            tool.returns = patch.returns;
        }
        if patch.raw_parameters.is_some() {
            tool.raw_parameters = patch.raw_parameters;
        }
    }
}

/// Older records stored `parameters` as a schema object rather than the
/// flat list; anything that is not a list reads as empty. A malformed
/// entry in a list is an error.
fn parameter_list<'de, D>(deserializer: D) -> std::result::Result<Vec<Parameter>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).map_err(|e| {
                    D::Error::custom(format!("parameters[{}]: {}", index, e))
                })
            })
            .collect(),
        _ => Ok(Vec::new()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

pub const DEFAULT_CATEGORY_NAMES: [&str; 4] = ["General", "CLI", "API", "Data"];

/// Fallback list shown when categories cannot be loaded.
pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORY_NAMES
        .iter()
        .map(|name| Category {
            id: format!("default-{}", name.to_lowercase()),
            name: name.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStats {
    pub total_tools: usize,
    pub active_tools: usize,
    pub recently_updated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_last_modified_formats() {
        let mut tool: Tool = serde_json::from_value(json!({
            "id": "t1",
            "name": "x",
            "lastModified": "2024-05-01T10:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(
            tool.last_modified_at(),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );

        tool.last_modified = "2024-05-01".into();
        assert_eq!(
            tool.last_modified_at(),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );

        tool.last_modified = "yesterday".into();
        assert!(tool.last_modified_at().is_none());
    }

    #[test]
    fn test_legacy_parameters_object_reads_as_empty() {
        let tool: Tool = serde_json::from_value(json!({
            "id": "t1",
            "name": "legacy",
            "status": "draft",
            "parameters": {"type": "object", "properties": {}}
        }))
        .unwrap();
        assert!(tool.parameters.is_empty());
        assert_eq!(tool.status, ToolStatus::Draft);
    }

    #[test]
    fn test_parameter_entries_are_never_dropped() {
        let tool: Tool = serde_json::from_value(json!({
            "id": "t1",
            "name": "search",
            "parameters": [
                {"id": "p1", "name": "query", "type": "string"},
                {
                    "id": "p2",
                    "name": "limit",
                    "type": "integer",
                    "dependencies": {
                        "conditions": [{"paramId": "p1", "operator": "not_equals", "value": ""}],
                        "effect": "visible"
                    }
                }
            ]
        }))
        .unwrap();
        assert_eq!(tool.parameters.len(), 2);
        let conditions = &tool.parameters[1].dependencies.as_ref().unwrap().conditions;
        assert!(conditions[0].id.starts_with('c'));

        let err = serde_json::from_value::<Tool>(json!({
            "name": "search",
            "parameters": [
                {"id": "p1", "name": "query", "type": "string"},
                {
                    "id": "p2",
                    "dependencies": {
                        "conditions": [{"paramId": "p1", "operator": "matches"}],
                        "effect": "visible"
                    }
                }
            ]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("parameters[1]"));
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut tool: Tool = serde_json::from_value(json!({
            "id": "t1",
            "name": "before",
            "description": "kept",
            "category": "CLI"
        }))
        .unwrap();

        ToolPatch {
            name: Some("after".into()),
            status: Some(ToolStatus::Inactive),
            ..Default::default()
        }
        .apply(&mut tool);

        assert_eq!(tool.name, "after");
        assert_eq!(tool.description, "kept");
        assert_eq!(tool.category, "CLI");
        assert_eq!(tool.status, ToolStatus::Inactive);
        assert_eq!(
            serde_json::to_value(ToolPatch::default()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_default_categories() {
        let names: Vec<_> = default_categories().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["General", "CLI", "API", "Data"]);
    }
}
