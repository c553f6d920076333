//! Parameter Model
//!
//! The editable representation of one tool argument. In memory a parameter
//! carries a [`ParameterKind`] holding only the fields relevant to its type;
//! on the wire it is the flat camelCase record the CRUD service stores, so
//! re-opening a saved tool reconstructs the same editor state.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Enum,
}

impl ParameterType {
    pub const ALL: [ParameterType; 7] = [
        ParameterType::String,
        ParameterType::Number,
        ParameterType::Integer,
        ParameterType::Boolean,
        ParameterType::Object,
        ParameterType::Array,
        ParameterType::Enum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::Object => "object",
            ParameterType::Array => "array",
            ParameterType::Enum => "enum",
        }
    }

    /// Empty or unrecognised type names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterType::Number | ParameterType::Integer)
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Email,
    Uri,
    DateTime,
    Date,
    Time,
    Password,
}

impl StringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Uri => "uri",
            StringFormat::DateTime => "date-time",
            StringFormat::Date => "date",
            StringFormat::Time => "time",
            StringFormat::Password => "password",
        }
    }

    /// `""` and `"none"` both mean no format.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "email" => Some(StringFormat::Email),
            "uri" => Some(StringFormat::Uri),
            "date-time" => Some(StringFormat::DateTime),
            "date" => Some(StringFormat::Date),
            "time" => Some(StringFormat::Time),
            "password" => Some(StringFormat::Password),
            _ => None,
        }
    }
}

/// A `minimum`, `maximum` or `default` value, typed by the parameter's
/// declared type when it is parsed. Text that fails to parse for a numeric
/// or boolean type stays as `Text` so validation can report it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterValue {
    #[default]
    Unset,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl ParameterValue {
    pub fn parse_for(param_type: Option<ParameterType>, raw: &str) -> Self {
        match param_type {
            Some(ParameterType::Number) | Some(ParameterType::Integer) => Self::parse_number(raw),
            Some(ParameterType::Boolean) => match raw.trim() {
                "" => ParameterValue::Unset,
                "true" => ParameterValue::Bool(true),
                "false" => ParameterValue::Bool(false),
                _ => ParameterValue::Text(raw.to_string()),
            },
            _ if raw.is_empty() => ParameterValue::Unset,
            _ => ParameterValue::Text(raw.to_string()),
        }
    }

    pub fn parse_number(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ParameterValue::Unset;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => ParameterValue::Number(n),
            _ => ParameterValue::Text(raw.to_string()),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, ParameterValue::Unset)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Wire (string-encoded) form.
    pub fn to_wire(&self) -> String {
        match self {
            ParameterValue::Unset => String::new(),
            ParameterValue::Number(n) => n.to_string(),
            ParameterValue::Bool(b) => b.to_string(),
            ParameterValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericSpec {
    pub format: Option<StringFormat>,
    pub minimum: ParameterValue,
    pub maximum: ParameterValue,
}

/// Type-specific configuration of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    String {
        format: Option<StringFormat>,
    },
    Number(NumericSpec),
    Integer(NumericSpec),
    Boolean,
    Enum {
        values: Vec<String>,
    },
    Array {
        item_type: Option<ParameterType>,
        item_description: String,
        item_properties: Map<String, Value>,
    },
    Object {
        properties: Map<String, Value>,
    },
}

impl ParameterKind {
    pub fn empty(param_type: ParameterType) -> Self {
        Self::from_wire(param_type, &WireParameter::default())
    }

    pub fn parameter_type(&self) -> ParameterType {
        match self {
            ParameterKind::String { .. } => ParameterType::String,
            ParameterKind::Number(_) => ParameterType::Number,
            ParameterKind::Integer(_) => ParameterType::Integer,
            ParameterKind::Boolean => ParameterType::Boolean,
            ParameterKind::Enum { .. } => ParameterType::Enum,
            ParameterKind::Array { .. } => ParameterType::Array,
            ParameterKind::Object { .. } => ParameterType::Object,
        }
    }

    fn from_wire(param_type: ParameterType, wire: &WireParameter) -> Self {
        let numeric = || NumericSpec {
            format: StringFormat::parse(&wire.format),
            minimum: ParameterValue::parse_number(&wire.minimum),
            maximum: ParameterValue::parse_number(&wire.maximum),
        };

        match param_type {
            ParameterType::String => ParameterKind::String {
                format: StringFormat::parse(&wire.format),
            },
            ParameterType::Number => ParameterKind::Number(numeric()),
            ParameterType::Integer => ParameterKind::Integer(numeric()),
            ParameterType::Boolean => ParameterKind::Boolean,
            ParameterType::Enum => ParameterKind::Enum {
                values: wire.enum_values.clone(),
            },
            ParameterType::Array => ParameterKind::Array {
                item_type: ParameterType::parse(&wire.array_item_type),
                item_description: wire.array_item_description.clone(),
                item_properties: wire.object_properties.clone(),
            },
            ParameterType::Object => ParameterKind::Object {
                properties: wire.object_properties.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

impl Operator {
    /// Operators offered by the dependency editor for a source parameter type.
    pub fn available_for(source: Option<ParameterType>) -> &'static [Operator] {
        match source {
            Some(t) if t.is_numeric() => &[
                Operator::Equals,
                Operator::NotEquals,
                Operator::GreaterThan,
                Operator::LessThan,
            ],
            Some(ParameterType::String) => {
                &[Operator::Equals, Operator::NotEquals, Operator::Contains]
            }
            _ => &[Operator::Equals, Operator::NotEquals],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Required,
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default = "new_condition_id")]
    pub id: String,
    /// Non-owning reference to another parameter's `id`.
    pub param_id: String,
    pub operator: Operator,
    #[serde(default, deserialize_with = "loose_string")]
    pub value: String,
}

fn new_condition_id() -> String {
    format!("c{}", Uuid::new_v4().simple())
}

impl Condition {
    pub fn new(param_id: impl Into<String>) -> Self {
        Self {
            id: new_condition_id(),
            param_id: param_id.into(),
            operator: Operator::Equals,
            value: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub effect: Effect,
}

impl Dependency {
    /// A dependency without conditions does not exist.
    pub fn new(conditions: Vec<Condition>, effect: Effect) -> Option<Self> {
        if conditions.is_empty() {
            None
        } else {
            Some(Self { conditions, effect })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireParameter", into = "WireParameter")]
pub struct Parameter {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required: bool,
    /// `None` when the type is empty or unrecognised.
    pub kind: Option<ParameterKind>,
    pub default: ParameterValue,
    pub dependencies: Option<Dependency>,
    /// The record this parameter was read from. Fields the current kind
    /// does not use, and the exact text of unchanged values, are written
    /// back from here.
    record: WireParameter,
}

impl Parameter {
    /// A blank parameter as added by the editor.
    pub fn new() -> Self {
        Self {
            id: format!("p{}", Uuid::new_v4().simple()),
            name: String::new(),
            description: String::new(),
            required: true,
            kind: Some(ParameterKind::empty(ParameterType::String)),
            default: ParameterValue::Unset,
            dependencies: None,
            record: WireParameter::default(),
        }
    }

    pub fn with_kind(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ParameterKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            required: false,
            kind: Some(kind),
            default: ParameterValue::Unset,
            dependencies: None,
            record: WireParameter::default(),
        }
    }

    pub fn parameter_type(&self) -> Option<ParameterType> {
        self.kind.as_ref().map(|k| k.parameter_type())
    }

    /// Switches the type, carrying over whatever stored fields the new type
    /// understands and re-typing `minimum`, `maximum` and `default`.
    pub fn set_type(&mut self, param_type: ParameterType) {
        let mut wire = WireParameter::from(self.clone());
        wire.param_type = param_type.as_str().to_string();
        *self = Parameter::from(wire);
    }

    pub fn set_default_text(&mut self, raw: &str) {
        self.default = ParameterValue::parse_for(self.parameter_type(), raw);
        self.record.default = raw.to_string();
    }

    pub fn set_minimum_text(&mut self, raw: &str) {
        if let Some(ParameterKind::Number(spec)) | Some(ParameterKind::Integer(spec)) =
            &mut self.kind
        {
            spec.minimum = ParameterValue::parse_number(raw);
            self.record.minimum = raw.to_string();
        }
    }

    pub fn set_maximum_text(&mut self, raw: &str) {
        if let Some(ParameterKind::Number(spec)) | Some(ParameterKind::Integer(spec)) =
            &mut self.kind
        {
            spec.maximum = ParameterValue::parse_number(raw);
            self.record.maximum = raw.to_string();
        }
    }

    /// Comma-separated list; entries are trimmed and blanks dropped.
    pub fn set_enum_values_from_text(&mut self, text: &str) {
        if let Some(ParameterKind::Enum { values }) = &mut self.kind {
            *values = text
                .split(',')
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
                .collect();
        }
    }

    /// Sets object properties (or array item properties) from JSON text.
    /// Invalid JSON leaves the parameter untouched.
    pub fn set_object_properties_from_text(
        &mut self,
        text: &str,
    ) -> std::result::Result<(), serde_json::Error> {
        let parsed: Map<String, Value> = serde_json::from_str(text)?;
        match &mut self.kind {
            Some(ParameterKind::Object { properties }) => *properties = parsed,
            Some(ParameterKind::Array {
                item_properties, ..
            }) => *item_properties = parsed,
            _ => {}
        }
        Ok(())
    }

    /// Replaces the dependency rule; an empty condition list removes it.
    pub fn set_dependency_conditions(&mut self, conditions: Vec<Condition>, effect: Effect) {
        self.dependencies = Dependency::new(conditions, effect);
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat, string-encoded record exchanged with the CRUD service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireParameter {
    #[serde(default)]
    id: String,
    #[serde(default, deserialize_with = "loose_string")]
    name: String,
    #[serde(rename = "type", default, deserialize_with = "loose_string")]
    param_type: String,
    #[serde(default, deserialize_with = "loose_string")]
    description: String,
    #[serde(default, deserialize_with = "loose_bool")]
    required: bool,
    #[serde(default, deserialize_with = "loose_string")]
    format: String,
    #[serde(default, deserialize_with = "loose_string_list")]
    enum_values: Vec<String>,
    #[serde(default, deserialize_with = "loose_string")]
    minimum: String,
    #[serde(default, deserialize_with = "loose_string")]
    maximum: String,
    #[serde(default, deserialize_with = "loose_string")]
    default: String,
    #[serde(default, deserialize_with = "loose_string")]
    array_item_type: String,
    #[serde(default, deserialize_with = "loose_string")]
    array_item_description: String,
    #[serde(default, deserialize_with = "object_or_empty")]
    object_properties: Map<String, Value>,
    #[serde(default)]
    dependencies: Option<Dependency>,
    /// Keys this crate does not model.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireParameter> for Parameter {
    fn from(wire: WireParameter) -> Self {
        let param_type = ParameterType::parse(&wire.param_type);
        Self {
            id: wire.id.clone(),
            name: wire.name.clone(),
            description: wire.description.clone(),
            required: wire.required,
            kind: param_type.map(|t| ParameterKind::from_wire(t, &wire)),
            default: ParameterValue::parse_for(param_type, &wire.default),
            dependencies: wire
                .dependencies
                .clone()
                .and_then(|d| Dependency::new(d.conditions, d.effect)),
            record: wire,
        }
    }
}

/// Replaces `stored` with the rendering of `current` unless the stored text
/// already reads back as `current`.
fn write_back<T: PartialEq>(
    stored: &mut String,
    current: T,
    read: impl Fn(&str) -> T,
    render: impl Fn(&T) -> String,
) {
    if read(stored) != current {
        *stored = render(&current);
    }
}

fn format_text(format: &Option<StringFormat>) -> String {
    format.map(|f| f.as_str().to_string()).unwrap_or_default()
}

impl From<Parameter> for WireParameter {
    fn from(param: Parameter) -> Self {
        let mut wire = param.record;
        wire.id = param.id;
        wire.name = param.name;
        wire.description = param.description;
        wire.required = param.required;
        wire.dependencies = param.dependencies;

        let param_type = param.kind.as_ref().map(|k| k.parameter_type());
        write_back(
            &mut wire.default,
            param.default,
            |raw| ParameterValue::parse_for(param_type, raw),
            ParameterValue::to_wire,
        );

        let Some(kind) = param.kind else {
            return wire;
        };
        if ParameterType::parse(&wire.param_type) != param_type {
            wire.param_type = kind.parameter_type().as_str().to_string();
        }

        match kind {
            ParameterKind::String { format } => {
                write_back(&mut wire.format, format, StringFormat::parse, format_text);
            }
            ParameterKind::Number(spec) | ParameterKind::Integer(spec) => {
                write_back(&mut wire.format, spec.format, StringFormat::parse, format_text);
                write_back(
                    &mut wire.minimum,
                    spec.minimum,
                    ParameterValue::parse_number,
                    ParameterValue::to_wire,
                );
                write_back(
                    &mut wire.maximum,
                    spec.maximum,
                    ParameterValue::parse_number,
                    ParameterValue::to_wire,
                );
            }
            ParameterKind::Boolean => {}
            ParameterKind::Enum { values } => wire.enum_values = values,
            ParameterKind::Array {
                item_type,
                item_description,
                item_properties,
            } => {
                write_back(
                    &mut wire.array_item_type,
                    item_type,
                    ParameterType::parse,
                    |t| t.map(|t| t.as_str().to_string()).unwrap_or_default(),
                );
                wire.array_item_description = item_description;
                wire.object_properties = item_properties;
            }
            ParameterKind::Object { properties } => wire.object_properties = properties,
        }
        wire
    }
}

/// Older records carry numbers and booleans where the editor writes strings.
fn value_to_loose_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn loose_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_loose_string(&value))
}

fn loose_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => s == "true",
        _ => false,
    })
}

fn loose_string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(value_to_loose_string).collect(),
        _ => Vec::new(),
    })
}

fn object_or_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}
