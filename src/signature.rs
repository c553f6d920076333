//! Seeds editor parameters from a TypeScript/JavaScript function signature.

use crate::parameter::{Parameter, ParameterKind, ParameterType};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Map;

lazy_static! {
    static ref SIGNATURE_PATTERNS: Vec<Regex> = vec![
        // function foo(a: string)
        Regex::new(r"function\s+([a-zA-Z0-9_]+)\s*\(([^)]*)\)").expect("Invalid function regex"),
        // const foo = (a: string) =>
        Regex::new(r"(?:const|let|var)?\s*([a-zA-Z0-9_]+)\s*=\s*\(([^)]*)\)\s*=>")
            .expect("Invalid arrow function regex"),
        // async function foo(a: string)
        Regex::new(r"async\s+function\s+([a-zA-Z0-9_]+)\s*\(([^)]*)\)")
            .expect("Invalid async function regex"),
        // foo(a: string) {
        Regex::new(r"([a-zA-Z0-9_]+)\s*\(([^)]*)\)\s*\{").expect("Invalid method regex"),
    ];
    static ref PARAM_PATTERN: Regex =
        Regex::new(r"([a-zA-Z0-9_]+)\s*\??\s*:\s*([a-zA-Z0-9_]+(?:\[\])?)")
            .expect("Invalid parameter regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSignature {
    pub name: String,
    pub params: Vec<SignatureParam>,
}

impl ParsedSignature {
    /// One required parameter per signature argument, descriptions left
    /// for the user to fill in. Array arguments start with string items.
    pub fn to_parameters(&self) -> Vec<Parameter> {
        self.params
            .iter()
            .map(|p| {
                let mut param = Parameter::new();
                param.name = p.name.clone();
                param.kind = Some(match p.param_type {
                    ParameterType::Array => ParameterKind::Array {
                        item_type: Some(ParameterType::String),
                        item_description: String::new(),
                        item_properties: Map::new(),
                    },
                    other => ParameterKind::empty(other),
                });
                param
            })
            .collect()
    }
}

/// Untyped arguments are skipped; `None` when no pattern matches.
pub fn parse_function_signature(signature: &str) -> Option<ParsedSignature> {
    let captures = SIGNATURE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(signature))?;

    let name = captures.get(1)?.as_str().to_string();
    let params_text = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

    let params = PARAM_PATTERN
        .captures_iter(params_text)
        .map(|c| SignatureParam {
            name: c[1].to_string(),
            param_type: map_type(&c[2]),
        })
        .collect();

    Some(ParsedSignature { name, params })
}

fn map_type(ts_type: &str) -> ParameterType {
    match ts_type.to_lowercase().as_str() {
        "number" => ParameterType::Number,
        "boolean" => ParameterType::Boolean,
        "any" | "object" => ParameterType::Object,
        "array" | "any[]" | "object[]" => ParameterType::Array,
        "int" | "integer" => ParameterType::Integer,
        _ => ParameterType::String,
    }
}
