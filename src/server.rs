//! CRUD service
//!
//! Persists tools and categories in SQLite and exposes them over HTTP. The
//! server assigns `id` and `lastModified`; whatever the client sends for
//! those is overwritten.

use crate::db;
use crate::health;
use crate::logging::request_id_middleware;
use crate::main_helper::AppState;
use crate::signature::{parse_function_signature, ParsedSignature};
use crate::tester::{run_request, TestToolRequest, TestToolResponse};
use crate::tool::{Category, Tool};
use crate::types::{Result, ToolforgeError};
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use jsonschema::{Draft, Validator};
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

lazy_static! {
    static ref TOOL_BODY_VALIDATOR: Validator = jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(&tool_body_schema())
        .expect("Invalid tool body schema");
}

/// Shape every stored tool must have.
fn tool_body_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "description": {"type": "string"},
            "version": {"type": "string"},
            "category": {"type": "string"},
            "status": {"enum": ["active", "inactive", "draft"]},
            "parameters": {"type": "array"},
            "inputSchema": {
                "type": "object",
                "properties": {
                    "type": {"type": "string", "enum": ["object"]},
                    "properties": {"type": "object"}
                },
                "required": ["type", "properties"]
            },
            "returns": {
                "type": "object",
                "properties": {
                    "type": {"type": "string"},
                    "properties": {"type": "object"}
                },
                "required": ["type", "properties"]
            },
            "annotations": {
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "readOnlyHint": {"type": "boolean"},
                    "destructiveHint": {"type": "boolean"},
                    "idempotentHint": {"type": "boolean"},
                    "openWorldHint": {"type": "boolean"}
                }
            }
        },
        "required": ["name", "description", "version", "parameters", "inputSchema", "returns"]
    })
}

pub fn validate_tool_body(body: &Value) -> Result<()> {
    let errors: Vec<String> = TOOL_BODY_VALIDATOR
        .iter_errors(body)
        .map(|err| err.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ToolforgeError::InvalidSpecification(errors).into())
    }
}

/// Top-level keys of `patch` replace those of `base`.
fn merge_shallow(base: &mut Value, patch: Value) -> Result<()> {
    let (Some(base), Value::Object(patch)) = (base.as_object_mut(), patch) else {
        return Err(ToolforgeError::BadRequest("Request body must be a JSON object".into()).into());
    };
    for (key, value) in patch {
        base.insert(key, value);
    }
    Ok(())
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.args.max_body_size;

    Router::new()
        .route("/api/tools", get(list_tools).post(create_tool))
        .route(
            "/api/tools/:id",
            get(get_tool).put(update_tool).delete(delete_tool),
        )
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/:id", delete(delete_category))
        .route("/api/test-tool", post(test_tool))
        .route("/api/parseFunctionSignature", post(parse_signature))
        .route("/health", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Result<Json<BTreeMap<String, Tool>>> {
    let tools = db::list_tools(&state.db).await?;
    tracing::debug!("Listing {} tools", tools.len());
    Ok(Json(
        tools.into_iter().map(|t| (t.id.clone(), t)).collect(),
    ))
}

async fn get_tool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Tool>> {
    match db::get_tool(&state.db, &id).await? {
        Some(tool) => Ok(Json(tool)),
        None => Err(ToolforgeError::NotFound("Tool not found".into()).into()),
    }
}

async fn create_tool(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Tool>)> {
    validate_tool_body(&body)?;

    let mut tool: Tool = serde_json::from_value(body)?;
    tool.id = Uuid::new_v4().to_string();
    tool.last_modified = timestamp();

    db::save_tool(&state.db, &tool).await?;
    tracing::info!("Created tool {} ({})", tool.name, tool.id);
    Ok((StatusCode::CREATED, Json(tool)))
}

/// The body is merged over the stored record and the merged record must
/// still be a valid tool.
async fn update_tool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Tool>> {
    let Some(existing) = db::get_tool(&state.db, &id).await? else {
        return Err(ToolforgeError::NotFound("Tool not found".into()).into());
    };

    let mut merged = serde_json::to_value(&existing)?;
    merge_shallow(&mut merged, body)?;
    validate_tool_body(&merged)?;

    let mut tool: Tool = serde_json::from_value(merged)?;
    tool.id = id;
    tool.last_modified = timestamp();

    db::save_tool(&state.db, &tool).await?;
    tracing::info!("Updated tool {} ({})", tool.name, tool.id);
    Ok(Json(tool))
}

async fn delete_tool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if db::delete_tool(&state.db, &id).await? {
        tracing::info!("Deleted tool {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ToolforgeError::NotFound("Tool not found".into()).into())
    }
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Category>>> {
    Ok(Json(db::list_categories(&state.db).await?))
}

#[derive(Deserialize)]
struct CategoryRequest {
    #[serde(default)]
    name: Option<String>,
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let name = body.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ToolforgeError::BadRequest("Category name is required".into()).into());
    }

    let category = db::insert_category(&state.db, name).await?;
    tracing::info!("Created category {} ({})", category.name, category.id);
    Ok((StatusCode::CREATED, Json(category)))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    if db::delete_category(&state.db, &id).await? {
        Ok(Json(json!({ "message": "Category deleted successfully" })))
    } else {
        Err(ToolforgeError::NotFound("Category not found".into()).into())
    }
}

async fn test_tool(Json(request): Json<TestToolRequest>) -> Result<Json<TestToolResponse>> {
    Ok(Json(run_request(&request)?))
}

#[derive(Deserialize)]
struct SignatureRequest {
    #[serde(default)]
    signature: String,
}

async fn parse_signature(Json(request): Json<SignatureRequest>) -> Result<Json<ParsedSignature>> {
    match parse_function_signature(&request.signature) {
        Some(parsed) => Ok(Json(parsed)),
        None => {
            tracing::warn!("Could not parse function signature: {}", request.signature);
            Err(ToolforgeError::BadRequest("Could not parse function signature".into()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{build_payload, EditorState};

    #[test]
    fn test_built_payload_passes_body_schema() {
        let state = EditorState {
            name: "echo".into(),
            description: "Echo input".into(),
            ..EditorState::new()
        };
        let body = serde_json::to_value(build_payload(&state, Utc::now())).unwrap();
        assert!(validate_tool_body(&body).is_ok());
    }

    #[test]
    fn test_body_schema_rejects_missing_fields() {
        let err = validate_tool_body(&json!({"name": "x"})).unwrap_err();
        match err.inner {
            ToolforgeError::InvalidSpecification(errors) => assert!(!errors.is_empty()),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_merge_shallow_replaces_top_level_keys() {
        let mut base = json!({
            "name": "a",
            "inputSchema": {"type": "object", "properties": {"x": {}}}
        });
        merge_shallow(&mut base, json!({"inputSchema": {"type": "object", "properties": {}}}))
            .unwrap();
        assert_eq!(base["name"], "a");
        assert_eq!(base["inputSchema"]["properties"], json!({}));

        assert!(merge_shallow(&mut base, json!([1, 2])).is_err());
    }
}
