//! Remote Tool API client
//!
//! Thin reqwest wrapper over the CRUD service's HTTP contract. The store is
//! generic over [`ToolApi`] so tests can substitute an in-process fake.

pub use crate::constants::DEFAULT_API_URL;
use crate::payload::ToolPayload;
use crate::signature::ParsedSignature;
use crate::tester::TestToolResponse;
use crate::tool::{Category, Tool, ToolPatch};
use crate::types::{Result, ToolforgeError};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

#[allow(async_fn_in_trait)]
pub trait ToolApi {
    async fn list_tools(&self) -> Result<HashMap<String, Tool>>;
    async fn get_tool(&self, id: &str) -> Result<Tool>;
    async fn create_tool(&self, payload: &ToolPayload) -> Result<Tool>;
    async fn update_tool(&self, id: &str, patch: &ToolPatch) -> Result<Tool>;
    async fn delete_tool(&self, id: &str) -> Result<()>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn create_category(&self, name: &str) -> Result<Category>;
    async fn delete_category(&self, id: &str) -> Result<()>;
    async fn test_tool(&self, tool_spec: &Value, test_input: &Value) -> Result<TestToolResponse>;
}

/// `GET /api/tools` is a map keyed by id on this server, but other server
/// builds answer with a plain list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ToolListing {
    Map(HashMap<String, Tool>),
    List(Vec<Tool>),
}

impl ToolListing {
    fn into_map(self) -> HashMap<String, Tool> {
        match self {
            ToolListing::Map(map) => map,
            ToolListing::List(list) => list.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }
}

#[derive(Clone)]
pub struct HttpToolApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpToolApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/{collection}/{id}` with `id` percent-encoded as one segment.
    fn resource_url(&self, collection: &str, id: &str) -> Result<reqwest::Url> {
        let invalid = || ToolforgeError::BadRequest(format!("Invalid API URL: {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(collection)
            .push(id);
        Ok(url)
    }

    pub async fn parse_function_signature(&self, signature: &str) -> Result<ParsedSignature> {
        let response = self
            .client
            .post(self.url("/parseFunctionSignature"))
            .json(&json!({ "signature": signature }))
            .send()
            .await?;
        read_json(response).await
    }
}

/// Reduces a non-2xx answer to its best message: `message`, then `error`,
/// then the status line.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.json::<Value>().await.ok();
    let message = error_message(status, body.as_ref());
    tracing::error!("API call failed: {}", message);
    Err(ToolforgeError::Api { status, message }.into())
}

pub(crate) fn error_message(status: StatusCode, body: Option<&Value>) -> String {
    let field = |key: &str| {
        body.and_then(|b| b.get(key))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    };

    field("message").or_else(|| field("error")).unwrap_or_else(|| {
        format!(
            "API Error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )
        .trim_end()
        .to_string()
    })
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;
    Ok(response.json::<T>().await?)
}

impl ToolApi for HttpToolApi {
    async fn list_tools(&self) -> Result<HashMap<String, Tool>> {
        let response = self.client.get(self.url("/tools")).send().await?;
        let listing: ToolListing = read_json(response).await?;
        Ok(listing.into_map())
    }

    async fn get_tool(&self, id: &str) -> Result<Tool> {
        let response = self
            .client
            .get(self.resource_url("tools", id)?)
            .send()
            .await?;
        read_json(response).await
    }

    async fn create_tool(&self, payload: &ToolPayload) -> Result<Tool> {
        let response = self
            .client
            .post(self.url("/tools"))
            .json(payload)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_tool(&self, id: &str, patch: &ToolPatch) -> Result<Tool> {
        let response = self
            .client
            .put(self.resource_url("tools", id)?)
            .json(patch)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_tool(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.resource_url("tools", id)?)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let response = self.client.get(self.url("/categories")).send().await?;
        read_json(response).await
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let response = self
            .client
            .post(self.url("/categories"))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_category(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.resource_url("categories", id)?)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn test_tool(&self, tool_spec: &Value, test_input: &Value) -> Result<TestToolResponse> {
        let response = self
            .client
            .post(self.url("/test-tool"))
            .json(&json!({ "toolSpec": tool_spec, "testInput": test_input }))
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_precedence() {
        let both = json!({"message": "Invalid tool", "error": "other"});
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, Some(&both)),
            "Invalid tool"
        );

        let error_only = json!({"error": "Tool not found"});
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, Some(&error_only)),
            "Tool not found"
        );

        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, None),
            "API Error: 502 Bad Gateway"
        );
    }

    #[test]
    fn test_listing_accepts_map_and_list() {
        let map: ToolListing =
            serde_json::from_value(json!({"a": {"id": "a", "name": "A"}})).unwrap();
        assert_eq!(map.into_map().len(), 1);

        let list: ToolListing =
            serde_json::from_value(json!([{"id": "a", "name": "A"}, {"id": "b", "name": "B"}]))
                .unwrap();
        let map = list.into_map();
        assert_eq!(map["b"].name, "B");
    }

    #[test]
    fn test_base_url_is_normalised() {
        let api = HttpToolApi::with_client(reqwest::Client::new(), "http://localhost:3001/api/");
        assert_eq!(api.url("/tools"), "http://localhost:3001/api/tools");
    }

    #[test]
    fn test_ids_are_encoded_as_one_segment() {
        let api = HttpToolApi::with_client(reqwest::Client::new(), "http://localhost:3001/api");
        let url = api.resource_url("tools", "a/b?c#d").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/tools/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);

        let bad = HttpToolApi::with_client(reqwest::Client::new(), "not a url");
        assert!(matches!(
            bad.resource_url("tools", "x").unwrap_err().inner,
            ToolforgeError::BadRequest(_)
        ));
    }
}
