//! Tool Store
//!
//! Client-side cache of tools and categories. Every mutation goes through
//! the CRUD service first and is committed to memory only once the service
//! confirms it. Actions take `&mut self`, so a store never has two actions
//! in flight. Each network call is raced against the store's cancellation
//! token; a cancelled call returns [`ToolforgeError::Cancelled`] and leaves
//! the cached state as it was.

use crate::client::ToolApi;
use crate::payload::{build_payload, EditorState, ToolPayload};
use crate::tester::TestToolResponse;
use crate::tool::{default_categories, Category, Tool, ToolPatch, ToolStats};
use crate::types::{Result, ToolforgeError};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub const RECENT_WINDOW_DAYS: i64 = 30;

pub struct ToolStore<A: ToolApi> {
    api: A,
    cancel: CancellationToken,
    tools: HashMap<String, Tool>,
    is_loaded: bool,
    is_loading: bool,
    error: Option<String>,
    categories: Vec<Category>,
    category_error: Option<String>,
}

impl<A: ToolApi> ToolStore<A> {
    pub fn new(api: A) -> Self {
        Self::with_cancellation(api, CancellationToken::new())
    }

    /// Ties the store to an owner's lifetime; cancelling `cancel` aborts
    /// whatever call is in flight.
    pub fn with_cancellation(api: A, cancel: CancellationToken) -> Self {
        Self {
            api,
            cancel,
            tools: HashMap::new(),
            is_loaded: false,
            is_loading: false,
            error: None,
            categories: Vec::new(),
            category_error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn tools(&self) -> &HashMap<String, Tool> {
        &self.tools
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_error(&self) -> Option<&str> {
        self.category_error.as_deref()
    }

    async fn guarded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ToolforgeError::Cancelled.into()),
            result = call => result,
        }
    }

    /// A failed load still ends in `is_loaded`, with the message kept in
    /// `error`, so callers never see a permanent loading state.
    pub async fn load_tool_specifications(&mut self) -> Result<()> {
        self.is_loading = true;
        self.error = None;

        let result = self.guarded(self.api.list_tools()).await;
        self.is_loading = false;

        match result {
            Ok(tools) => {
                tracing::info!("Loaded {} tools", tools.len());
                self.tools = tools;
                self.is_loaded = true;
                Ok(())
            }
            Err(e) if matches!(e.inner, ToolforgeError::Cancelled) => Err(e),
            Err(e) => {
                tracing::warn!("Failed to load tools: {}", e);
                self.error = Some(e.to_string());
                self.is_loaded = true;
                Err(e)
            }
        }
    }

    /// Tools ordered by name.
    pub fn all_tools(&self) -> Vec<&Tool> {
        let mut tools: Vec<&Tool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        tools
    }

    pub fn get_tool_by_id(&self, id: &str) -> Option<&Tool> {
        self.tools.get(id)
    }

    pub async fn add_tool(&mut self, payload: &ToolPayload) -> Result<String> {
        let created = self.guarded(self.api.create_tool(payload)).await?;
        let id = created.id.clone();
        tracing::info!("Created tool {} ({})", created.name, id);
        self.tools.insert(id.clone(), created);
        Ok(id)
    }

    pub async fn update_tool(&mut self, id: &str, patch: &ToolPatch) -> Result<()> {
        let mut updated = self.guarded(self.api.update_tool(id, patch)).await?;
        if updated.id.is_empty() {
            updated.id = id.to_string();
        }
        tracing::info!("Updated tool {}", id);
        self.tools.insert(updated.id.clone(), updated);
        Ok(())
    }

    pub async fn delete_tool(&mut self, id: &str) -> Result<()> {
        self.guarded(self.api.delete_tool(id)).await?;
        self.tools.remove(id);
        tracing::info!("Deleted tool {}", id);
        Ok(())
    }

    /// Validates the editor state and creates or updates the tool. Invalid
    /// state never reaches the network. Returns the tool id.
    pub async fn save(&mut self, state: &EditorState) -> Result<String> {
        let report = state.validate();
        if !report.is_valid() {
            return Err(ToolforgeError::Validation(report.errors).into());
        }

        let payload = build_payload(state, Utc::now());
        match &state.id {
            Some(id) => {
                self.update_tool(id, &ToolPatch::from(payload)).await?;
                Ok(id.clone())
            }
            None => self.add_tool(&payload).await,
        }
    }

    pub fn stats(&self) -> ToolStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> ToolStats {
        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        ToolStats {
            total_tools: self.tools.len(),
            active_tools: self.tools.values().filter(|t| t.is_active()).count(),
            recently_updated: self
                .tools
                .values()
                .filter(|t| t.last_modified_at().is_some_and(|ts| ts > cutoff))
                .count(),
        }
    }

    /// Case-insensitive match on name or description, optionally limited to
    /// one category.
    pub fn search(&self, term: &str, category: Option<&str>) -> Vec<&Tool> {
        let term = term.trim().to_lowercase();
        self.all_tools()
            .into_iter()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .filter(|t| {
                term.is_empty()
                    || t.name.to_lowercase().contains(&term)
                    || t.description.to_lowercase().contains(&term)
            })
            .collect()
    }

    pub fn tools_by_category(&self) -> BTreeMap<String, Vec<&Tool>> {
        let mut grouped: BTreeMap<String, Vec<&Tool>> = BTreeMap::new();
        for tool in self.all_tools() {
            grouped.entry(tool.category.clone()).or_default().push(tool);
        }
        grouped
    }

    /// Falls back to the default category list when the service is
    /// unreachable.
    pub async fn load_categories(&mut self) -> Result<()> {
        self.category_error = None;
        match self.guarded(self.api.list_categories()).await {
            Ok(categories) => {
                self.categories = categories;
                Ok(())
            }
            Err(e) if matches!(e.inner, ToolforgeError::Cancelled) => Err(e),
            Err(e) => {
                tracing::warn!("Failed to load categories, using defaults: {}", e);
                self.category_error = Some("Failed to load categories".to_string());
                self.categories = default_categories();
                Ok(())
            }
        }
    }

    pub async fn add_category(&mut self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ToolforgeError::BadRequest("Category name is required".into()).into());
        }
        let lowered = name.to_lowercase();
        if self
            .categories
            .iter()
            .any(|c| c.name.to_lowercase() == lowered)
        {
            return Err(ToolforgeError::Conflict("Category already exists".into()).into());
        }

        let category = self.guarded(self.api.create_category(name)).await?;
        self.categories.push(category.clone());
        Ok(category)
    }

    pub async fn delete_category(&mut self, id: &str) -> Result<()> {
        self.guarded(self.api.delete_category(id)).await?;
        self.categories.retain(|c| c.id != id);
        Ok(())
    }

    pub async fn test_tool(
        &self,
        tool_spec: &Value,
        test_input: &Value,
    ) -> Result<TestToolResponse> {
        self.guarded(self.api.test_tool(tool_spec, test_input)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolStatus;
    use chrono::TimeZone;

    struct NoApi;

    impl ToolApi for NoApi {
        async fn list_tools(&self) -> Result<HashMap<String, Tool>> {
            Ok(HashMap::new())
        }
        async fn get_tool(&self, id: &str) -> Result<Tool> {
            Err(ToolforgeError::NotFound(id.to_string()).into())
        }
        async fn create_tool(&self, _payload: &ToolPayload) -> Result<Tool> {
            Err(ToolforgeError::internal("unused").into())
        }
        async fn update_tool(&self, _id: &str, _patch: &ToolPatch) -> Result<Tool> {
            Err(ToolforgeError::internal("unused").into())
        }
        async fn delete_tool(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn list_categories(&self) -> Result<Vec<Category>> {
            Ok(Vec::new())
        }
        async fn create_category(&self, name: &str) -> Result<Category> {
            Ok(Category {
                id: "c1".into(),
                name: name.into(),
            })
        }
        async fn delete_category(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn test_tool(&self, _spec: &Value, _input: &Value) -> Result<TestToolResponse> {
            Err(ToolforgeError::internal("unused").into())
        }
    }

    fn tool(id: &str, name: &str, category: &str, status: ToolStatus, modified: &str) -> Tool {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "description": format!("{} description", name),
            "category": category,
            "status": status,
            "lastModified": modified,
        }))
        .unwrap()
    }

    fn seeded() -> ToolStore<NoApi> {
        let mut store = ToolStore::new(NoApi);
        for t in [
            tool("a", "Weather", "API", ToolStatus::Active, "2024-06-01T00:00:00Z"),
            tool("b", "grep", "CLI", ToolStatus::Inactive, "2024-05-20"),
            tool("c", "Export", "Data", ToolStatus::Active, "2023-01-01T00:00:00Z"),
        ] {
            store.tools.insert(t.id.clone(), t);
        }
        store
    }

    #[test]
    fn test_initial_state() {
        let store = ToolStore::new(NoApi);
        assert!(!store.is_loaded());
        assert!(!store.is_loading());
        assert!(store.error().is_none());
        assert!(store.tools().is_empty());
    }

    #[test]
    fn test_stats_window() {
        let store = seeded();
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        assert_eq!(
            store.stats_at(now),
            ToolStats {
                total_tools: 3,
                active_tools: 2,
                recently_updated: 2,
            }
        );
    }

    #[test]
    fn test_search_and_grouping() {
        let store = seeded();
        let names = |tools: Vec<&Tool>| tools.into_iter().map(|t| t.id.clone()).collect::<Vec<_>>();

        assert_eq!(names(store.search("WEATHER", None)), vec!["a"]);
        assert_eq!(names(store.search("description", Some("CLI"))), vec!["b"]);
        assert_eq!(store.search("", None).len(), 3);
        assert!(store.search("nothing", None).is_empty());

        let grouped = store.tools_by_category();
        assert_eq!(grouped.keys().cloned().collect::<Vec<_>>(), vec!["API", "CLI", "Data"]);
    }

    #[tokio::test]
    async fn test_category_checks_happen_locally() {
        let mut store = ToolStore::new(NoApi);
        store.categories = default_categories();

        let err = store.add_category("  ").await.unwrap_err();
        assert_eq!(err.to_string(), "Category name is required");

        let err = store.add_category("cli").await.unwrap_err();
        assert_eq!(err.to_string(), "Category already exists");

        let created = store.add_category("Search").await.unwrap();
        assert_eq!(created.name, "Search");
        assert_eq!(store.categories().len(), 5);
    }

    #[tokio::test]
    async fn test_cancelled_store_rejects_calls() {
        let mut store = seeded();
        store.cancellation_token().cancel();

        let err = store.delete_tool("a").await.unwrap_err();
        assert!(matches!(err.inner, ToolforgeError::Cancelled));
        assert!(store.get_tool_by_id("a").is_some());

        let err = store.load_tool_specifications().await.unwrap_err();
        assert!(matches!(err.inner, ToolforgeError::Cancelled));
        assert!(!store.is_loading());
        assert_eq!(store.tools().len(), 3);
    }
}
