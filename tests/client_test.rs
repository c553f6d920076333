#[cfg(test)]
mod tests {
    use chrono::Utc;
    use clap::Parser;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use toolforge::client::{HttpToolApi, ToolApi};
    use toolforge::db::init_db;
    use toolforge::payload::{build_payload, EditorState};
    use toolforge::store::ToolStore;
    use toolforge::tool::ToolPatch;
    use toolforge::*;

    /// Serves the real router on an ephemeral port and returns a client
    /// pointed at it.
    async fn spawn_server() -> (HttpToolApi, TempDir) {
        let dir = tempdir().unwrap();
        let db = init_db(dir.path().join("client_test.db")).await.unwrap();
        let state = Arc::new(AppState {
            db,
            args: Arc::new(Args::parse_from(["toolforge"])),
        });
        let app = toolforge::server::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let api =
            HttpToolApi::new(format!("http://{}/api/", addr), Duration::from_secs(5)).unwrap();
        (api, dir)
    }

    fn weather_state() -> EditorState {
        let mut state = EditorState {
            name: "get_weather".into(),
            description: "Fetch current weather".into(),
            ..EditorState::new()
        };
        let city = state.add_parameter();
        city.name = "city".into();
        city.description = "City name".into();
        state
    }

    #[tokio::test]
    async fn test_tool_crud_over_http() {
        let (api, _dir) = spawn_server().await;
        assert!(!api.base_url().ends_with('/'));

        let created = api
            .create_tool(&build_payload(&weather_state(), Utc::now()))
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let listing = api.list_tools().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[&created.id].name, "get_weather");

        let patch = ToolPatch {
            description: Some("Changed".into()),
            ..ToolPatch::default()
        };
        let updated = api.update_tool(&created.id, &patch).await.unwrap();
        assert_eq!(updated.description, "Changed");
        assert_eq!(updated.parameters, created.parameters);

        let fetched = api.get_tool(&created.id).await.unwrap();
        assert_eq!(fetched, updated);

        api.delete_tool(&created.id).await.unwrap();
        let err = api.delete_tool(&created.id).await.unwrap_err();
        match err.inner {
            ToolforgeError::Api { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Tool not found");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_rejection_surfaces_message() {
        let (api, _dir) = spawn_server().await;

        let mut payload = build_payload(&weather_state(), Utc::now());
        payload.name = String::new();
        let err = api.create_tool(&payload).await.unwrap_err();
        match err.inner {
            ToolforgeError::Api { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid tool specification");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ids_with_reserved_characters_reach_the_id_route() {
        let (api, _dir) = spawn_server().await;

        for id in ["a/b", "x?y=1", "hash#tag"] {
            match api.get_tool(id).await.unwrap_err().inner {
                ToolforgeError::Api { status, message } => {
                    assert_eq!(status, StatusCode::NOT_FOUND);
                    assert_eq!(message, "Tool not found");
                }
                other => panic!("unexpected error {:?}", other),
            }
            match api.delete_category(id).await.unwrap_err().inner {
                ToolforgeError::Api { status, message } => {
                    assert_eq!(status, StatusCode::NOT_FOUND);
                    assert_eq!(message, "Category not found");
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_store_against_live_service() {
        let (api, _dir) = spawn_server().await;
        let mut store = ToolStore::new(api);

        store.load_categories().await.unwrap();
        assert_eq!(store.categories().len(), 4);
        assert!(store.category_error().is_none());

        let id = store.save(&weather_state()).await.unwrap();
        store.load_tool_specifications().await.unwrap();
        assert_eq!(store.stats().total_tools, 1);
        assert_eq!(store.stats().active_tools, 1);
        assert_eq!(store.stats().recently_updated, 1);

        let tool = store.get_tool_by_id(&id).unwrap().clone();
        let mut state = EditorState::from_tool(&tool);
        state.category = "API".into();
        store.save(&state).await.unwrap();
        assert_eq!(store.tools_by_category()["API"].len(), 1);

        let response = store
            .test_tool(
                &serde_json::to_value(state.specification()).unwrap(),
                &json!({"city": "Rome"}),
            )
            .await
            .unwrap();
        assert!(response.success);

        let parsed = store
            .api()
            .parse_function_signature("const add = (a: number, b: number) => a + b")
            .await
            .unwrap();
        assert_eq!(parsed.name, "add");
        assert_eq!(parsed.params.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades() {
        let api = HttpToolApi::new("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();
        let mut store = ToolStore::new(api);

        assert!(store.load_tool_specifications().await.is_err());
        assert!(store.is_loaded());
        assert!(store.error().is_some());

        store.load_categories().await.unwrap();
        assert_eq!(store.category_error(), Some("Failed to load categories"));
        assert_eq!(store.categories().len(), 4);
    }
}
