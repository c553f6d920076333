use crate::main_helper::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: String,
    pub tools: Option<i64>,
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "ok" })
}

pub async fn readiness(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let count: std::result::Result<(i64,), sqlx::Error> =
        sqlx::query_as("SELECT COUNT(*) FROM tools")
            .fetch_one(&state.db)
            .await;

    match count {
        Ok((tools,)) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                database: "ok".to_string(),
                tools: Some(tools),
            }),
        ),
        Err(e) => {
            tracing::error!("Readiness check: DB error: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unready".to_string(),
                    database: "error".to_string(),
                    tools: None,
                }),
            )
        }
    }
}
