use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sqlx::SqlitePool;
use tracing::warn;

pub const BUILD_ID: &str = env!("MEETCHECK_BUILD_ID");

pub async fn health_handler(State(pool): State<SqlitePool>) -> impl IntoResponse {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "build": BUILD_ID })),
        ),
        Err(e) => {
            warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "degraded", "build": BUILD_ID })),
            )
        }
    }
}
