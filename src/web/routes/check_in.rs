use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::config::Config;
use crate::error::AppError;
use crate::services::check_in_service::{self, CheckInOutcome, TokenPreview};
use crate::web::middleware::auth::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    pub token: String,
}

fn outcome_response(outcome: CheckInOutcome) -> impl IntoResponse {
    let status = if outcome.is_new() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let already_checked_in = !outcome.is_new();
    (
        status,
        Json(serde_json::json!({
            "already_checked_in": already_checked_in,
            "check_in": outcome.check_in(),
        })),
    )
}

pub async fn check_in_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    body: Result<Json<CheckInBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let outcome =
        check_in_service::check_in(&pool, &config, &auth_user.id, &body.token, Utc::now())
            .await
            .map_err(|e| {
                warn!(user_id = %auth_user.id, error = %e, "check-in rejected");
                e
            })?;
    Ok(outcome_response(outcome))
}

pub async fn manual_check_in_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path((event_id, participant_id)): Path<(String, String)>,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = check_in_service::manual_check_in(
        &pool,
        &auth_user.id,
        &event_id,
        &participant_id,
        Utc::now(),
    )
    .await?;
    Ok(outcome_response(outcome))
}

pub async fn undo_check_in_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path((event_id, participant_id)): Path<(String, String)>,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    check_in_service::undo_check_in(&pool, &auth_user.id, &event_id, &participant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Template)]
#[template(path = "check_in.html")]
pub struct CheckInPageTemplate {
    pub token: String,
    pub preview: Option<TokenPreview>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CheckInPageQuery {
    pub token: Option<String>,
}

/// Landing page behind the QR code. Public: holding the token is what
/// lets a scanner see which event it belongs to.
pub async fn check_in_page(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    query: Result<Query<CheckInPageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let token = query.token.unwrap_or_default().trim().to_string();

    let (status, preview, error) =
        match check_in_service::preview_token(&pool, &config, &token, Utc::now()).await {
            Ok(preview) => (StatusCode::OK, Some(preview), None),
            Err(e) => {
                let e = AppError::from(e);
                if e.status().is_server_error() {
                    return Err(e);
                }
                (e.status(), None, Some(e.to_string()))
            }
        };

    let template = CheckInPageTemplate {
        token,
        preview,
        error,
    };
    let html = template
        .render()
        .map_err(|e| AppError::Internal(format!("template render failed: {e}")))?;
    Ok((status, Html(html)))
}
