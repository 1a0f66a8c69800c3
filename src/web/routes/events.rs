use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::services::event_service::{
    self, CreateEventInput, ListEventsParams, RegisterParticipantInput,
};
use crate::web::middleware::auth::AuthenticatedUser;

pub async fn create_event_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
    input: Result<Json<CreateEventInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = input?;
    let event = event_service::create_event(&pool, &auth_user.id, &input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
    params: Result<Query<ListEventsParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let page = event_service::list_organizer_events(&pool, &auth_user.id, &params).await?;
    Ok(Json(page))
}

pub async fn get_event_handler(
    Extension(_auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let event = event_service::get_event(&pool, &event_id).await?;
    Ok(Json(event))
}

pub async fn cancel_event_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let event = event_service::cancel_event(&pool, &auth_user.id, &event_id).await?;
    Ok(Json(event))
}

pub async fn register_participant_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
    input: Result<Json<RegisterParticipantInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = input?;
    let participant =
        event_service::register_participant(&pool, &auth_user.id, &event_id, &input, Utc::now())
            .await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn list_participants_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let participants = event_service::list_participants(&pool, &auth_user.id, &event_id).await?;
    Ok(Json(serde_json::json!({ "participants": participants })))
}
