use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::services::attendance_service::{self, AttendanceParams};
use crate::web::middleware::auth::AuthenticatedUser;

pub async fn attendance_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
    params: Result<Query<AttendanceParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let report =
        attendance_service::attendance_report(&pool, &auth_user.id, &event_id, &params).await?;
    Ok(Json(report))
}
