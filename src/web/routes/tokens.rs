use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::AppError;
use crate::services::token_service;
use crate::web::middleware::auth::AuthenticatedUser;

#[derive(Debug, Default, Deserialize)]
pub struct IssueTokenBody {
    /// Omit for an event-wide token shown at the venue.
    pub participant_id: Option<String>,
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .is_some_and(|mime| {
            mime.eq_ignore_ascii_case("application/json")
                || mime.to_ascii_lowercase().ends_with("+json")
        })
}

/// An empty body asks for an event-wide token. Anything else must be
/// well-formed JSON sent as such.
pub fn parse_issue_body(headers: &HeaderMap, body: &[u8]) -> Result<IssueTokenBody, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IssueTokenBody::default());
    }
    if !is_json_content_type(headers) {
        return Err(AppError::BadRequest(
            "expected request with `Content-Type: application/json`".to_string(),
        ));
    }
    let Json(parsed) = Json::<IssueTokenBody>::from_bytes(body)?;
    Ok(parsed)
}

pub async fn issue_token_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let body = parse_issue_body(&headers, &body)?;
    let participant_id = body
        .participant_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let issued = token_service::issue_token(
        &pool,
        &config,
        &auth_user.id,
        &event_id,
        participant_id,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn list_tokens_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(event_id): Path<String>,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = token_service::list_tokens(&pool, &auth_user.id, &event_id).await?;
    Ok(Json(serde_json::json!({ "tokens": tokens })))
}

pub async fn revoke_token_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(token_id): Path<String>,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let token = token_service::revoke_token(&pool, &auth_user.id, &token_id, Utc::now()).await?;
    Ok(Json(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[rstest]
    #[case(b"" as &[u8])]
    #[case(b"  \n")]
    fn empty_body_requests_an_event_wide_token(#[case] body: &[u8]) {
        let parsed = parse_issue_body(&HeaderMap::new(), body).unwrap();
        assert_eq!(parsed.participant_id, None);
    }

    #[test]
    fn participant_id_is_read_from_json() {
        let parsed = parse_issue_body(&json_headers(), br#"{"participant_id":"p-1"}"#).unwrap();
        assert_eq!(parsed.participant_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn vendor_json_media_types_are_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/vnd.meetcheck+json; charset=utf-8"),
        );
        assert!(parse_issue_body(&headers, br#"{"participant_id":null}"#).is_ok());
    }

    #[rstest]
    #[case(HeaderMap::new(), br#"{"participant_id":"p-1"}"# as &[u8])]
    #[case(json_headers(), br#"{"participant_id":42}"#)]
    #[case(json_headers(), b"{not json")]
    fn non_empty_bodies_must_be_valid_json(#[case] headers: HeaderMap, #[case] body: &[u8]) {
        assert!(matches!(
            parse_issue_body(&headers, body),
            Err(AppError::BadRequest(_))
        ));
    }
}
