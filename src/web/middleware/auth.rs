use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::AppError;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: String,
}

#[derive(Deserialize)]
struct SessionClaims {
    sub: String,
}

/// Bearer header first, then the `access_token` cookie set by the login flow.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|hv| hv.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

pub fn verify_session_token(config: &Config, token: &str) -> Option<AuthenticatedUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Login providers stamp their own audience, e.g. "authenticated".
    validation.validate_aud = false;
    match jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.auth_jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) if !data.claims.sub.trim().is_empty() => Some(AuthenticatedUser {
            id: data.claims.sub,
        }),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "session token rejected");
            None
        }
    }
}

pub async fn require_auth(
    State(config): State<Arc<Config>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = extract_session_token(request.headers())
        .and_then(|token| verify_session_token(&config, &token));

    match user {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => AppError::Unauthorized("please sign in".to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        aud: Option<&'a str>,
    }

    fn session_token(secret: &str, sub: &str, exp: i64) -> String {
        signed(secret, &Claims { sub, exp, aud: None })
    }

    fn signed(secret: &str, claims: &Claims<'_>) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=from-cookie"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc; refresh_token=xyz"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn valid_session_token_yields_user() {
        let config = test_config();
        let token = session_token(&config.auth_jwt_secret, "user-42", far_future());
        let user = verify_session_token(&config, &token).unwrap();
        assert_eq!(user.id, "user-42");
    }

    #[test]
    fn unsigned_or_foreign_tokens_are_rejected() {
        let config = test_config();
        let forged = session_token("some-other-secret", "user-42", far_future());
        assert!(verify_session_token(&config, &forged).is_none());

        let expired = session_token(&config.auth_jwt_secret, "user-42", 1_000);
        assert!(verify_session_token(&config, &expired).is_none());
    }

    #[test]
    fn provider_audience_claim_is_accepted() {
        let config = test_config();
        let token = signed(
            &config.auth_jwt_secret,
            &Claims {
                sub: "user-42",
                exp: far_future(),
                aud: Some("authenticated"),
            },
        );
        let user = verify_session_token(&config, &token).unwrap();
        assert_eq!(user.id, "user-42");
    }
}
