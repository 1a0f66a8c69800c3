//! Check-in tokens: HS256 JWTs that travel inside the QR code.
//!
//! Every issued token is also recorded in `check_in_tokens` under its `jti`,
//! so a valid signature alone is not enough: the ledger row must exist and
//! must not be revoked.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::database::{check_in_tokens_repo, events_repo, participants_repo};
use crate::models::{format_timestamp, parse_timestamp, CheckInTokensRow, EventsRow};

pub const ISSUER: &str = "meetcheck";
pub const AUDIENCE: &str = "check-in";
pub const MIN_LIFETIME_SECONDS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("check-in token is malformed")]
    Malformed,
    #[error("check-in token signature is invalid")]
    InvalidSignature,
    #[error("check-in token has expired")]
    Expired,
    #[error("check-in token is not valid yet")]
    NotYetValid,
    #[error("token was not issued for check-in")]
    WrongAudience,
    #[error("check-in token is unknown")]
    Unknown,
    #[error("check-in token has been revoked")]
    Revoked,
    #[error("check-in token does not match its ledger entry")]
    EventMismatch,
    #[error("event or participant not found")]
    NotFound,
    #[error("only the event organizer can manage check-in tokens")]
    Forbidden,
    #[error("event has been cancelled")]
    EventCancelled,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInClaims {
    pub jti: String,
    /// Event id.
    pub sub: String,
    /// Participant id for personal tokens; absent on event-wide tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token_id: String,
    pub event_id: String,
    pub participant_id: Option<String>,
    pub token: String,
    pub check_in_url: String,
    pub expires_at: String,
}

#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub claims: CheckInClaims,
    pub record: CheckInTokensRow,
}

impl VerifiedToken {
    pub fn event_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.claims.pid.as_deref()
    }
}

/// Token lifetime: the configured TTL, cut off at the end of the event, but
/// never shorter than [`MIN_LIFETIME_SECONDS`].
pub fn token_expiry(
    config: &Config,
    event_ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let by_ttl = now + Duration::minutes(config.check_in_token_ttl_minutes);
    let capped = match event_ends_at {
        Some(ends_at) if ends_at < by_ttl => ends_at,
        _ => by_ttl,
    };
    capped.max(now + Duration::seconds(MIN_LIFETIME_SECONDS))
}

pub fn sign_claims(config: &Config, claims: &CheckInClaims) -> Result<String, TokenError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.check_in_token_secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Checks signature, issuer, audience and the time window against `now`.
/// Does not consult the ledger; see [`verify_token`].
pub fn decode_token(
    config: &Config,
    token: &str,
    now: DateTime<Utc>,
) -> Result<CheckInClaims, TokenError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Malformed);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
    // Time claims are checked below against the caller's clock.
    validation.validate_exp = false;
    validation.validate_nbf = false;

    let data = jsonwebtoken::decode::<CheckInClaims>(
        token,
        &DecodingKey::from_secret(config.check_in_token_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => TokenError::WrongAudience,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        _ => TokenError::Malformed,
    })?;

    let claims = data.claims;
    let leeway = i64::try_from(config.token_leeway_seconds).unwrap_or(i64::MAX);
    let now_ts = now.timestamp();
    if now_ts >= claims.exp.saturating_add(leeway) {
        return Err(TokenError::Expired);
    }
    if now_ts < claims.nbf.saturating_sub(leeway) {
        return Err(TokenError::NotYetValid);
    }
    Ok(claims)
}

/// Full verification: [`decode_token`] plus the ledger entry.
pub async fn verify_token(
    pool: &SqlitePool,
    config: &Config,
    token: &str,
    now: DateTime<Utc>,
) -> Result<VerifiedToken, TokenError> {
    let claims = decode_token(config, token, now)?;

    let Some(record) = check_in_tokens_repo::load_token(pool, &claims.jti).await? else {
        return Err(TokenError::Unknown);
    };
    if record.is_revoked() {
        return Err(TokenError::Revoked);
    }
    if record.event_id != claims.sub || record.participant_id != claims.pid {
        return Err(TokenError::EventMismatch);
    }

    Ok(VerifiedToken { claims, record })
}

async fn load_managed_event(
    pool: &SqlitePool,
    user_id: &str,
    event_id: &str,
) -> Result<EventsRow, TokenError> {
    let Some(event) = events_repo::load_event(pool, event_id).await? else {
        return Err(TokenError::NotFound);
    };
    if !event.is_organized_by(user_id) {
        return Err(TokenError::Forbidden);
    }
    Ok(event)
}

pub async fn issue_token(
    pool: &SqlitePool,
    config: &Config,
    issued_by_user_id: &str,
    event_id: &str,
    participant_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<IssuedToken, TokenError> {
    let event = load_managed_event(pool, issued_by_user_id, event_id).await?;
    if event.is_cancelled() {
        return Err(TokenError::EventCancelled);
    }

    if let Some(participant_id) = participant_id {
        let participant = participants_repo::load_participant(pool, participant_id).await?;
        if participant.map(|p| p.event_id) != Some(event.event_id.clone()) {
            return Err(TokenError::NotFound);
        }
    }

    let expires_at = token_expiry(config, parse_timestamp(&event.ends_at), now);
    let claims = CheckInClaims {
        jti: Uuid::new_v4().to_string(),
        sub: event.event_id.clone(),
        pid: participant_id.map(str::to_string),
        iss: ISSUER.to_string(),
        aud: AUDIENCE.to_string(),
        iat: now.timestamp(),
        nbf: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = sign_claims(config, &claims)?;

    let issued_at = format_timestamp(now);
    let expires_at = format_timestamp(expires_at);
    check_in_tokens_repo::insert_token(
        pool,
        check_in_tokens_repo::NewCheckInToken {
            token_id: &claims.jti,
            event_id: &claims.sub,
            participant_id: claims.pid.as_deref(),
            issued_by_user_id,
            issued_at: &issued_at,
            expires_at: &expires_at,
        },
    )
    .await?;

    info!(
        event_id = %claims.sub,
        token_id = %claims.jti,
        participant_id = ?claims.pid,
        expires_at = %expires_at,
        "check-in token issued"
    );

    Ok(IssuedToken {
        check_in_url: config.check_in_url(&token),
        token_id: claims.jti,
        event_id: claims.sub,
        participant_id: claims.pid,
        token,
        expires_at,
    })
}

pub async fn list_tokens(
    pool: &SqlitePool,
    user_id: &str,
    event_id: &str,
) -> Result<Vec<CheckInTokensRow>, TokenError> {
    load_managed_event(pool, user_id, event_id).await?;
    Ok(check_in_tokens_repo::list_event_tokens(pool, event_id).await?)
}

pub async fn revoke_token(
    pool: &SqlitePool,
    user_id: &str,
    token_id: &str,
    now: DateTime<Utc>,
) -> Result<CheckInTokensRow, TokenError> {
    let Some(record) = check_in_tokens_repo::load_token(pool, token_id).await? else {
        return Err(TokenError::NotFound);
    };
    load_managed_event(pool, user_id, &record.event_id).await?;

    let changed =
        check_in_tokens_repo::revoke_token(pool, token_id, &format_timestamp(now)).await?;
    if changed > 0 {
        info!(event_id = %record.event_id, token_id = %token_id, "check-in token revoked");
    }

    check_in_tokens_repo::load_token(pool, token_id)
        .await?
        .ok_or(TokenError::NotFound)
}

/// Deletes ledger rows that expired more than `grace_hours` ago. Their JWTs
/// already fail the expiry check, so removing them changes no outcome.
pub async fn prune_expired_tokens(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    grace_hours: i64,
) -> sqlx::Result<u64> {
    let cutoff = format_timestamp(now - Duration::hours(grace_hours));
    check_in_tokens_repo::delete_expired_tokens(pool, &cutoff).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap()
    }

    fn claims(now: DateTime<Utc>, lifetime_minutes: i64) -> CheckInClaims {
        CheckInClaims {
            jti: "tok-1".to_string(),
            sub: "ev-1".to_string(),
            pid: None,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::minutes(lifetime_minutes)).timestamp(),
        }
    }

    #[test]
    fn decode_accepts_a_freshly_signed_token() {
        let config = test_config();
        let c = claims(at(9, 0), 30);
        let token = sign_claims(&config, &c).unwrap();
        assert_eq!(decode_token(&config, &token, at(9, 10)).unwrap(), c);
    }

    #[rstest]
    #[case(at(9, 30), "expired")]
    #[case(at(10, 0), "expired")]
    #[case(at(8, 59), "not_yet_valid")]
    fn decode_enforces_the_time_window(#[case] now: DateTime<Utc>, #[case] expected: &str) {
        let config = test_config();
        let token = sign_claims(&config, &claims(at(9, 0), 30)).unwrap();
        let err = decode_token(&config, &token, now).unwrap_err();
        match expected {
            "expired" => assert!(matches!(err, TokenError::Expired)),
            _ => assert!(matches!(err, TokenError::NotYetValid)),
        }
    }

    #[test]
    fn leeway_extends_expiry() {
        let mut config = test_config();
        config.token_leeway_seconds = 120;
        let token = sign_claims(&config, &claims(at(9, 0), 30)).unwrap();
        assert!(decode_token(&config, &token, at(9, 31)).is_ok());
        assert!(matches!(
            decode_token(&config, &token, at(9, 32)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn a_different_secret_fails_the_signature_check() {
        let config = test_config();
        let token = sign_claims(&config, &claims(at(9, 0), 30)).unwrap();

        let mut other = test_config();
        other.check_in_token_secret = "another-secret-that-is-long-enough-000000".to_string();
        assert!(matches!(
            decode_token(&other, &token, at(9, 1)),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn session_style_tokens_are_rejected_by_audience() {
        let config = test_config();
        let mut c = claims(at(9, 0), 30);
        c.aud = "session".to_string();
        let token = sign_claims(&config, &c).unwrap();
        assert!(matches!(
            decode_token(&config, &token, at(9, 1)),
            Err(TokenError::WrongAudience)
        ));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("not-a-jwt")]
    #[case("a.b.c")]
    fn garbage_is_malformed(#[case] raw: &str) {
        let config = test_config();
        assert!(matches!(
            decode_token(&config, raw, at(9, 0)),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn expiry_is_capped_at_event_end() {
        let config = test_config();
        let ends = at(12, 0);
        assert_eq!(token_expiry(&config, Some(ends), at(9, 0)), ends);
    }

    #[test]
    fn expiry_uses_ttl_when_event_ends_later() {
        let mut config = test_config();
        config.check_in_token_ttl_minutes = 30;
        assert_eq!(token_expiry(&config, Some(at(23, 0)), at(9, 0)), at(9, 30));
        assert_eq!(token_expiry(&config, None, at(9, 0)), at(9, 30));
    }

    #[test]
    fn expiry_has_a_floor_for_events_that_already_ended() {
        let config = test_config();
        let now = at(13, 0);
        assert_eq!(
            token_expiry(&config, Some(at(12, 0)), now),
            now + Duration::seconds(MIN_LIFETIME_SECONDS)
        );
    }
}
