use sqlx::SqlitePool;

use crate::models::CheckInTokensRow;

pub struct NewCheckInToken<'a> {
    pub token_id: &'a str,
    pub event_id: &'a str,
    pub participant_id: Option<&'a str>,
    pub issued_by_user_id: &'a str,
    pub issued_at: &'a str,
    pub expires_at: &'a str,
}

const SQL_INSERT_TOKEN: &str = r#"
INSERT INTO check_in_tokens (
  token_id,
  event_id,
  participant_id,
  issued_by_user_id,
  issued_at,
  expires_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub async fn insert_token(pool: &SqlitePool, token: NewCheckInToken<'_>) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_TOKEN)
        .bind(token.token_id)
        .bind(token.event_id)
        .bind(token.participant_id)
        .bind(token.issued_by_user_id)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

const SQL_LOAD_TOKEN: &str = r#"
SELECT
  token_id,
  event_id,
  participant_id,
  issued_by_user_id,
  issued_at,
  expires_at,
  revoked_at
FROM check_in_tokens
WHERE token_id = ?1
LIMIT 1
"#;

pub async fn load_token(
    pool: &SqlitePool,
    token_id: &str,
) -> sqlx::Result<Option<CheckInTokensRow>> {
    sqlx::query_as::<_, CheckInTokensRow>(SQL_LOAD_TOKEN)
        .bind(token_id)
        .fetch_optional(pool)
        .await
}

const SQL_LIST_EVENT_TOKENS: &str = r#"
SELECT
  token_id,
  event_id,
  participant_id,
  issued_by_user_id,
  issued_at,
  expires_at,
  revoked_at
FROM check_in_tokens
WHERE event_id = ?1
ORDER BY issued_at DESC, token_id ASC
"#;

pub async fn list_event_tokens(
    pool: &SqlitePool,
    event_id: &str,
) -> sqlx::Result<Vec<CheckInTokensRow>> {
    sqlx::query_as::<_, CheckInTokensRow>(SQL_LIST_EVENT_TOKENS)
        .bind(event_id)
        .fetch_all(pool)
        .await
}

// First revocation wins; repeating it leaves revoked_at untouched.
const SQL_REVOKE_TOKEN: &str = r#"
UPDATE check_in_tokens
SET revoked_at = ?2
WHERE token_id = ?1
  AND revoked_at IS NULL
"#;

pub async fn revoke_token(pool: &SqlitePool, token_id: &str, revoked_at: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_REVOKE_TOKEN)
        .bind(token_id)
        .bind(revoked_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_EXPIRED_TOKENS: &str = r#"
DELETE FROM check_in_tokens
WHERE expires_at < ?1
"#;

pub async fn delete_expired_tokens(pool: &SqlitePool, expired_before: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_EXPIRED_TOKENS)
        .bind(expired_before)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
