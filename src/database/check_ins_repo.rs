use sqlx::SqlitePool;

use crate::models::CheckInsRow;

pub struct NewCheckIn<'a> {
    pub check_in_id: &'a str,
    pub event_id: &'a str,
    pub participant_id: &'a str,
    pub participant_type: &'a str,
    pub token_id: Option<&'a str>,
    pub checked_in_by_user_id: &'a str,
    pub method: &'a str, // qr|manual
    pub checked_in_at: &'a str,
}

// The UNIQUE (event_id, participant_id) constraint makes this at-most-once:
// a concurrent or repeated scan affects zero rows instead of duplicating.
const SQL_INSERT_CHECK_IN: &str = r#"
INSERT INTO check_ins (
  check_in_id,
  event_id,
  participant_id,
  participant_type,
  token_id,
  checked_in_by_user_id,
  method,
  checked_in_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
ON CONFLICT (event_id, participant_id) DO NOTHING
"#;

pub async fn insert_check_in(pool: &SqlitePool, cmd: NewCheckIn<'_>) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_CHECK_IN)
        .bind(cmd.check_in_id)
        .bind(cmd.event_id)
        .bind(cmd.participant_id)
        .bind(cmd.participant_type)
        .bind(cmd.token_id)
        .bind(cmd.checked_in_by_user_id)
        .bind(cmd.method)
        .bind(cmd.checked_in_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LOAD_CHECK_IN: &str = r#"
SELECT
  check_in_id,
  event_id,
  participant_id,
  participant_type,
  token_id,
  checked_in_by_user_id,
  method,
  checked_in_at
FROM check_ins
WHERE event_id = ?1
  AND participant_id = ?2
LIMIT 1
"#;

pub async fn load_check_in(
    pool: &SqlitePool,
    event_id: &str,
    participant_id: &str,
) -> sqlx::Result<Option<CheckInsRow>> {
    sqlx::query_as::<_, CheckInsRow>(SQL_LOAD_CHECK_IN)
        .bind(event_id)
        .bind(participant_id)
        .fetch_optional(pool)
        .await
}

const SQL_DELETE_CHECK_IN: &str = r#"
DELETE FROM check_ins
WHERE event_id = ?1
  AND participant_id = ?2
"#;

pub async fn delete_check_in(
    pool: &SqlitePool,
    event_id: &str,
    participant_id: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_CHECK_IN)
        .bind(event_id)
        .bind(participant_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
