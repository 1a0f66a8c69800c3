use sqlx::SqlitePool;

use crate::models::EventsRow;

pub struct NewEvent<'a> {
    pub event_id: &'a str,
    pub organizer_user_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub starts_at: &'a str,
    pub ends_at: &'a str,
    pub check_in_opens_minutes: i64,
    pub created_at: &'a str,
}

const SQL_INSERT_EVENT: &str = r#"
INSERT INTO events (
  event_id,
  organizer_user_id,
  title,
  description,
  starts_at,
  ends_at,
  check_in_opens_minutes,
  status,
  created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'published', ?8)
"#;

pub async fn insert_event(pool: &SqlitePool, event: NewEvent<'_>) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_EVENT)
        .bind(event.event_id)
        .bind(event.organizer_user_id)
        .bind(event.title)
        .bind(event.description)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.check_in_opens_minutes)
        .bind(event.created_at)
        .execute(pool)
        .await?;
    Ok(())
}

const SQL_LOAD_EVENT: &str = r#"
SELECT
  event_id,
  organizer_user_id,
  title,
  description,
  starts_at,
  ends_at,
  check_in_opens_minutes,
  status,
  created_at
FROM events
WHERE event_id = ?1
LIMIT 1
"#;

pub async fn load_event(pool: &SqlitePool, event_id: &str) -> sqlx::Result<Option<EventsRow>> {
    sqlx::query_as::<_, EventsRow>(SQL_LOAD_EVENT)
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

const SQL_LIST_ORGANIZER_EVENTS: &str = r#"
SELECT
  event_id,
  organizer_user_id,
  title,
  description,
  starts_at,
  ends_at,
  check_in_opens_minutes,
  status,
  created_at
FROM events
WHERE organizer_user_id = ?1
ORDER BY starts_at DESC, event_id
LIMIT ?2 OFFSET ?3
"#;

pub async fn list_organizer_events(
    pool: &SqlitePool,
    organizer_user_id: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<EventsRow>> {
    sqlx::query_as::<_, EventsRow>(SQL_LIST_ORGANIZER_EVENTS)
        .bind(organizer_user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

const SQL_CANCEL_EVENT: &str = r#"
UPDATE events
SET status = 'cancelled'
WHERE event_id = ?1
  AND status != 'cancelled'
"#;

pub async fn cancel_event(pool: &SqlitePool, event_id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_CANCEL_EVENT)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
