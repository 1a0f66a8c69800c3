use sqlx::SqlitePool;

use crate::models::{ParticipantAttendanceRow, ParticipantsRow};

pub struct NewParticipant<'a> {
    pub participant_id: &'a str,
    pub event_id: &'a str,
    pub user_id: Option<&'a str>,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub participant_type: &'a str,
    pub registered_at: &'a str,
}

// Duplicate (event_id, user_id) pairs are ignored; callers inspect rows_affected.
const SQL_INSERT_PARTICIPANT: &str = r#"
INSERT INTO participants (
  participant_id,
  event_id,
  user_id,
  name,
  email,
  participant_type,
  registered_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT (event_id, user_id) DO NOTHING
"#;

pub async fn insert_participant(
    pool: &SqlitePool,
    participant: NewParticipant<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_PARTICIPANT)
        .bind(participant.participant_id)
        .bind(participant.event_id)
        .bind(participant.user_id)
        .bind(participant.name)
        .bind(participant.email)
        .bind(participant.participant_type)
        .bind(participant.registered_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LOAD_PARTICIPANT: &str = r#"
SELECT
  participant_id,
  event_id,
  user_id,
  name,
  email,
  participant_type,
  registered_at
FROM participants
WHERE participant_id = ?1
LIMIT 1
"#;

pub async fn load_participant(
    pool: &SqlitePool,
    participant_id: &str,
) -> sqlx::Result<Option<ParticipantsRow>> {
    sqlx::query_as::<_, ParticipantsRow>(SQL_LOAD_PARTICIPANT)
        .bind(participant_id)
        .fetch_optional(pool)
        .await
}

const SQL_LOAD_PARTICIPANT_BY_USER: &str = r#"
SELECT
  participant_id,
  event_id,
  user_id,
  name,
  email,
  participant_type,
  registered_at
FROM participants
WHERE event_id = ?1
  AND user_id = ?2
LIMIT 1
"#;

pub async fn load_participant_by_user(
    pool: &SqlitePool,
    event_id: &str,
    user_id: &str,
) -> sqlx::Result<Option<ParticipantsRow>> {
    sqlx::query_as::<_, ParticipantsRow>(SQL_LOAD_PARTICIPANT_BY_USER)
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

const SQL_LIST_EVENT_PARTICIPANTS: &str = r#"
SELECT
  p.participant_id,
  p.user_id,
  p.name,
  p.email,
  p.participant_type,
  p.registered_at,
  c.checked_in_at,
  c.method AS check_in_method
FROM participants p
LEFT JOIN check_ins c
  ON c.event_id = p.event_id
 AND c.participant_id = p.participant_id
WHERE p.event_id = ?1
ORDER BY p.registered_at ASC, p.participant_id ASC
"#;

pub async fn list_event_participants(
    pool: &SqlitePool,
    event_id: &str,
) -> sqlx::Result<Vec<ParticipantAttendanceRow>> {
    sqlx::query_as::<_, ParticipantAttendanceRow>(SQL_LIST_EVENT_PARTICIPANTS)
        .bind(event_id)
        .fetch_all(pool)
        .await
}
