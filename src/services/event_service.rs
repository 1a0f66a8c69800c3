use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::database::{events_repo, participants_repo};
use crate::models::{
    format_timestamp, parse_timestamp, EventsRow, ParticipantAttendanceRow, ParticipantType,
    ParticipantsRow,
};

pub const MAX_CHECK_IN_OPENS_MINUTES: i64 = 1440;
const DEFAULT_CHECK_IN_OPENS_MINUTES: i64 = 60;
const MAX_TITLE_LEN: usize = 200;
pub const DEFAULT_EVENTS_PAGE: i64 = 50;
pub const MAX_EVENTS_PAGE: i64 = 200;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("{0}")]
    Validation(String),
    #[error("event not found")]
    NotFound,
    #[error("only the event organizer can do this")]
    Forbidden,
    #[error("user is already registered for this event")]
    AlreadyRegistered,
    #[error("event has been cancelled")]
    Cancelled,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
    pub check_in_opens_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegisterParticipantInput {
    pub name: String,
    pub email: Option<String>,
    pub participant_type: Option<String>,
    /// Links the registration to a signed-in user. Ignored on self-registration,
    /// where the caller's id is used.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListEventsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<EventsRow>,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

fn invalid(message: impl Into<String>) -> EventError {
    EventError::Validation(message.into())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

struct ValidatedEvent {
    title: String,
    description: Option<String>,
    starts_at: String,
    ends_at: String,
    check_in_opens_minutes: i64,
}

fn validate_event(input: &CreateEventInput) -> Result<ValidatedEvent, EventError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(invalid("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(invalid(format!("title is longer than {MAX_TITLE_LEN} characters")));
    }

    let starts_at = parse_timestamp(&input.starts_at)
        .ok_or_else(|| invalid("starts_at must be an RFC 3339 timestamp"))?;
    let ends_at = parse_timestamp(&input.ends_at)
        .ok_or_else(|| invalid("ends_at must be an RFC 3339 timestamp"))?;
    if ends_at <= starts_at {
        return Err(invalid("ends_at must be after starts_at"));
    }

    let check_in_opens_minutes = input
        .check_in_opens_minutes
        .unwrap_or(DEFAULT_CHECK_IN_OPENS_MINUTES);
    if !(0..=MAX_CHECK_IN_OPENS_MINUTES).contains(&check_in_opens_minutes) {
        return Err(invalid(format!(
            "check_in_opens_minutes must be between 0 and {MAX_CHECK_IN_OPENS_MINUTES}"
        )));
    }

    Ok(ValidatedEvent {
        title: title.to_string(),
        description: non_empty(input.description.as_deref()).map(str::to_string),
        starts_at: format_timestamp(starts_at),
        ends_at: format_timestamp(ends_at),
        check_in_opens_minutes,
    })
}

pub async fn create_event(
    pool: &SqlitePool,
    organizer_user_id: &str,
    input: &CreateEventInput,
    now: DateTime<Utc>,
) -> Result<EventsRow, EventError> {
    let event = validate_event(input)?;
    let event_id = Uuid::new_v4().to_string();
    let created_at = format_timestamp(now);

    events_repo::insert_event(
        pool,
        events_repo::NewEvent {
            event_id: &event_id,
            organizer_user_id,
            title: &event.title,
            description: event.description.as_deref(),
            starts_at: &event.starts_at,
            ends_at: &event.ends_at,
            check_in_opens_minutes: event.check_in_opens_minutes,
            created_at: &created_at,
        },
    )
    .await?;

    info!(event_id = %event_id, organizer = %organizer_user_id, "event created");
    events_repo::load_event(pool, &event_id)
        .await?
        .ok_or(EventError::NotFound)
}

pub async fn get_event(pool: &SqlitePool, event_id: &str) -> Result<EventsRow, EventError> {
    events_repo::load_event(pool, event_id)
        .await?
        .ok_or(EventError::NotFound)
}

pub async fn get_managed_event(
    pool: &SqlitePool,
    organizer_user_id: &str,
    event_id: &str,
) -> Result<EventsRow, EventError> {
    let event = get_event(pool, event_id).await?;
    if !event.is_organized_by(organizer_user_id) {
        return Err(EventError::Forbidden);
    }
    Ok(event)
}

fn page_bounds(params: &ListEventsParams) -> Result<(i64, i64), EventError> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENTS_PAGE);
    if !(1..=MAX_EVENTS_PAGE).contains(&limit) {
        return Err(invalid(format!("limit must be between 1 and {MAX_EVENTS_PAGE}")));
    }
    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(invalid("offset must not be negative"));
    }
    Ok((limit, offset))
}

/// One page of the organizer's events, latest start first. One extra row is
/// fetched to tell whether another page follows.
pub async fn list_organizer_events(
    pool: &SqlitePool,
    organizer_user_id: &str,
    params: &ListEventsParams,
) -> Result<EventPage, EventError> {
    let (limit, offset) = page_bounds(params)?;
    let mut events =
        events_repo::list_organizer_events(pool, organizer_user_id, limit + 1, offset).await?;
    let has_more = events.len() as i64 > limit;
    events.truncate(limit as usize);
    Ok(EventPage {
        events,
        limit,
        offset,
        has_more,
    })
}

pub async fn cancel_event(
    pool: &SqlitePool,
    organizer_user_id: &str,
    event_id: &str,
) -> Result<EventsRow, EventError> {
    get_managed_event(pool, organizer_user_id, event_id).await?;
    if events_repo::cancel_event(pool, event_id).await? > 0 {
        info!(event_id = %event_id, "event cancelled");
    }
    get_event(pool, event_id).await
}

/// Registers a participant. The organizer may register anyone with any
/// participant type; any other caller registers themselves as an attendee.
pub async fn register_participant(
    pool: &SqlitePool,
    caller_user_id: &str,
    event_id: &str,
    input: &RegisterParticipantInput,
    now: DateTime<Utc>,
) -> Result<ParticipantsRow, EventError> {
    let event = get_event(pool, event_id).await?;
    if event.is_cancelled() {
        return Err(EventError::Cancelled);
    }

    let name = input.name.trim();
    if name.is_empty() {
        return Err(invalid("name is required"));
    }

    let by_organizer = event.is_organized_by(caller_user_id);
    let (user_id, participant_type) = if by_organizer {
        let participant_type = match non_empty(input.participant_type.as_deref()) {
            Some(raw) => ParticipantType::parse(raw)
                .ok_or_else(|| invalid(format!("unknown participant_type: {raw}")))?,
            None => ParticipantType::Attendee,
        };
        (non_empty(input.user_id.as_deref()), participant_type)
    } else {
        (Some(caller_user_id), ParticipantType::Attendee)
    };

    let participant_id = Uuid::new_v4().to_string();
    let registered_at = format_timestamp(now);
    let inserted = participants_repo::insert_participant(
        pool,
        participants_repo::NewParticipant {
            participant_id: &participant_id,
            event_id,
            user_id,
            name,
            email: non_empty(input.email.as_deref()),
            participant_type: participant_type.as_str(),
            registered_at: &registered_at,
        },
    )
    .await?;
    if inserted == 0 {
        return Err(EventError::AlreadyRegistered);
    }

    info!(
        event_id = %event_id,
        participant_id = %participant_id,
        participant_type = participant_type.as_str(),
        "participant registered"
    );
    participants_repo::load_participant(pool, &participant_id)
        .await?
        .ok_or(EventError::NotFound)
}

pub async fn list_participants(
    pool: &SqlitePool,
    organizer_user_id: &str,
    event_id: &str,
) -> Result<Vec<ParticipantAttendanceRow>, EventError> {
    get_managed_event(pool, organizer_user_id, event_id).await?;
    Ok(participants_repo::list_event_participants(pool, event_id).await?)
}
