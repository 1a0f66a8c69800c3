//! The check-in ledger.
//!
//! A scan goes: verify token → load event → resolve participant → authorize
//! → insert. The insert relies on `UNIQUE (event_id, participant_id)`, so
//! repeated or concurrent scans for the same participant resolve to a
//! single row and later attempts report the existing check-in.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{check_ins_repo, events_repo, participants_repo};
use crate::models::{format_timestamp, parse_timestamp, CheckInsRow, EventsRow, ParticipantsRow};
use crate::services::token_service::{self, TokenError};

pub const METHOD_QR: &str = "qr";
pub const METHOD_MANUAL: &str = "manual";

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("event not found")]
    EventNotFound,
    #[error("participant not found")]
    ParticipantNotFound,
    #[error("you are not registered for this event")]
    NotRegistered,
    #[error("not allowed to check in this participant")]
    Forbidden,
    #[error("event has been cancelled")]
    EventCancelled,
    #[error("check-in is open from {opens_at} until {closes_at}")]
    OutsideWindow { opens_at: String, closes_at: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckInOutcome {
    CheckedIn { check_in: CheckInsRow },
    AlreadyCheckedIn { check_in: CheckInsRow },
}

impl CheckInOutcome {
    pub fn check_in(&self) -> &CheckInsRow {
        match self {
            CheckInOutcome::CheckedIn { check_in } | CheckInOutcome::AlreadyCheckedIn { check_in } => {
                check_in
            }
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, CheckInOutcome::CheckedIn { .. })
    }
}

/// What a scanner sees before submitting: which event a token belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPreview {
    pub event_id: String,
    pub event_title: String,
    pub starts_at: String,
    pub ends_at: String,
    pub participant_name: Option<String>,
}

/// `[starts_at - check_in_opens_minutes, ends_at]`, inclusive on both ends.
pub fn check_in_window(event: &EventsRow) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let starts_at = parse_timestamp(&event.starts_at)?;
    let ends_at = parse_timestamp(&event.ends_at)?;
    Some((
        starts_at - Duration::minutes(event.check_in_opens_minutes),
        ends_at,
    ))
}

fn ensure_open(event: &EventsRow, now: DateTime<Utc>) -> Result<(), CheckInError> {
    if event.is_cancelled() {
        return Err(CheckInError::EventCancelled);
    }
    let Some((opens_at, closes_at)) = check_in_window(event) else {
        // Stored timestamps are written by this service; treat corruption as closed.
        return Err(CheckInError::OutsideWindow {
            opens_at: event.starts_at.clone(),
            closes_at: event.ends_at.clone(),
        });
    };
    if now < opens_at || now > closes_at {
        return Err(CheckInError::OutsideWindow {
            opens_at: format_timestamp(opens_at),
            closes_at: format_timestamp(closes_at),
        });
    }
    Ok(())
}

async fn load_event(pool: &SqlitePool, event_id: &str) -> Result<EventsRow, CheckInError> {
    events_repo::load_event(pool, event_id)
        .await?
        .ok_or(CheckInError::EventNotFound)
}

async fn load_event_participant(
    pool: &SqlitePool,
    event_id: &str,
    participant_id: &str,
) -> Result<ParticipantsRow, CheckInError> {
    match participants_repo::load_participant(pool, participant_id).await? {
        Some(p) if p.event_id == event_id => Ok(p),
        _ => Err(CheckInError::ParticipantNotFound),
    }
}

struct LedgerEntry<'a> {
    event: &'a EventsRow,
    participant: &'a ParticipantsRow,
    token_id: Option<&'a str>,
    actor_user_id: &'a str,
    method: &'a str,
    now: DateTime<Utc>,
}

async fn record(pool: &SqlitePool, entry: LedgerEntry<'_>) -> Result<CheckInOutcome, CheckInError> {
    let row = CheckInsRow {
        check_in_id: Uuid::new_v4().to_string(),
        event_id: entry.event.event_id.clone(),
        participant_id: entry.participant.participant_id.clone(),
        participant_type: entry.participant.participant_type.clone(),
        token_id: entry.token_id.map(str::to_string),
        checked_in_by_user_id: entry.actor_user_id.to_string(),
        method: entry.method.to_string(),
        checked_in_at: format_timestamp(entry.now),
    };

    // A second pass covers an undo landing between a conflicting insert and
    // the reload of the row it conflicted with.
    for _ in 0..2 {
        let inserted = check_ins_repo::insert_check_in(
            pool,
            check_ins_repo::NewCheckIn {
                check_in_id: &row.check_in_id,
                event_id: &row.event_id,
                participant_id: &row.participant_id,
                participant_type: &row.participant_type,
                token_id: row.token_id.as_deref(),
                checked_in_by_user_id: &row.checked_in_by_user_id,
                method: &row.method,
                checked_in_at: &row.checked_in_at,
            },
        )
        .await?;

        if inserted > 0 {
            info!(
                event_id = %row.event_id,
                participant_id = %row.participant_id,
                method = %row.method,
                "participant checked in"
            );
            return Ok(CheckInOutcome::CheckedIn { check_in: row });
        }

        if let Some(existing) =
            check_ins_repo::load_check_in(pool, &row.event_id, &row.participant_id).await?
        {
            debug!(
                event_id = %row.event_id,
                participant_id = %row.participant_id,
                "duplicate check-in ignored"
            );
            return Ok(CheckInOutcome::AlreadyCheckedIn { check_in: existing });
        }
    }

    Err(CheckInError::ParticipantNotFound)
}

/// Redeems a scanned QR token.
///
/// Personal tokens (carrying a participant id) check in that participant and
/// may be presented by the participant or by the event organizer's scanner.
/// Event-wide tokens check in the caller's own registration.
pub async fn check_in(
    pool: &SqlitePool,
    config: &Config,
    caller_user_id: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome, CheckInError> {
    let verified = token_service::verify_token(pool, config, token, now).await?;
    let event = load_event(pool, verified.event_id()).await?;
    ensure_open(&event, now)?;

    let participant = match verified.participant_id() {
        Some(participant_id) => {
            let participant = load_event_participant(pool, &event.event_id, participant_id).await?;
            let is_self = participant.user_id.as_deref() == Some(caller_user_id);
            if !is_self && !event.is_organized_by(caller_user_id) {
                return Err(CheckInError::Forbidden);
            }
            participant
        }
        None => participants_repo::load_participant_by_user(pool, &event.event_id, caller_user_id)
            .await?
            .ok_or(CheckInError::NotRegistered)?,
    };

    record(
        pool,
        LedgerEntry {
            event: &event,
            participant: &participant,
            token_id: Some(&verified.record.token_id),
            actor_user_id: caller_user_id,
            method: METHOD_QR,
            now,
        },
    )
    .await
}

/// Organizer-driven check-in without a token (front desk, lost phone).
pub async fn manual_check_in(
    pool: &SqlitePool,
    organizer_user_id: &str,
    event_id: &str,
    participant_id: &str,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome, CheckInError> {
    let event = load_event(pool, event_id).await?;
    if !event.is_organized_by(organizer_user_id) {
        return Err(CheckInError::Forbidden);
    }
    ensure_open(&event, now)?;
    let participant = load_event_participant(pool, event_id, participant_id).await?;

    record(
        pool,
        LedgerEntry {
            event: &event,
            participant: &participant,
            token_id: None,
            actor_user_id: organizer_user_id,
            method: METHOD_MANUAL,
            now,
        },
    )
    .await
}

pub async fn undo_check_in(
    pool: &SqlitePool,
    organizer_user_id: &str,
    event_id: &str,
    participant_id: &str,
) -> Result<(), CheckInError> {
    let event = load_event(pool, event_id).await?;
    if !event.is_organized_by(organizer_user_id) {
        return Err(CheckInError::Forbidden);
    }
    let removed = check_ins_repo::delete_check_in(pool, event_id, participant_id).await?;
    if removed == 0 {
        return Err(CheckInError::ParticipantNotFound);
    }
    info!(event_id = %event_id, participant_id = %participant_id, "check-in undone");
    Ok(())
}

pub async fn preview_token(
    pool: &SqlitePool,
    config: &Config,
    token: &str,
    now: DateTime<Utc>,
) -> Result<TokenPreview, CheckInError> {
    let verified = token_service::verify_token(pool, config, token, now).await?;
    let event = load_event(pool, verified.event_id()).await?;
    let participant_name = match verified.participant_id() {
        Some(participant_id) => participants_repo::load_participant(pool, participant_id)
            .await?
            .map(|p| p.name),
        None => None,
    };

    Ok(TokenPreview {
        event_id: event.event_id,
        event_title: event.title,
        starts_at: event.starts_at,
        ends_at: event.ends_at,
        participant_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn event(status: &str) -> EventsRow {
        EventsRow {
            event_id: "ev-1".to_string(),
            organizer_user_id: "org-1".to_string(),
            title: "RustConf meetup".to_string(),
            description: None,
            starts_at: "2026-10-16T18:00:00Z".to_string(),
            ends_at: "2026-10-16T21:00:00Z".to_string(),
            check_in_opens_minutes: 30,
            status: status.to_string(),
            created_at: "2026-10-01T00:00:00Z".to_string(),
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap()
    }

    #[rstest]
    #[case(at(17, 30), true)]
    #[case(at(17, 29), false)]
    #[case(at(19, 0), true)]
    #[case(at(21, 0), true)]
    #[case(at(21, 1), false)]
    fn window_opens_before_start_and_closes_at_end(
        #[case] now: DateTime<Utc>,
        #[case] open: bool,
    ) {
        assert_eq!(ensure_open(&event("published"), now).is_ok(), open);
    }

    #[test]
    fn cancelled_events_are_closed() {
        assert!(matches!(
            ensure_open(&event("cancelled"), at(19, 0)),
            Err(CheckInError::EventCancelled)
        ));
    }

    #[test]
    fn outside_window_reports_bounds() {
        let err = ensure_open(&event("published"), at(12, 0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "check-in is open from 2026-10-16T17:30:00Z until 2026-10-16T21:00:00Z"
        );
    }
}
