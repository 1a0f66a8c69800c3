use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use crate::database::attendance_repo::{self, AttendancePlan, AttendanceQuery, Granularity};
use crate::database::events_repo;
use crate::models::{format_timestamp, parse_timestamp, ParticipantType};
use crate::services::check_in_service::{METHOD_MANUAL, METHOD_QR};

pub const MIN_UTC_OFFSET_MINUTES: i32 = -720;
pub const MAX_UTC_OFFSET_MINUTES: i32 = 840;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("event not found")]
    EventNotFound,
    #[error("only the event organizer can read attendance")]
    Forbidden,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Raw query-string parameters of the attendance endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceParams {
    pub granularity: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub participant_type: Option<String>,
    pub method: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceBucket {
    pub bucket: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceReport {
    pub event_id: String,
    pub granularity: Granularity,
    pub utc_offset_minutes: i32,
    pub registered: i64,
    pub checked_in: i64,
    pub attendance_rate: f64,
    pub buckets: Vec<AttendanceBucket>,
}

fn invalid(message: impl Into<String>) -> AttendanceError {
    AttendanceError::InvalidFilter(message.into())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn normalize_bound(name: &str, value: &Option<String>) -> Result<Option<String>, AttendanceError> {
    present(value)
        .map(|raw| {
            parse_timestamp(raw)
                .map(format_timestamp)
                .ok_or_else(|| invalid(format!("{name} must be an RFC 3339 timestamp")))
        })
        .transpose()
}

/// Turns raw parameters into a validated query. Anything not recognized is
/// rejected rather than passed through to SQL.
pub fn parse_params(params: &AttendanceParams) -> Result<AttendanceQuery, AttendanceError> {
    let granularity = match present(&params.granularity) {
        Some(raw) => {
            Granularity::parse(raw).ok_or_else(|| invalid(format!("unknown granularity: {raw}")))?
        }
        None => Granularity::Hour,
    };

    let from = normalize_bound("from", &params.from)?;
    let to = normalize_bound("to", &params.to)?;
    if let (Some(from), Some(to)) = (&from, &to) {
        if from >= to {
            return Err(invalid("from must be before to"));
        }
    }

    let participant_type = present(&params.participant_type)
        .map(|raw| {
            ParticipantType::parse(raw)
                .map(|t| t.as_str().to_string())
                .ok_or_else(|| invalid(format!("unknown participant_type: {raw}")))
        })
        .transpose()?;

    let method = present(&params.method)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            METHOD_QR => Ok(METHOD_QR.to_string()),
            METHOD_MANUAL => Ok(METHOD_MANUAL.to_string()),
            _ => Err(invalid(format!("unknown method: {raw}"))),
        })
        .transpose()?;

    let utc_offset_minutes = params.utc_offset_minutes.unwrap_or(0);
    if !(MIN_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&utc_offset_minutes) {
        return Err(invalid(format!(
            "utc_offset_minutes must be between {MIN_UTC_OFFSET_MINUTES} and {MAX_UTC_OFFSET_MINUTES}"
        )));
    }

    Ok(AttendanceQuery {
        granularity,
        from,
        to,
        participant_type,
        method,
        utc_offset_minutes,
    })
}

pub fn attendance_rate(registered: i64, checked_in: i64) -> f64 {
    if registered <= 0 {
        return 0.0;
    }
    let rate = checked_in as f64 / registered as f64;
    (rate * 10_000.0).round() / 10_000.0
}

pub async fn attendance_report(
    pool: &SqlitePool,
    organizer_user_id: &str,
    event_id: &str,
    params: &AttendanceParams,
) -> Result<AttendanceReport, AttendanceError> {
    let query = parse_params(params)?;

    let Some(event) = events_repo::load_event(pool, event_id).await? else {
        return Err(AttendanceError::EventNotFound);
    };
    if !event.is_organized_by(organizer_user_id) {
        return Err(AttendanceError::Forbidden);
    }

    let plan = AttendancePlan::build(event_id, &query);
    debug!(event_id = %event_id, sql = plan.sql(), "running attendance plan");

    let rows = attendance_repo::run_attendance_plan(pool, &plan).await?;
    let registered =
        attendance_repo::count_registered(pool, event_id, query.participant_type.as_deref())
            .await?;

    let buckets: Vec<AttendanceBucket> = rows
        .into_iter()
        .map(|row| AttendanceBucket {
            bucket: row.bucket.unwrap_or_else(|| "unknown".to_string()),
            count: row.count,
        })
        .collect();
    let checked_in = buckets.iter().map(|b| b.count).sum();

    Ok(AttendanceReport {
        event_id: event.event_id,
        granularity: query.granularity,
        utc_offset_minutes: query.utc_offset_minutes,
        registered,
        checked_in,
        attendance_rate: attendance_rate(registered, checked_in),
        buckets,
    })
}
