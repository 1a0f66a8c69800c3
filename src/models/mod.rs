pub mod check_in_tokens;
pub mod check_ins;
pub mod events;
pub mod participants;

pub use check_in_tokens::CheckInTokensRow;
pub use check_ins::CheckInsRow;
pub use events::EventsRow;
pub use participants::{ParticipantAttendanceRow, ParticipantType, ParticipantsRow};

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as RFC 3339 UTC text with second precision
/// (`2026-10-16T09:30:00Z`), which SQLite's date functions accept and
/// which sorts lexicographically.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
