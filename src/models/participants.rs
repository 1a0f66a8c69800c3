use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ParticipantsRow {
    pub participant_id: String,
    pub event_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub participant_type: String,
    pub registered_at: String,
}

// Participant row joined with its check-in, if any.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ParticipantAttendanceRow {
    pub participant_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub participant_type: String,
    pub registered_at: String,
    pub checked_in_at: Option<String>,
    pub check_in_method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantType {
    Attendee,
    Speaker,
    Vip,
    Staff,
}

impl ParticipantType {
    pub const ALL: [ParticipantType; 4] = [
        ParticipantType::Attendee,
        ParticipantType::Speaker,
        ParticipantType::Vip,
        ParticipantType::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantType::Attendee => "attendee",
            ParticipantType::Speaker => "speaker",
            ParticipantType::Vip => "vip",
            ParticipantType::Staff => "staff",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }
}
