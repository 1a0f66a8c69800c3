use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventsRow {
    pub event_id: String,
    pub organizer_user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
    pub check_in_opens_minutes: i64,
    pub status: String, // published|cancelled
    pub created_at: String,
}

impl EventsRow {
    pub fn is_cancelled(&self) -> bool {
        self.status == "cancelled"
    }

    pub fn is_organized_by(&self, user_id: &str) -> bool {
        self.organizer_user_id == user_id
    }
}
