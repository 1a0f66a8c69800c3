use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CheckInsRow {
    pub check_in_id: String,
    pub event_id: String,
    pub participant_id: String,
    pub participant_type: String,
    pub token_id: Option<String>,
    pub checked_in_by_user_id: String,
    pub method: String, // qr|manual
    pub checked_in_at: String,
}
