use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CheckInTokensRow {
    pub token_id: String,
    pub event_id: String,
    pub participant_id: Option<String>,
    pub issued_by_user_id: String,
    pub issued_at: String,
    pub expires_at: String,
    pub revoked_at: Option<String>,
}

impl CheckInTokensRow {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}
