use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hour,
    Day,
    ParticipantType,
}

impl Granularity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hour" => Some(Granularity::Hour),
            "day" => Some(Granularity::Day),
            "participant_type" => Some(Granularity::ParticipantType),
            _ => None,
        }
    }

    // Fixed SQL fragments; the only placeholder is the date modifier for
    // the UTC offset, which time buckets consume and type buckets do not.
    fn bucket_expr(self) -> &'static str {
        match self {
            Granularity::Hour => "strftime('%Y-%m-%dT%H:00', c.checked_in_at, ?)",
            Granularity::Day => "strftime('%Y-%m-%d', c.checked_in_at, ?)",
            Granularity::ParticipantType => "c.participant_type",
        }
    }

    fn binds_offset(self) -> bool {
        !matches!(self, Granularity::ParticipantType)
    }
}

/// Validated aggregation request. Timestamps must already be normalized to
/// the stored RFC 3339 UTC form so that text comparison orders correctly.
#[derive(Debug, Clone)]
pub struct AttendanceQuery {
    pub granularity: Granularity,
    pub from: Option<String>,
    pub to: Option<String>,
    pub participant_type: Option<String>,
    pub method: Option<String>,
    pub utc_offset_minutes: i32,
}

/// SQL text plus positional binds, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendancePlan {
    sql: String,
    binds: Vec<String>,
}

impl AttendancePlan {
    pub fn build(event_id: &str, query: &AttendanceQuery) -> Self {
        let mut binds = Vec::new();
        let mut sql = String::from("SELECT ");
        sql.push_str(query.granularity.bucket_expr());
        sql.push_str(" AS bucket, COUNT(*) AS count\nFROM check_ins c\nWHERE c.event_id = ?");

        if query.granularity.binds_offset() {
            binds.push(offset_modifier(query.utc_offset_minutes));
        }
        binds.push(event_id.to_string());

        let predicates: [(&str, &Option<String>); 4] = [
            ("c.checked_in_at >= ?", &query.from),
            ("c.checked_in_at < ?", &query.to),
            ("c.participant_type = ?", &query.participant_type),
            ("c.method = ?", &query.method),
        ];
        for (fragment, value) in predicates {
            if let Some(value) = value {
                sql.push_str("\n  AND ");
                sql.push_str(fragment);
                binds.push(value.clone());
            }
        }

        sql.push_str("\nGROUP BY bucket\nORDER BY bucket ASC");
        Self { sql, binds }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[String] {
        &self.binds
    }
}

fn offset_modifier(minutes: i32) -> String {
    format!("{:+} minutes", minutes)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceBucketRow {
    pub bucket: Option<String>,
    pub count: i64,
}

pub async fn run_attendance_plan(
    pool: &SqlitePool,
    plan: &AttendancePlan,
) -> sqlx::Result<Vec<AttendanceBucketRow>> {
    let mut query = sqlx::query_as::<_, AttendanceBucketRow>(plan.sql());
    for value in plan.binds() {
        query = query.bind(value.clone());
    }
    query.fetch_all(pool).await
}

const SQL_COUNT_REGISTERED: &str = r#"
SELECT COUNT(*)
FROM participants
WHERE event_id = ?1
  AND (?2 IS NULL OR participant_type = ?2)
"#;

pub async fn count_registered(
    pool: &SqlitePool,
    event_id: &str,
    participant_type: Option<&str>,
) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(SQL_COUNT_REGISTERED)
        .bind(event_id)
        .bind(participant_type)
        .fetch_one(pool)
        .await
}
