use chrono::Utc;
use uuid::Uuid;

/// Generates a time-sortable entity id.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Current wall-clock timestamp, RFC3339, to be stored verbatim.
pub fn now() -> String {
    Utc::now().to_rfc3339()
}
