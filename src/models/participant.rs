use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub participant_id: i32,
    pub name: String,
    // Only participants with a paired device carry a token
    pub token: Option<Uuid>,
}

/// Number of rows a participant has in one granularity table.
#[derive(Debug, Clone, Copy, FromRow, Serialize, PartialEq, Eq)]
pub struct ParticipantCount {
    pub participant_id: i32,
    pub count: i64,
}
