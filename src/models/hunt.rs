use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HuntLocation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub name: String,
    pub points: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
