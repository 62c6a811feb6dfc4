use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;

pub struct ActivityEntry {
    pub user_id: Uuid,
    pub action: &'static str,
    pub subject_type: &'static str,
    pub subject_id: Option<Uuid>,
    pub metadata: Option<Value>,
}

/// Fire-and-forget activity logging. The write happens on a detached task;
/// failures are logged and never reach the caller's response.
pub fn record(pool: PgPool, entry: ActivityEntry) {
    tokio::spawn(async move {
        if let Err(err) = db::insert_activity(&pool, &entry).await {
            tracing::warn!(
                error = ?err,
                action = entry.action,
                "activity log write failed"
            );
        }
    });
}
