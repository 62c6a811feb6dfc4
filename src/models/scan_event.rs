use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Outcome classification of one scan attempt. The string form is stored
/// in `scan_events.scan_result` and, for rejections, returned as the
/// response `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanResult {
    InvalidQr,
    NotFound,
    EventMismatch,
    AlreadyUsed,
    Refunded,
    Cancelled,
    Success,
}

impl ScanResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanResult::InvalidQr => "invalid_qr",
            ScanResult::NotFound => "not_found",
            ScanResult::EventMismatch => "event_mismatch",
            ScanResult::AlreadyUsed => "already_used",
            ScanResult::Refunded => "refunded",
            ScanResult::Cancelled => "cancelled",
            ScanResult::Success => "success",
        }
    }
}

/// One row of the append-only scan audit trail.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScanEvent {
    pub id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub scanned_by: Uuid,
    pub scan_result: String,
    pub device_info: Option<Value>,
    pub scan_location: Option<Value>,
    pub created_at: DateTime<Utc>,
}

pub struct NewScanEvent {
    pub ticket_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub scanned_by: Uuid,
    pub scan_result: ScanResult,
    pub device_info: Option<Value>,
    pub scan_location: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_strings_match_wire_reasons() {
        assert_eq!(ScanResult::InvalidQr.as_str(), "invalid_qr");
        assert_eq!(ScanResult::EventMismatch.as_str(), "event_mismatch");
        assert_eq!(ScanResult::Success.as_str(), "success");
    }

    #[test]
    fn test_result_serializes_to_snake_case() {
        let json = serde_json::to_string(&ScanResult::AlreadyUsed).unwrap();
        assert_eq!(json, "\"already_used\"");
    }
}
