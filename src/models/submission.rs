use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" => Some(SubmissionStatus::Approved),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

/// A reviewer's verdict on a pending submission. Parsing rejects anything
/// that is not an explicit approve/reject, `pending` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "approved" => Some(ReviewDecision::Approved),
            "rejected" => Some(ReviewDecision::Rejected),
            _ => None,
        }
    }

    pub fn target_status(&self) -> SubmissionStatus {
        match self {
            ReviewDecision::Approved => SubmissionStatus::Approved,
            ReviewDecision::Rejected => SubmissionStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub event_id: Uuid,
    pub artist_name: String,
    pub email: String,
    pub portfolio_url: Option<String>,
    pub statement: Option<String>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub decision_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parse_accepts_verdicts_only() {
        assert_eq!(ReviewDecision::parse("approved"), Some(ReviewDecision::Approved));
        assert_eq!(ReviewDecision::parse(" Rejected "), Some(ReviewDecision::Rejected));
        assert_eq!(ReviewDecision::parse("pending"), None);
        assert_eq!(ReviewDecision::parse(""), None);
    }

    #[test]
    fn test_decision_maps_to_terminal_status() {
        assert_eq!(
            ReviewDecision::Approved.target_status(),
            SubmissionStatus::Approved
        );
        assert_eq!(
            ReviewDecision::Rejected.target_status(),
            SubmissionStatus::Rejected
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()), Some(status));
        }
    }
}
