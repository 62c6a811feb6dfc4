use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a ticket. `valid -> used` is the only writable transition;
/// the other states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Valid,
    Used,
    Refunded,
    Cancelled,
}

impl TicketStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "valid" => Some(TicketStatus::Valid),
            "used" => Some(TicketStatus::Used),
            "refunded" => Some(TicketStatus::Refunded),
            "cancelled" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "used",
            TicketStatus::Refunded => "refunded",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub tier_id: Uuid,
    pub attendee_name: String,
    pub attendee_email: String,
    pub status: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ticket joined with the tier/event/venue metadata shown to the scanner.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketDetails {
    pub id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub tier_name: String,
    pub tier_price: Decimal,
    pub event_title: String,
    pub event_starts_at: DateTime<Utc>,
    pub venue_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TicketStatus::Valid,
            TicketStatus::Used,
            TicketStatus::Refunded,
            TicketStatus::Cancelled,
        ] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert_eq!(TicketStatus::parse("VALID"), None);
        assert_eq!(TicketStatus::parse("expired"), None);
        assert_eq!(TicketStatus::parse(""), None);
    }
}
