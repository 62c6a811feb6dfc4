use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::scan_event::{NewScanEvent, ScanResult};
use crate::models::ticket::TicketStatus;

/// Outcome of the check-in state machine for a looked-up ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDecision {
    Admit,
    Reject(ScanRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRejection {
    EventMismatch,
    AlreadyUsed,
    Refunded,
    Cancelled,
}

/// Decides whether a scan is admitted. The event binding is checked before
/// the status: a QR presented at the wrong event must report
/// `event_mismatch` even when the ticket is otherwise valid.
pub fn evaluate(
    stored_event_id: Uuid,
    status: TicketStatus,
    presented_event_id: Uuid,
) -> ScanDecision {
    if stored_event_id != presented_event_id {
        return ScanDecision::Reject(ScanRejection::EventMismatch);
    }
    match status {
        TicketStatus::Valid => ScanDecision::Admit,
        TicketStatus::Used => ScanDecision::Reject(ScanRejection::AlreadyUsed),
        TicketStatus::Refunded => ScanDecision::Reject(ScanRejection::Refunded),
        TicketStatus::Cancelled => ScanDecision::Reject(ScanRejection::Cancelled),
    }
}

impl ScanRejection {
    pub fn scan_result(&self) -> ScanResult {
        match self {
            ScanRejection::EventMismatch => ScanResult::EventMismatch,
            ScanRejection::AlreadyUsed => ScanResult::AlreadyUsed,
            ScanRejection::Refunded => ScanResult::Refunded,
            ScanRejection::Cancelled => ScanResult::Cancelled,
        }
    }

    pub fn reason(&self) -> &'static str {
        self.scan_result().as_str()
    }

    pub fn message(&self) -> &'static str {
        match self {
            ScanRejection::EventMismatch => "Ticket belongs to a different event",
            ScanRejection::AlreadyUsed => "Ticket has already been used",
            ScanRejection::Refunded => "Ticket was refunded",
            ScanRejection::Cancelled => "Ticket was cancelled",
        }
    }
}

/// Appends one audit row for a scan attempt. Audit completeness matters,
/// but a failed insert must not turn a decided scan into a 500: the error
/// is logged and swallowed.
pub async fn record(pool: &PgPool, entry: NewScanEvent) {
    if let Err(err) = db::insert_scan_event(pool, &entry).await {
        tracing::error!(
            error = ?err,
            scan_result = entry.scan_result.as_str(),
            "failed to record scan event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn valid_ticket_at_its_event_is_admitted() {
        let (event, _) = ids();
        assert_eq!(
            evaluate(event, TicketStatus::Valid, event),
            ScanDecision::Admit
        );
    }

    #[test]
    fn event_mismatch_wins_over_status() {
        let (stored, presented) = ids();
        for status in [
            TicketStatus::Valid,
            TicketStatus::Used,
            TicketStatus::Refunded,
            TicketStatus::Cancelled,
        ] {
            assert_eq!(
                evaluate(stored, status, presented),
                ScanDecision::Reject(ScanRejection::EventMismatch)
            );
        }
    }

    #[test]
    fn terminal_statuses_reject_with_distinct_reasons() {
        let (event, _) = ids();
        assert_eq!(
            evaluate(event, TicketStatus::Used, event),
            ScanDecision::Reject(ScanRejection::AlreadyUsed)
        );
        assert_eq!(
            evaluate(event, TicketStatus::Refunded, event),
            ScanDecision::Reject(ScanRejection::Refunded)
        );
        assert_eq!(
            evaluate(event, TicketStatus::Cancelled, event),
            ScanDecision::Reject(ScanRejection::Cancelled)
        );
    }

    #[test]
    fn rejection_reasons_match_audit_results() {
        assert_eq!(ScanRejection::EventMismatch.reason(), "event_mismatch");
        assert_eq!(ScanRejection::AlreadyUsed.reason(), "already_used");
        assert_eq!(ScanRejection::Refunded.reason(), "refunded");
        assert_eq!(ScanRejection::Cancelled.reason(), "cancelled");
    }
}
