use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::ActivityEntry;
use crate::models::hunt::HuntLocation;
use crate::models::scan_event::{NewScanEvent, ScanEvent};
use crate::models::submission::{ReviewDecision, Submission};
use crate::models::ticket::{Ticket, TicketDetails};

const SUBMISSION_COLUMNS: &str = "id, event_id, artist_name, email, portfolio_url, statement, \
     status, submitted_at, decided_at, decided_by, decision_note";

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub async fn resolve_staff_token(pool: &PgPool, token: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM staff_tokens WHERE token = $1 AND revoked_at IS NULL",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn roles_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT role FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn has_any_scanner_grant(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM scanner_grants WHERE user_id = $1)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn has_scanner_grant(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM scanner_grants WHERE user_id = $1 AND event_id = $2)",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_one(pool)
    .await
}

pub async fn event_exists(pool: &PgPool, event_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
        .bind(event_id)
        .fetch_one(pool)
        .await
}

pub async fn fetch_ticket_details(
    pool: &PgPool,
    ticket_id: Uuid,
) -> Result<Option<TicketDetails>, sqlx::Error> {
    sqlx::query_as::<_, TicketDetails>(
        "SELECT t.id, t.event_id, t.status, t.attendee_name, t.attendee_email, \
                t.checked_in_at, \
                tt.name AS tier_name, tt.price AS tier_price, \
                e.title AS event_title, e.starts_at AS event_starts_at, \
                v.name AS venue_name \
         FROM tickets t \
         JOIN ticket_tiers tt ON tt.id = t.tier_id \
         JOIN events e ON e.id = t.event_id \
         JOIN venues v ON v.id = e.venue_id \
         WHERE t.id = $1",
    )
    .bind(ticket_id)
    .fetch_optional(pool)
    .await
}

/// The check-in write. The `status = 'valid'` predicate is the
/// compare-and-swap: of N concurrent scans of one valid ticket, exactly one
/// update matches and returns the row; the rest see `None` and report
/// `already_used`. `checked_in_at` is stamped once and never overwritten.
pub async fn mark_ticket_used(
    pool: &PgPool,
    ticket_id: Uuid,
    scanner_id: Uuid,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        "UPDATE tickets \
         SET status = 'used', checked_in_at = now(), checked_in_by = $2, updated_at = now() \
         WHERE id = $1 AND status = 'valid' \
         RETURNING id, event_id, tier_id, attendee_name, attendee_email, status, \
                   checked_in_at, checked_in_by, created_at, updated_at",
    )
    .bind(ticket_id)
    .bind(scanner_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_scan_event(pool: &PgPool, entry: &NewScanEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scan_events \
             (ticket_id, event_id, scanned_by, scan_result, device_info, scan_location) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.ticket_id)
    .bind(entry.event_id)
    .bind(entry.scanned_by)
    .bind(entry.scan_result.as_str())
    .bind(entry.device_info.as_ref())
    .bind(entry.scan_location.as_ref())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recent_scans_for_event(
    pool: &PgPool,
    event_id: Uuid,
    limit: i64,
) -> Result<Vec<ScanEvent>, sqlx::Error> {
    sqlx::query_as::<_, ScanEvent>(
        "SELECT id, ticket_id, event_id, scanned_by, scan_result, \
                device_info, scan_location, created_at \
         FROM scan_events \
         WHERE event_id = $1 \
         ORDER BY created_at DESC \
         LIMIT $2",
    )
    .bind(event_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn insert_activity(pool: &PgPool, entry: &ActivityEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_log (user_id, action, subject_type, subject_id, metadata) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.subject_type)
    .bind(entry.subject_id)
    .bind(entry.metadata.as_ref())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_active_location(
    pool: &PgPool,
    code: &str,
) -> Result<Option<HuntLocation>, sqlx::Error> {
    sqlx::query_as::<_, HuntLocation>(
        "SELECT id, event_id, code, name, points, active, created_at \
         FROM hunt_locations \
         WHERE code = $1 AND active = TRUE",
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Returns false when the (location, user) pair already exists; the unique
/// primary key resolves racing first-find claims.
pub async fn insert_location_find(
    pool: &PgPool,
    location_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT INTO location_finds (location_id, user_id) VALUES ($1, $2)")
        .bind(location_id)
        .bind(user_id)
        .execute(pool)
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err),
    }
}

pub async fn find_live_submission(
    pool: &PgPool,
    event_id: Uuid,
    email: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM submissions \
         WHERE event_id = $1 AND lower(email) = lower($2) AND status <> 'rejected'",
    )
    .bind(event_id)
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn insert_submission(
    pool: &PgPool,
    event_id: Uuid,
    artist_name: &str,
    email: &str,
    portfolio_url: Option<&str>,
    statement: Option<&str>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (event_id, artist_name, email, portfolio_url, statement) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(event_id)
    .bind(artist_name)
    .bind(email)
    .bind(portfolio_url)
    .bind(statement)
    .fetch_one(pool)
    .await
}

pub async fn list_submissions(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions \
         WHERE event_id = $1 ORDER BY submitted_at ASC"
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_submission(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// `pending` is the only reviewable state; the predicate makes a repeated
/// review lose the race instead of overwriting the first verdict.
pub async fn decide_submission(
    pool: &PgPool,
    id: Uuid,
    decision: ReviewDecision,
    reviewer_id: Uuid,
    note: Option<&str>,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions \
         SET status = $2, decided_at = now(), decided_by = $3, decision_note = $4 \
         WHERE id = $1 AND status = 'pending' \
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(id)
    .bind(decision.target_status().as_str())
    .bind(reviewer_id)
    .bind(note)
    .fetch_optional(pool)
    .await
}
