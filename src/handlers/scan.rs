use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::activity::{self, ActivityEntry};
use crate::auth;
use crate::db;
use crate::models::scan_event::{NewScanEvent, ScanResult};
use crate::models::ticket::{TicketDetails, TicketStatus};
use crate::permissions;
use crate::scan::{self, ScanDecision, ScanRejection};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

const SCAN_HISTORY_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct ValidateTicketRequest {
    pub qr_data: String,
    pub scanner_user_id: Option<Uuid>,
    pub device_info: Option<serde_json::Value>,
    pub scan_location: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct ScanResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<ScannedTicket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Serialize)]
pub struct ScannedTicket {
    pub id: Uuid,
    pub attendee_name: String,
    pub attendee_email: String,
    pub tier_name: String,
    pub tier_price: Decimal,
    pub event_title: String,
    pub event_starts_at: DateTime<Utc>,
    pub venue_name: String,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl ScanResponse {
    fn admitted(ticket: ScannedTicket) -> Self {
        Self {
            valid: true,
            ticket: Some(ticket),
            error: None,
            reason: None,
        }
    }

    fn rejected(reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            ticket: None,
            error: Some(message.into()),
            reason: Some(reason),
        }
    }
}

impl ScannedTicket {
    fn from_details(details: TicketDetails, checked_in_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: details.id,
            attendee_name: details.attendee_name,
            attendee_email: details.attendee_email,
            tier_name: details.tier_name,
            tier_price: details.tier_price,
            event_title: details.event_title,
            event_starts_at: details.event_starts_at,
            venue_name: details.venue_name,
            checked_in_at,
        }
    }
}

/// `POST /validate-ticket`
///
/// Every outcome past the permission gate leaves exactly one scan_events
/// row; auth and permission failures short-circuit before any write.
/// Business outcomes are HTTP 200 with `valid`/`reason` in the body.
pub async fn validate_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ValidateTicketRequest>,
) -> Result<Response, AppError> {
    let caller = auth::authenticate(&state.pool, &headers).await?;
    let scanner = body.scanner_user_id.unwrap_or(caller);

    let roles = permissions::parse_roles(&db::roles_for_user(&state.pool, caller).await?);
    let scan_role = permissions::may_scan(&roles);
    if !scan_role && !db::has_any_scanner_grant(&state.pool, caller).await? {
        return Ok(permission_denied());
    }

    let claims = match state.qr.verify(&body.qr_data) {
        Ok(claims) => claims,
        Err(err) => {
            scan::record(
                &state.pool,
                NewScanEvent {
                    ticket_id: None,
                    event_id: None,
                    scanned_by: scanner,
                    scan_result: ScanResult::InvalidQr,
                    device_info: body.device_info,
                    scan_location: body.scan_location,
                },
            )
            .await;
            return Ok(outcome(ScanResponse::rejected("invalid_qr", err.to_string())));
        }
    };

    // A grant-only caller needs the grant for the event named by the QR.
    if !scan_role && !db::has_scanner_grant(&state.pool, caller, claims.event_id).await? {
        return Ok(permission_denied());
    }

    let Some(details) = db::fetch_ticket_details(&state.pool, claims.ticket_id).await? else {
        scan::record(
            &state.pool,
            NewScanEvent {
                ticket_id: Some(claims.ticket_id),
                event_id: Some(claims.event_id),
                scanned_by: scanner,
                scan_result: ScanResult::NotFound,
                device_info: body.device_info,
                scan_location: body.scan_location,
            },
        )
        .await;
        return Ok(outcome(ScanResponse::rejected("not_found", "Ticket not found")));
    };

    let status = TicketStatus::parse(&details.status).ok_or_else(|| {
        AppError::InternalServerError(format!(
            "ticket {} has unrecognized status '{}'",
            details.id, details.status
        ))
    })?;

    match scan::evaluate(details.event_id, status, claims.event_id) {
        ScanDecision::Reject(rejection) => {
            scan::record(
                &state.pool,
                NewScanEvent {
                    ticket_id: Some(claims.ticket_id),
                    event_id: Some(claims.event_id),
                    scanned_by: scanner,
                    scan_result: rejection.scan_result(),
                    device_info: body.device_info,
                    scan_location: body.scan_location,
                },
            )
            .await;
            Ok(outcome(ScanResponse::rejected(
                rejection.reason(),
                rejection.message(),
            )))
        }
        ScanDecision::Admit => {
            match db::mark_ticket_used(&state.pool, claims.ticket_id, scanner).await? {
                Some(ticket) => {
                    scan::record(
                        &state.pool,
                        NewScanEvent {
                            ticket_id: Some(ticket.id),
                            event_id: Some(ticket.event_id),
                            scanned_by: scanner,
                            scan_result: ScanResult::Success,
                            device_info: body.device_info,
                            scan_location: body.scan_location,
                        },
                    )
                    .await;
                    activity::record(
                        state.pool.clone(),
                        ActivityEntry {
                            user_id: scanner,
                            action: "ticket.checked_in",
                            subject_type: "ticket",
                            subject_id: Some(ticket.id),
                            metadata: Some(json!({ "event_id": ticket.event_id })),
                        },
                    );
                    Ok(outcome(ScanResponse::admitted(ScannedTicket::from_details(
                        details,
                        ticket.checked_in_at,
                    ))))
                }
                None => {
                    // Read `valid`, lost the conditional update: another
                    // scanner got there first.
                    let rejection = ScanRejection::AlreadyUsed;
                    scan::record(
                        &state.pool,
                        NewScanEvent {
                            ticket_id: Some(claims.ticket_id),
                            event_id: Some(claims.event_id),
                            scanned_by: scanner,
                            scan_result: rejection.scan_result(),
                            device_info: body.device_info,
                            scan_location: body.scan_location,
                        },
                    )
                    .await;
                    Ok(outcome(ScanResponse::rejected(
                        rejection.reason(),
                        rejection.message(),
                    )))
                }
            }
        }
    }
}

/// `GET /events/:event_id/scans`, recent audit rows for an event,
/// restricted to elevated roles.
pub async fn list_event_scans(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let caller = auth::authenticate(&state.pool, &headers).await?;
    let roles = permissions::parse_roles(&db::roles_for_user(&state.pool, caller).await?);
    if !permissions::is_elevated(&roles) {
        return Err(AppError::Forbidden(
            "Scan history requires an organizer or admin role".to_string(),
        ));
    }

    let scans = db::recent_scans_for_event(&state.pool, event_id, SCAN_HISTORY_LIMIT).await?;
    Ok(success(scans, "Scan history fetched").into_response())
}

fn outcome(response: ScanResponse) -> Response {
    (StatusCode::OK, Json(response)).into_response()
}

fn permission_denied() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ScanResponse::rejected(
            "permission_denied",
            "Caller is not allowed to scan tickets",
        )),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_response_omits_the_ticket_key() {
        let response = ScanResponse::rejected("already_used", "Ticket has already been used");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["reason"], "already_used");
        assert_eq!(json["error"], "Ticket has already been used");
        assert!(json.get("ticket").is_none());
    }

    #[test]
    fn admitted_response_omits_error_and_reason() {
        let now = Utc::now();
        let response = ScanResponse::admitted(ScannedTicket {
            id: Uuid::new_v4(),
            attendee_name: "Ada".to_string(),
            attendee_email: "ada@example.com".to_string(),
            tier_name: "General".to_string(),
            tier_price: Decimal::new(2500, 2),
            event_title: "Launch Night".to_string(),
            event_starts_at: now,
            venue_name: "Main Hall".to_string(),
            checked_in_at: Some(now),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["ticket"]["tier_name"], "General");
        assert!(json.get("error").is_none());
        assert!(json.get("reason").is_none());
    }
}
