use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::activity::{self, ActivityEntry};
use crate::auth;
use crate::db;
use crate::permissions::{self, Permission};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Deserialize)]
pub struct ValidateLocationRequest {
    pub code: String,
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct LocationOutcome {
    pub found: bool,
    pub already_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
}

/// `POST /validate-location`, scavenger-hunt checkpoint validation.
/// Throttled per client address before anything else runs.
pub async fn validate_location(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<ValidateLocationRequest>,
) -> Result<Response, AppError> {
    if !state.limiter.check(&client_key(&headers, addr)) {
        return Err(AppError::RateLimited(
            "Too many attempts, try again shortly".to_string(),
        ));
    }

    let caller = auth::authenticate(&state.pool, &headers).await?;
    let roles = permissions::parse_roles(&db::roles_for_user(&state.pool, caller).await?);
    if !permissions::permits(&roles, Permission::ValidateLocations) {
        return Err(AppError::Forbidden(
            "Location validation requires gate staff access".to_string(),
        ));
    }

    let code = body.code.trim();
    if code.is_empty() {
        return Err(AppError::ValidationError("code must not be empty".to_string()));
    }

    let Some(location) = db::fetch_active_location(&state.pool, code).await? else {
        return Ok(success(
            LocationOutcome {
                found: false,
                already_found: false,
                name: None,
                points: None,
            },
            "No active location matches this code",
        )
        .into_response());
    };

    if db::insert_location_find(&state.pool, location.id, body.user_id).await? {
        activity::record(
            state.pool.clone(),
            ActivityEntry {
                user_id: body.user_id,
                action: "hunt.location_found",
                subject_type: "hunt_location",
                subject_id: Some(location.id),
                metadata: Some(json!({
                    "event_id": location.event_id,
                    "points": location.points,
                })),
            },
        );
        Ok(success(
            LocationOutcome {
                found: true,
                already_found: false,
                name: Some(location.name),
                points: Some(location.points),
            },
            "Location found",
        )
        .into_response())
    } else {
        Ok(success(
            LocationOutcome {
                found: true,
                already_found: true,
                name: Some(location.name),
                points: Some(location.points),
            },
            "Location was already found",
        )
        .into_response())
    }
}

fn client_key(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.168.1.20:55100".parse().unwrap()
    }

    #[test]
    fn forwarded_header_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_the_peer_address() {
        assert_eq!(client_key(&HeaderMap::new(), peer()), "192.168.1.20");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(client_key(&headers, peer()), "192.168.1.20");
    }
}
