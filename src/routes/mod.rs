use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_response_headers_layer};
use crate::handlers::{health_check, hunt, scan, screening};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/validate-ticket", post(scan::validate_ticket))
        .route("/validate-location", post(hunt::validate_location))
        .route("/events/:event_id/scans", get(scan::list_event_scans))
        .route(
            "/screening/submissions",
            post(screening::create_submission).get(screening::list_submissions),
        )
        .route(
            "/screening/submissions/:id/review",
            post(screening::review_submission),
        )
        .layer(TraceLayer::new_for_http())
        .layer(create_response_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
