use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::activity::{self, ActivityEntry};
use crate::auth;
use crate::db;
use crate::models::submission::ReviewDecision;
use crate::permissions::{self, Permission};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct NewSubmissionRequest {
    pub event_id: Uuid,
    pub artist_name: String,
    pub email: String,
    pub portfolio_url: Option<String>,
    pub statement: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmissionQuery {
    pub event_id: Uuid,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub decision: String,
    pub note: Option<String>,
}

/// `POST /screening/submissions`, the public entry point for artists.
/// One live submission per (event, email); a rejected artist may resubmit.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(body): Json<NewSubmissionRequest>,
) -> Result<Response, AppError> {
    let artist_name = body.artist_name.trim();
    if artist_name.is_empty() {
        return Err(AppError::ValidationError(
            "artist_name must not be empty".to_string(),
        ));
    }
    let email = body.email.trim();
    if !is_plausible_email(email) {
        return Err(AppError::ValidationError("email is not valid".to_string()));
    }
    let portfolio_url = normalize_optional(&body.portfolio_url);
    if let Some(url) = portfolio_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::ValidationError(
                "portfolio_url must be an http(s) URL".to_string(),
            ));
        }
    }
    let statement = normalize_optional(&body.statement);

    if !db::event_exists(&state.pool, body.event_id).await? {
        return Err(AppError::NotFound(format!(
            "Event with id '{}' was not found",
            body.event_id
        )));
    }

    if db::find_live_submission(&state.pool, body.event_id, email)
        .await?
        .is_some()
    {
        return Err(duplicate_submission());
    }

    let result = db::insert_submission(
        &state.pool,
        body.event_id,
        artist_name,
        email,
        portfolio_url,
        statement,
    )
    .await;

    match result {
        Ok(submission) => Ok(created(submission, "Submission received").into_response()),
        // Racing duplicate caught by the partial unique index.
        Err(err) if db::is_unique_violation(&err) => Err(duplicate_submission()),
        Err(err) => Err(err.into()),
    }
}

/// `GET /screening/submissions?event_id=`, the reviewer-gated listing.
/// Ordering is submission time; scoring and ranking happen outside this
/// service.
pub async fn list_submissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SubmissionQuery>,
) -> Result<Response, AppError> {
    require_reviewer(&state, &headers).await?;

    let submissions = db::list_submissions(&state.pool, query.event_id).await?;
    Ok(success(submissions, "Submissions fetched").into_response())
}

/// `POST /screening/submissions/:id/review`. `pending` is the only
/// reviewable state; a second verdict gets a conflict, not an overwrite.
pub async fn review_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ReviewRequest>,
) -> Result<Response, AppError> {
    let caller = require_reviewer(&state, &headers).await?;

    let decision = ReviewDecision::parse(&body.decision).ok_or_else(|| {
        AppError::ValidationError("decision must be 'approved' or 'rejected'".to_string())
    })?;
    let note = normalize_optional(&body.note);

    match db::decide_submission(&state.pool, id, decision, caller, note).await? {
        Some(submission) => {
            activity::record(
                state.pool.clone(),
                ActivityEntry {
                    user_id: caller,
                    action: "submission.reviewed",
                    subject_type: "submission",
                    subject_id: Some(submission.id),
                    metadata: Some(json!({ "decision": submission.status })),
                },
            );
            Ok(success(submission, "Submission reviewed").into_response())
        }
        None => match db::fetch_submission(&state.pool, id).await? {
            Some(_) => Err(AppError::Conflict(
                "Submission has already been decided".to_string(),
            )),
            None => Err(AppError::NotFound(format!(
                "Submission with id '{id}' was not found"
            ))),
        },
    }
}

async fn require_reviewer(state: &AppState, headers: &HeaderMap) -> Result<Uuid, AppError> {
    let caller = auth::authenticate(&state.pool, headers).await?;
    let roles = permissions::parse_roles(&db::roles_for_user(&state.pool, caller).await?);
    if !permissions::permits(&roles, Permission::ReviewSubmissions) {
        return Err(AppError::Forbidden(
            "Screening requires a reviewer role".to_string(),
        ));
    }
    Ok(caller)
}

fn duplicate_submission() -> AppError {
    AppError::Conflict("A submission for this event and email is already on file".to_string())
}

fn normalize_optional(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausible_emails_pass() {
        assert!(is_plausible_email("artist@example.com"));
        assert!(is_plausible_email("a.b@studio.co.uk"));
    }

    #[test]
    fn implausible_emails_fail() {
        assert!(!is_plausible_email(""));
        assert!(!is_plausible_email("artist"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("artist@nodot"));
        assert!(!is_plausible_email("artist@.com"));
        assert!(!is_plausible_email("artist@example."));
    }

    #[test]
    fn optional_fields_are_trimmed_to_none() {
        assert_eq!(normalize_optional(&None), None);
        assert_eq!(normalize_optional(&Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional(&Some(" https://a.example ".to_string())),
            Some("https://a.example")
        );
    }
}
