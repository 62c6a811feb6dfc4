use axum::http::HeaderMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::utils::error::AppError;

/// Resolves the bearer token to a staff user. Missing, unknown, and
/// revoked tokens all map to an authentication error.
pub async fn authenticate(pool: &PgPool, headers: &HeaderMap) -> Result<Uuid, AppError> {
    let token = extract_bearer(headers)
        .ok_or_else(|| AppError::AuthError("missing or malformed bearer token".to_string()))?;

    db::resolve_staff_token(pool, &token)
        .await?
        .ok_or_else(|| AppError::AuthError("invalid or revoked token".to_string()))
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let prefix = "Bearer ";
    if !value.starts_with(prefix) {
        return None;
    }
    let token = value[prefix.len()..].trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(
            extract_bearer(&headers_with("Bearer abc123")),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        assert_eq!(extract_bearer(&headers_with("Basic abc123")), None);
        assert_eq!(extract_bearer(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer(&headers_with("abc123")), None);
    }
}
