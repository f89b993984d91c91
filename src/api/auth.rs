// src/api/auth.rs
// Bearer-token session resolution.

use axum::http::HeaderMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::GenerationError;

/// Pull the bearer token out of the request headers, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolve a session token to a user id. Expired and unknown tokens both
/// read as unauthorized.
pub async fn authenticate(
    pool: &PgPool,
    token: Option<&str>,
) -> Result<Uuid, GenerationError> {
    let token = token.ok_or(GenerationError::Unauthorized)?;
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT user_id FROM auth_sessions
         WHERE token = $1 AND expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    row.map(|(user_id,)| user_id)
        .ok_or(GenerationError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_malformed_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc123"),
        );
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(bearer_token(&headers), None);
    }
}
