// Session identification: the page generates a UUID once per browser tab and
// sends it with every API call.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .ok_or_else(|| reject(format!("Missing {} header", SESSION_HEADER)))?;

        Uuid::parse_str(raw)
            .map(SessionId)
            .map_err(|_| reject(format!("Invalid {} header", SESSION_HEADER)))
    }
}

fn reject(message: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<SessionId, StatusCode> {
        let mut builder = Request::builder().uri("/api/history");
        if let Some(value) = header {
            builder = builder.header(SESSION_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        SessionId::from_request_parts(&mut parts, &())
            .await
            .map_err(|(status, _)| status)
    }

    #[tokio::test]
    async fn test_parses_uuid_header() {
        let id = Uuid::new_v4();
        assert_eq!(extract(Some(&id.to_string())).await, Ok(SessionId(id)));
    }

    #[tokio::test]
    async fn test_rejects_missing_or_malformed_header() {
        assert_eq!(extract(None).await, Err(StatusCode::BAD_REQUEST));
        assert_eq!(extract(Some("not-a-uuid")).await, Err(StatusCode::BAD_REQUEST));
    }
}
