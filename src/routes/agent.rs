use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::intake::{configure, UploadedFile};
use crate::middleware::SessionId;
use crate::models::{AppState, ConfigureResponse, Notice};
use crate::types::ConfigError;

pub const AGENT_READY: &str = "Agent ready! You can start asking questions.";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agent", post(start_agent))
        .with_state(state)
}

/// POST /api/agent - multipart `api_key` + `file`; builds the session's agent
async fn start_agent(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut api_key = String::new();
    let mut file: Option<UploadedFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(%session_id, error = %e, "Malformed multipart upload");
                return (
                    e.status(),
                    Json(ConfigureResponse {
                        notice: Notice::error("invalid_upload", format!("Could not read the upload: {}", e)),
                        dataset: None,
                    }),
                );
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let read = match name.as_str() {
            "api_key" => field.text().await.map(|text| api_key = text),
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                field
                    .bytes()
                    .await
                    .map(|bytes| file = Some(UploadedFile::new(file_name, bytes)))
            }
            _ => Ok(()),
        };
        if let Err(e) = read {
            warn!(%session_id, field = %name, error = %e, "Failed to read multipart field");
            return (
                e.status(),
                Json(ConfigureResponse {
                    notice: Notice::error("invalid_upload", format!("Could not read the upload: {}", e)),
                    dataset: None,
                }),
            );
        }
    }

    info!(
        %session_id,
        has_key = !api_key.trim().is_empty(),
        file_bytes = file.as_ref().map(|f| f.bytes.len()).unwrap_or(0),
        "Start agent request received"
    );

    let session = state.sessions.get_or_create(session_id).await;
    let mut session = session.lock().await;

    match configure(&mut session, state.factory.as_ref(), &api_key, file).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ConfigureResponse {
                notice: Notice::success(AGENT_READY),
                dataset: Some(summary),
            }),
        ),
        Err(e) => {
            let (status, notice) = match &e {
                ConfigError::MissingCredential | ConfigError::MissingFile => {
                    (StatusCode::BAD_REQUEST, Notice::warning(e.kind(), e.to_string()))
                }
                ConfigError::Parse(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, Notice::error(e.kind(), e.to_string()))
                }
                ConfigError::AgentCreation(_) => {
                    (StatusCode::BAD_GATEWAY, Notice::error(e.kind(), e.to_string()))
                }
            };
            (status, Json(ConfigureResponse { notice, dataset: None }))
        }
    }
}
