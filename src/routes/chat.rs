use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::chat::{self, TurnState};
use crate::middleware::SessionId;
use crate::models::{
    turn_views, AppState, ChatRequest, ChatResponse, HistoryResponse, Notice, NoticeLevel,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(post_chat))
        .route("/api/history", get(get_history))
        .route("/api/session", delete(end_session))
        .with_state(state)
}

/// POST /api/chat - runs one question through the session's agent
///
/// Only sessions created by `POST /api/agent` can chat; an unknown id gets the
/// no-agent warning without being stored.
pub async fn post_chat(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let session = state.sessions.get(&session_id).await;
    let question = request.question.trim();

    if question.is_empty() {
        let history = match &session {
            Some(session) => turn_views(session.lock().await.history()),
            None => Vec::new(),
        };
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                notice: Some(Notice::warning("empty_question", "Please enter a question.")),
                appended: Vec::new(),
                history,
            }),
        );
    }

    let Some(session) = session else {
        warn!(%session_id, "Chat request for a session with no agent");
        return (
            StatusCode::CONFLICT,
            Json(ChatResponse {
                notice: Some(chat::no_agent_notice()),
                appended: Vec::new(),
                history: Vec::new(),
            }),
        );
    };

    info!(%session_id, question_len = question.len(), "Chat request received");

    let mut session = session.lock().await;
    let outcome = chat::ask(&mut session, question, &state.config.plot).await;

    let status = match (&outcome.state, outcome.notice.as_ref().map(|n| n.level)) {
        (TurnState::Rendered, _) => StatusCode::OK,
        (_, Some(NoticeLevel::Warning)) => StatusCode::CONFLICT,
        (_, Some(NoticeLevel::Error)) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };

    (
        status,
        Json(ChatResponse {
            notice: outcome.notice,
            appended: turn_views(&outcome.appended),
            history: turn_views(session.history()),
        }),
    )
}

/// GET /api/history - full transcript, oldest first
async fn get_history(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Json<HistoryResponse> {
    let Some(session) = state.sessions.get(&session_id).await else {
        return Json(HistoryResponse {
            has_agent: false,
            history: Vec::new(),
        });
    };
    let session = session.lock().await;
    Json(HistoryResponse {
        has_agent: session.has_agent(),
        history: turn_views(session.history()),
    })
}

/// DELETE /api/session - drops the agent, dataset and history
async fn end_session(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> StatusCode {
    if state.sessions.remove(&session_id).await {
        info!(%session_id, "Session ended");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
