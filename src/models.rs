use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::agents::AgentFactory;
use crate::config::Config;
use crate::dataset::DatasetSummary;
use crate::session::{Role, SessionStore, Turn, TurnContent, TurnKind};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub factory: Arc<dyn AgentFactory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Inline message shown next to the control that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Error kind for warnings and errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            kind: None,
        }
    }

    pub fn warning(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
            kind: Some(kind),
        }
    }

    pub fn error(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            kind: Some(kind),
        }
    }
}

/// Wire form of a history entry; plot content is base64 PNG.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnView {
    pub role: Role,
    pub kind: TurnKind,
    pub content: String,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        let content = match turn.content() {
            TurnContent::Text(text) => text.clone(),
            TurnContent::Image(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        };
        Self {
            role: turn.role(),
            kind: turn.kind(),
            content,
        }
    }
}

pub fn turn_views(turns: &[Turn]) -> Vec<TurnView> {
    turns.iter().map(TurnView::from).collect()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub appended: Vec<TurnView>,
    pub history: Vec<TurnView>,
}

#[derive(Debug, Serialize)]
pub struct ConfigureResponse {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetSummary>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub has_agent: bool,
    pub history: Vec<TurnView>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
