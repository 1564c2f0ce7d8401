//! Agent System
//!
//! A data agent answers natural-language questions about one uploaded
//! dataset. Each question gets a fresh canvas; anything the agent draws on it
//! is shown to the user as a plot.
//!
//! ```text
//! question ──▶ ┌──────────────┐  tool call  ┌──────────────┐
//!              │   Analysis   │ ──────────▶ │    Tools     │ ──▶ canvas
//!              │    Agent     │ ◀────────── │ (stats/plot) │
//!              └──────────────┘ observation └──────────────┘
//!                     │
//!                     ▼
//!                final answer
//! ```

pub mod analysis;
pub mod prompt;
pub mod tools;

pub use analysis::{AgentSettings, AnalysisAgent};

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::canvas::Canvas;
use crate::config::LLMConfig;
use crate::dataset::Dataset;
use crate::llm::provider::{LLMProviderConfig, LLM};
use crate::types::AppResult;

/// An agent bound to one dataset and one API credential.
#[async_trait]
pub trait DataAgent: Send + Sync {
    /// Answers `question`, drawing any chart onto `canvas`.
    async fn ask(&self, question: &str, canvas: &mut Canvas) -> AppResult<String>;
}

#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn create(&self, dataset: Dataset, credential: &str) -> AppResult<Box<dyn DataAgent>>;
}

/// Builds `AnalysisAgent`s backed by the configured LLM provider.
pub struct LlmAgentFactory {
    config: LLMConfig,
}

impl LlmAgentFactory {
    pub fn new(config: LLMConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AgentFactory for LlmAgentFactory {
    async fn create(&self, dataset: Dataset, credential: &str) -> AppResult<Box<dyn DataAgent>> {
        let llm = LLM::new(LLMProviderConfig {
            provider: self.config.provider,
            api_key: credential.trim().to_string(),
            base_url: self.config.base_url.clone(),
            timeout: Duration::from_secs(self.config.timeout_secs),
        })?;

        if self.config.verify_credential {
            llm.verify_credential(&self.config.model).await?;
        }

        info!(
            provider = %self.config.provider,
            model = %self.config.model,
            rows = dataset.row_count(),
            columns = dataset.columns().len(),
            "Created analysis agent"
        );

        Ok(Box::new(AnalysisAgent::new(
            llm,
            dataset,
            AgentSettings {
                model: self.config.model.clone(),
                max_tokens: self.config.max_tokens,
                max_steps: self.config.max_steps,
            },
        )))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers every question with a fixed text, optionally drawing noise.
    pub(crate) struct EchoAgent {
        answer: String,
        draws: bool,
        pub(crate) calls: Arc<AtomicUsize>,
    }

    impl EchoAgent {
        pub(crate) fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                draws: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn drawing(answer: &str) -> Self {
            Self {
                draws: true,
                ..Self::new(answer)
            }
        }
    }

    #[async_trait]
    impl DataAgent for EchoAgent {
        async fn ask(&self, _question: &str, canvas: &mut Canvas) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.draws {
                crate::canvas::tests::paint_noise(canvas);
            }
            Ok(self.answer.clone())
        }
    }

    pub(crate) struct FailingAgent;

    #[async_trait]
    impl DataAgent for FailingAgent {
        async fn ask(&self, _question: &str, _canvas: &mut Canvas) -> AppResult<String> {
            Err(AppError::LLMApi("network unreachable".to_string()))
        }
    }

    /// Hands out `EchoAgent`s, or fails when built with `failing`.
    pub(crate) struct StubFactory {
        answer: String,
        draws: bool,
        fail: bool,
        pub(crate) created: Arc<AtomicUsize>,
    }

    impl StubFactory {
        pub(crate) fn answering(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                draws: false,
                fail: false,
                created: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn drawing(answer: &str) -> Self {
            Self {
                draws: true,
                ..Self::answering(answer)
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::answering("")
            }
        }
    }

    #[async_trait]
    impl AgentFactory for StubFactory {
        async fn create(&self, _dataset: Dataset, _credential: &str) -> AppResult<Box<dyn DataAgent>> {
            if self.fail {
                return Err(AppError::LLMApi("API key not valid".to_string()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            let agent = if self.draws {
                EchoAgent::drawing(&self.answer)
            } else {
                EchoAgent::new(&self.answer)
            };
            Ok(Box::new(agent))
        }
    }

    fn factory_for(server: &mockito::ServerGuard) -> LlmAgentFactory {
        LlmAgentFactory::new(LLMConfig {
            base_url: Some(server.url()),
            timeout_secs: 5,
            ..LLMConfig::default()
        })
    }

    fn dataset() -> Dataset {
        Dataset::from_csv_bytes(b"A,B\n1,3\n2,4\n").unwrap()
    }

    #[tokio::test]
    async fn test_factory_verifies_credential() {
        let mut server = mockito::Server::new_async().await;
        let models = server
            .mock("GET", "/v1beta/models/gemini-2.0-flash")
            .match_header("x-goog-api-key", "good-key")
            .with_status(200)
            .with_body(r#"{"name": "models/gemini-2.0-flash"}"#)
            .create_async()
            .await;

        let agent = factory_for(&server).create(dataset(), "  good-key \n").await;
        assert!(agent.is_ok());
        models.assert_async().await;
    }

    #[tokio::test]
    async fn test_factory_rejects_bad_credential() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/models/gemini-2.0-flash")
            .with_status(400)
            .with_body(r#"{"error": {"code": 400, "message": "API key not valid"}}"#)
            .create_async()
            .await;

        let err = factory_for(&server).create(dataset(), "bad-key").await.err().unwrap();
        assert!(matches!(err, AppError::LLMApi(msg) if msg.contains("API key not valid")));
    }

    #[tokio::test]
    async fn test_agent_answers_through_provider() {
        let mut server = mockito::Server::new_async().await;
        let generate = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "generationConfig": { "temperature": 0.0 }
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "{\"final_answer\": \"There are 2 rows.\"}"}]}, "finishReason": "STOP"}]}"#,
            )
            .create_async()
            .await;

        let factory = LlmAgentFactory::new(LLMConfig {
            base_url: Some(server.url()),
            verify_credential: false,
            timeout_secs: 5,
            ..LLMConfig::default()
        });
        let agent = factory.create(dataset(), "key").await.unwrap();
        let mut canvas = Canvas::new(32, 24);
        let answer = agent.ask("How many rows?", &mut canvas).await.unwrap();
        assert_eq!(answer, "There are 2 rows.");
        generate.assert_async().await;
    }
}
