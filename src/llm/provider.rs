use std::time::Duration;

use async_trait::async_trait;
use crate::types::{AppError, AppResult, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Cheap authenticated call that fails when the key or model is rejected.
    async fn verify_credential(&self, model: &str) -> AppResult<()>;
}

pub struct LLMProviderConfig {
    pub provider: LLMProvider,
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider: LLMProvider,
}

impl LLM {
    pub fn new(config: LLMProviderConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::LLMApi(format!("Failed to build HTTP client: {}", e)))?;

        let adapter: Box<dyn LLMAdapter> = match config.provider {
            LLMProvider::Google => Box::new(crate::llm::google::GoogleAdapter::with_client(
                client,
                &config.api_key,
                config.base_url.as_deref(),
            )),
            LLMProvider::OpenAI => Box::new(crate::llm::openai::OpenAIAdapter::with_client(
                client,
                &config.api_key,
                config.base_url.as_deref(),
            )),
        };

        Ok(Self {
            adapter,
            provider: config.provider,
        })
    }

    pub fn from_adapter(provider: LLMProvider, adapter: Box<dyn LLMAdapter>) -> Self {
        Self { adapter, provider }
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    pub async fn verify_credential(&self, model: &str) -> AppResult<()> {
        self.adapter.verify_credential(model).await
    }
}

/// Turns a non-success HTTP response into an `AppError::LLMApi`, preferring
/// the provider's `{"error": {"message": ...}}` body when present.
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> AppError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => AppError::LLMApi(format!(
            "{} API error ({}): {}",
            provider, status, body.error.message
        )),
        Err(_) => AppError::LLMApi(format!("{} API error ({}): {}", provider, status, text)),
    }
}
