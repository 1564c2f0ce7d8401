//! Analysis Agent
//!
//! Answers questions about one dataset with a tool-calling loop: the model
//! picks a tool, the tool runs against the dataset (plots go to the canvas),
//! and the observation is fed back until the model gives a final answer.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::agents::prompt;
use crate::agents::tools::{parse_step, AgentStep};
use crate::agents::DataAgent;
use crate::canvas::Canvas;
use crate::dataset::Dataset;
use crate::llm::provider::LLM;
use crate::types::{AppResult, LLMMessage, LLMRequest};

/// Returned when the model never settles on a final answer.
pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit.";

pub struct AgentSettings {
    pub model: String,
    pub max_tokens: u32,
    pub max_steps: usize,
}

pub struct AnalysisAgent {
    llm: LLM,
    dataset: Dataset,
    settings: AgentSettings,
    system_prompt: String,
}

impl AnalysisAgent {
    pub fn new(llm: LLM, dataset: Dataset, settings: AgentSettings) -> Self {
        let system_prompt = prompt::system_prompt(&dataset);
        Self {
            llm,
            dataset,
            settings,
            system_prompt,
        }
    }

    fn request(&self, messages: &[LLMMessage]) -> LLMRequest {
        LLMRequest {
            model: self.settings.model.clone(),
            messages: messages.to_vec(),
            max_tokens: Some(self.settings.max_tokens),
            temperature: Some(0.0),
            system_instruction: Some(self.system_prompt.clone()),
        }
    }
}

#[async_trait]
impl DataAgent for AnalysisAgent {
    async fn ask(&self, question: &str, canvas: &mut Canvas) -> AppResult<String> {
        info!(
            provider = %self.llm.provider(),
            question_len = question.len(),
            "Agent received question"
        );

        let mut messages = vec![LLMMessage::user(question)];

        for step in 1..=self.settings.max_steps {
            let response = self.llm.create_chat_completion(&self.request(&messages)).await?;
            messages.push(LLMMessage::assistant(response.content.clone()));

            match parse_step(&response.content) {
                Ok(AgentStep::Finish(answer)) => {
                    info!(
                        steps = step,
                        answer_len = answer.len(),
                        figures = canvas.figures_drawn(),
                        "Agent finished"
                    );
                    return Ok(answer);
                }
                Ok(AgentStep::Act { thought, call }) => {
                    debug!(step, tool = call.name(), thought = ?thought, "Agent calling tool");
                    let observation = call.execute(&self.dataset, canvas);
                    messages.push(LLMMessage::user(prompt::observation(&observation)));
                }
                Err(e) => {
                    warn!(step, error = %e, "Could not parse agent reply");
                    messages.push(LLMMessage::user(prompt::format_correction(&e.to_string())));
                }
            }
        }

        warn!(max_steps = self.settings.max_steps, "Agent hit iteration limit");
        Ok(ITERATION_LIMIT_ANSWER.to_string())
    }
}
