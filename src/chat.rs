//! Chat turn controller.
//!
//! One question moves through `Idle -> AwaitingAgent -> Invoking ->
//! CapturingOutput -> Rendered`. Every failure ends the turn with a notice;
//! the user turn, once appended, is never rolled back.

use tracing::{debug, error, info, warn};

use crate::canvas::Canvas;
use crate::config::PlotConfig;
use crate::models::Notice;
use crate::plot_capture::{capture, CapturedOutput};
use crate::session::{Session, Turn};
use crate::types::{AppResult, TurnError};

pub const NO_AGENT_WARNING: &str = "Please configure the agent first.";

pub fn no_agent_notice() -> Notice {
    Notice::warning("no_agent", NO_AGENT_WARNING)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingAgent,
    Invoking,
    CapturingOutput,
    Rendered,
}

#[derive(Debug)]
pub struct TurnOutcome {
    /// Last state reached; `Idle` when the turn was rejected or failed.
    pub state: TurnState,
    /// Turns this call appended to the history, in order.
    pub appended: Vec<Turn>,
    pub notice: Option<Notice>,
}

impl TurnOutcome {
    fn rejected(notice: Notice, appended: Vec<Turn>) -> Self {
        Self {
            state: TurnState::Idle,
            appended,
            notice: Some(notice),
        }
    }
}

pub async fn ask(session: &mut Session, question: &str, plot: &PlotConfig) -> TurnOutcome {
    let mut state = TurnState::AwaitingAgent;
    debug!(?state, "Turn started");

    if !session.has_agent() {
        warn!("Question received before an agent was configured");
        return TurnOutcome::rejected(no_agent_notice(), Vec::new());
    }

    let user_turn = Turn::user(question);
    session.append_turn(user_turn.clone());
    let mut appended = vec![user_turn];

    state = TurnState::Invoking;
    debug!(?state, "Invoking agent");
    let mut canvas = Canvas::new(plot.canvas_width, plot.canvas_height);

    let captured = match run_agent(session, question, &mut canvas, plot, &mut state).await {
        Ok(captured) => captured,
        Err(e) => {
            error!(?state, error = %e, "Turn failed");
            let err = TurnError::AgentInvocation(e.to_string());
            return TurnOutcome::rejected(Notice::error(err.kind(), err.to_string()), appended);
        }
    };

    let assistant_turn = match captured {
        CapturedOutput::Plot(image) => {
            info!(bytes = image.len(), "Turn produced a plot");
            Turn::assistant_plot(image)
        }
        CapturedOutput::Text(answer) => {
            info!(answer_len = answer.len(), "Turn produced a text answer");
            Turn::assistant_text(answer)
        }
    };
    session.append_turn(assistant_turn.clone());
    appended.push(assistant_turn);

    TurnOutcome {
        state: TurnState::Rendered,
        appended,
        notice: None,
    }
}

async fn run_agent(
    session: &Session,
    question: &str,
    canvas: &mut Canvas,
    plot: &PlotConfig,
    state: &mut TurnState,
) -> AppResult<CapturedOutput> {
    let Some(agent) = session.agent() else {
        return Err(crate::types::AppError::Internal("agent disappeared mid-turn".to_string()));
    };
    let answer = agent.ask(question, canvas).await?;

    *state = TurnState::CapturingOutput;
    let image = canvas.to_png()?;
    debug!(png_bytes = image.len(), threshold = plot.byte_threshold, "Canvas captured");
    Ok(capture(image, answer, plot.byte_threshold))
}
