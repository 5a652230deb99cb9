//! Per-request pipeline: classify, route, run the agent or the generic
//! responder, finalize, then record the exchange in the session.

use std::sync::Arc;

use crate::models::{Intent, IntentType, Role, Turn};
use crate::services::agent::SchedulingAgent;
use crate::services::ai::intent::classify;
use crate::services::ai::{LlmProvider, Message};
use crate::services::session::SessionStore;

const GENERIC_HISTORY_TURNS: usize = 4;

pub const TECHNICAL_FAILURE_MESSAGE: &str = "I'm sorry, I encountered a technical issue and couldn't complete your request. Please try again or contact support if the problem persists.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "I'm sorry, I encountered an issue processing your request. Please try again.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "I'm sorry, I could not process that.";

const GENERIC_SYSTEM_PROMPT: &str = "You are a helpful healthcare administrative assistant. \
Answer concisely and professionally. You help front-desk staff manage patient appointments, \
records, and admin tasks. If asked about something outside your scope, politely say so.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Scheduling,
    Generic,
}

pub fn route(kind: IntentType) -> Route {
    match kind {
        IntentType::ScheduleAppointment
        | IntentType::CancelAppointment
        | IntentType::RescheduleAppointment
        | IntentType::CheckAppointments
        | IntentType::PatientLookup => Route::Scheduling,
        IntentType::GeneralQuery | IntentType::Unknown => Route::Generic,
    }
}

fn closing(kind: IntentType) -> &'static str {
    match kind {
        IntentType::ScheduleAppointment => " Is there anything else I can help you with?",
        IntentType::CancelAppointment => " The appointment has been cancelled. Is there anything else?",
        IntentType::RescheduleAppointment => {
            " The appointment has been rescheduled. Is there anything else?"
        }
        IntentType::CheckAppointments => " Let me know if you need more details.",
        IntentType::PatientLookup => " Let me know if you need anything else.",
        IntentType::GeneralQuery | IntentType::Unknown => "",
    }
}

/// Working state of one request.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub session_id: String,
    pub user_text: String,
    pub intent: Option<Intent>,
    pub history: Vec<Turn>,
    pub response: String,
    pub final_response: Option<String>,
    pub goal_achieved: bool,
    pub error: Option<String>,
}

impl PipelineState {
    pub fn new(session_id: &str, user_text: &str, history: Vec<Turn>) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_text: user_text.to_string(),
            intent: None,
            history,
            response: String::new(),
            final_response: None,
            goal_achieved: false,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.final_response.is_some()
    }
}

enum Stage {
    Classify,
    Dispatch(Route),
    Finalize,
}

/// Sets the final response. An empty response with a recorded error is a
/// terminal failure; otherwise achieved goals get the intent's closing clause
/// unless the text already ends in a question.
pub fn finalize(state: &mut PipelineState) {
    if state.error.is_some() && state.response.trim().is_empty() {
        state.final_response = Some(TECHNICAL_FAILURE_MESSAGE.to_string());
        state.goal_achieved = false;
        return;
    }

    let trimmed = state.response.trim();
    let text = if state.goal_achieved && !trimmed.is_empty() && !trimmed.ends_with('?') {
        let kind = state
            .intent
            .as_ref()
            .map(|i| i.kind)
            .unwrap_or(IntentType::Unknown);
        format!("{trimmed}{}", closing(kind))
    } else {
        state.response.clone()
    };
    state.final_response = Some(text);
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub response: String,
    pub intent: Intent,
    pub goal_achieved: bool,
}

pub struct Orchestrator {
    classifier: Arc<dyn LlmProvider>,
    responder: Arc<dyn LlmProvider>,
    agent: SchedulingAgent,
    sessions: Arc<dyn SessionStore>,
}

impl Orchestrator {
    pub fn new(
        classifier: Arc<dyn LlmProvider>,
        responder: Arc<dyn LlmProvider>,
        agent: SchedulingAgent,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            classifier,
            responder,
            agent,
            sessions,
        }
    }

    /// Name of the adapter behind the reasoning loop.
    pub fn provider_name(&self) -> &str {
        self.agent.provider_name()
    }

    pub async fn process(&self, user_text: &str, session_id: &str) -> String {
        self.process_detailed(user_text, session_id).await.response
    }

    /// Runs one exchange. Never fails; every failure path ends in a fixed
    /// apology text.
    pub async fn process_detailed(&self, user_text: &str, session_id: &str) -> ProcessOutcome {
        let history = self.sessions.history(session_id).await;
        let mut state = PipelineState::new(session_id, user_text, history);
        let mut stage = Stage::Classify;

        while !state.is_terminal() {
            stage = match stage {
                Stage::Classify => {
                    let classification = classify(self.classifier.as_ref(), user_text).await;
                    let next = route(classification.intent.kind);
                    state.error = classification.failure;
                    state.intent = Some(classification.intent);
                    Stage::Dispatch(next)
                }
                Stage::Dispatch(Route::Scheduling) => {
                    self.run_agent(&mut state).await;
                    Stage::Finalize
                }
                Stage::Dispatch(Route::Generic) => {
                    self.respond_generic(&mut state).await;
                    Stage::Finalize
                }
                Stage::Finalize => {
                    finalize(&mut state);
                    Stage::Finalize
                }
            };
        }

        let response = state
            .final_response
            .take()
            .filter(|r| !r.is_empty())
            .or_else(|| Some(state.response.clone()).filter(|r| !r.is_empty()))
            .unwrap_or_else(|| EMPTY_RESPONSE_MESSAGE.to_string());

        self.sessions
            .append(
                session_id,
                vec![Turn::user(user_text), Turn::assistant(response.clone())],
            )
            .await;

        let intent = state.intent.unwrap_or_else(|| Intent::fallback(user_text));
        if let Some(error) = &state.error {
            tracing::warn!(session = %session_id, error = %error, "request completed with error");
        }
        tracing::info!(
            session = %session_id,
            intent = intent.kind.as_str(),
            goal_achieved = state.goal_achieved,
            "request processed"
        );

        ProcessOutcome {
            response,
            intent,
            goal_achieved: state.goal_achieved,
        }
    }

    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions.history(session_id).await
    }

    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.clear(session_id).await
    }

    async fn run_agent(&self, state: &mut PipelineState) {
        match self.agent.run(&state.user_text, &state.history).await {
            Ok(run) => {
                tracing::debug!(session = %state.session_id, steps = run.steps, "agent run complete");
                state.response = run.response;
                state.goal_achieved = run.completed;
            }
            Err(e) => {
                tracing::error!(session = %state.session_id, error = %format!("{e:#}"), "scheduling agent failed");
                state.response.clear();
                state.goal_achieved = false;
                state.error = Some(format!("{e:#}"));
            }
        }
    }

    async fn respond_generic(&self, state: &mut PipelineState) {
        let start = state.history.len().saturating_sub(GENERIC_HISTORY_TURNS);
        let mut messages: Vec<Message> = state.history[start..]
            .iter()
            .filter(|t| t.role == Role::User)
            .map(|t| Message::user(t.text.clone()))
            .collect();
        messages.push(Message::user(state.user_text.clone()));

        match self.responder.chat(GENERIC_SYSTEM_PROMPT, &messages).await {
            Ok(text) => {
                state.response = text;
                state.goal_achieved = true;
            }
            Err(e) => {
                tracing::error!(session = %state.session_id, error = %e, "generic response failed");
                state.response = GENERIC_FAILURE_MESSAGE.to_string();
                state.goal_achieved = false;
                state.error = Some(e.to_string());
            }
        }
    }
}
