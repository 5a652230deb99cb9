use std::sync::Arc;

use anyhow::Context;
use futures_util::future::join_all;

use crate::models::{Role, Turn};
use crate::services::ai::{AgentMessage, LlmProvider, ToolCall};
use crate::services::tools::ToolRegistry;

pub const DEFAULT_MAX_STEPS: usize = 8;
const HISTORY_TURNS: usize = 6;

pub const NO_TEXT_MESSAGE: &str = "I'm sorry, I was unable to process your request. Please try again.";
pub const STEP_LIMIT_MESSAGE: &str =
    "I'm sorry, I couldn't finish that request. Could you try again with a bit more detail?";

const SYSTEM_PROMPT: &str = r#"You are a professional healthcare front-desk assistant specializing in appointment scheduling.
You help staff book, cancel, reschedule, and look up patient appointments.

Guidelines:
- Always search for the patient first before booking to verify they exist and get their patient_id.
- Confirm key details before booking (patient name, date/time, provider, reason).
- When checking availability, use check_availability to find open slots.
- Tool arguments use 24-hour YYYY-MM-DDTHH:MM timestamps; present times to users in 12-hour format.
- If a tool reports success false, explain the problem plainly instead of retrying blindly.
- Be concise, professional, and accurate.
- Always confirm the outcome clearly at the end (appointment booked, cancelled, etc.)."#;

/// Outcome of one reasoning loop run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    pub response: String,
    /// Oracle consultations used.
    pub steps: usize,
    /// False when the step budget ran out before a final answer.
    pub completed: bool,
}

enum Step {
    Think,
    Act(Vec<ToolCall>),
}

/// Think/act loop over the scheduling tools.
pub struct SchedulingAgent {
    llm: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    max_steps: usize,
}

impl SchedulingAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: ToolRegistry, max_steps: usize) -> Self {
        Self {
            llm,
            tools,
            max_steps: max_steps.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.llm.name()
    }

    /// Oracle failures propagate; tool failures are handed back to the oracle.
    pub async fn run(&self, text: &str, history: &[Turn]) -> anyhow::Result<AgentRun> {
        let system = system_prompt(chrono::Local::now().date_naive());
        let specs = self.tools.specs();

        let mut transcript = history_messages(history);
        transcript.push(AgentMessage::User(text.to_string()));

        let mut steps = 0;
        let mut last_text = String::new();
        let mut state = Step::Think;

        loop {
            state = match state {
                Step::Think => {
                    if steps >= self.max_steps {
                        tracing::warn!(steps, "agent step budget exhausted");
                        return Ok(AgentRun {
                            response: STEP_LIMIT_MESSAGE.to_string(),
                            steps,
                            completed: false,
                        });
                    }
                    steps += 1;

                    let reply = self
                        .llm
                        .chat_with_tools(&system, &transcript, &specs)
                        .await
                        .context("reasoning oracle call failed")?;
                    if !reply.text.trim().is_empty() {
                        last_text = reply.text.clone();
                    }

                    if reply.tool_calls.is_empty() {
                        let response = if last_text.is_empty() {
                            NO_TEXT_MESSAGE.to_string()
                        } else {
                            last_text
                        };
                        tracing::debug!(steps, "agent finished");
                        return Ok(AgentRun {
                            response,
                            steps,
                            completed: true,
                        });
                    }

                    transcript.push(AgentMessage::Assistant {
                        text: reply.text,
                        tool_calls: reply.tool_calls.clone(),
                    });
                    Step::Act(reply.tool_calls)
                }
                Step::Act(calls) => {
                    let outputs = join_all(calls.iter().map(|call| self.tools.execute(call))).await;
                    for (call, output) in calls.into_iter().zip(outputs) {
                        transcript.push(AgentMessage::ToolResult {
                            call_id: call.id,
                            name: call.name,
                            content: output.content,
                            is_error: output.is_error,
                        });
                    }
                    Step::Think
                }
            };
        }
    }
}

fn system_prompt(today: chrono::NaiveDate) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nToday is {}. Resolve relative dates such as \"tomorrow\" against it.",
        today.format("%A, %Y-%m-%d")
    )
}

fn history_messages(history: &[Turn]) -> Vec<AgentMessage> {
    let start = history.len().saturating_sub(HISTORY_TURNS);
    history[start..]
        .iter()
        .map(|turn| match turn.role {
            Role::User => AgentMessage::User(turn.text.clone()),
            Role::Assistant => AgentMessage::Assistant {
                text: turn.text.clone(),
                tool_calls: vec![],
            },
        })
        .collect()
}
