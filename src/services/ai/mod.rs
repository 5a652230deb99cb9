pub mod anthropic;
pub mod groq;
pub mod intent;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A tool the reasoning oracle may ask for.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One entry of the reasoning loop's transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    User(String),
    Assistant {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },
}

/// What the reasoning oracle produced for one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OracleReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String>;

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> anyhow::Result<OracleReply>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned oracle output in order and records what it was sent.
    #[derive(Default)]
    pub struct ScriptedProvider {
        chat_replies: Mutex<VecDeque<anyhow::Result<String>>>,
        tool_replies: Mutex<VecDeque<anyhow::Result<OracleReply>>>,
        repeat: Option<OracleReply>,
        pub transcripts: Mutex<Vec<Vec<AgentMessage>>>,
        pub chat_inputs: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn chat_reply(self, reply: &str) -> Self {
            self.chat_replies.lock().unwrap().push_back(Ok(reply.to_string()));
            self
        }

        pub fn chat_error(self, message: &str) -> Self {
            self.chat_replies
                .lock()
                .unwrap()
                .push_back(Err(anyhow::anyhow!(message.to_string())));
            self
        }

        pub fn tool_reply(self, reply: OracleReply) -> Self {
            self.tool_replies.lock().unwrap().push_back(Ok(reply));
            self
        }

        pub fn tool_error(self, message: &str) -> Self {
            self.tool_replies
                .lock()
                .unwrap()
                .push_back(Err(anyhow::anyhow!(message.to_string())));
            self
        }

        /// Reply used once the tool script runs dry.
        pub fn repeating(mut self, reply: OracleReply) -> Self {
            self.repeat = Some(reply);
            self
        }

        pub fn tool_steps(&self) -> usize {
            self.transcripts.lock().unwrap().len()
        }
    }

    pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    pub fn text_reply(text: &str) -> OracleReply {
        OracleReply {
            text: text.to_string(),
            tool_calls: vec![],
        }
    }

    pub fn calls_reply(calls: Vec<ToolCall>) -> OracleReply {
        OracleReply {
            text: String::new(),
            tool_calls: calls,
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, _system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
            self.chat_inputs.lock().unwrap().push(messages.to_vec());
            self.chat_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("chat script exhausted")))
        }

        async fn chat_with_tools(
            &self,
            _system_prompt: &str,
            messages: &[AgentMessage],
            _tools: &[ToolSpec],
        ) -> anyhow::Result<OracleReply> {
            self.transcripts.lock().unwrap().push(messages.to_vec());
            let next = self.tool_replies.lock().unwrap().pop_front();
            match (next, &self.repeat) {
                (Some(reply), _) => reply,
                (None, Some(reply)) => Ok(reply.clone()),
                (None, None) => Err(anyhow::anyhow!("tool script exhausted")),
            }
        }
    }
}
