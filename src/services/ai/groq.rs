use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{AgentMessage, LlmProvider, Message, OracleReply, ToolCall, ToolSpec};

const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

pub struct GroqProvider {
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl GroqProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.0,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn call_api(&self, body: Value) -> anyhow::Result<Value> {
        let resp = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Groq API")?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .context("failed to parse Groq response")?;

        if !status.is_success() {
            anyhow::bail!("Groq API error ({}): {}", status, data);
        }
        Ok(data)
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let mut chat_messages = vec![json!({
            "role": "system",
            "content": system_prompt,
        })];

        for msg in messages {
            chat_messages.push(json!({
                "role": msg.role,
                "content": msg.content,
            }));
        }

        let data = self
            .call_api(json!({
                "model": self.model,
                "messages": chat_messages,
                "temperature": self.temperature,
            }))
            .await?;

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing content in Groq response"))
    }

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> anyhow::Result<OracleReply> {
        let mut chat_messages = vec![json!({
            "role": "system",
            "content": system_prompt,
        })];
        chat_messages.extend(messages.iter().map(to_openai_message));

        let tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let data = self
            .call_api(json!({
                "model": self.model,
                "messages": chat_messages,
                "tools": tools,
                "tool_choice": "auto",
                "temperature": self.temperature,
            }))
            .await?;

        parse_choice(&data["choices"][0]["message"])
    }
}

fn to_openai_message(msg: &AgentMessage) -> Value {
    match msg {
        AgentMessage::User(text) => json!({ "role": "user", "content": text }),
        AgentMessage::Assistant { text, tool_calls } if tool_calls.is_empty() => {
            json!({ "role": "assistant", "content": text })
        }
        AgentMessage::Assistant { text, tool_calls } => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": {
                            "name": c.name,
                            // OpenAI-style APIs carry arguments as a JSON string
                            "arguments": c.arguments.to_string(),
                        }
                    })
                })
                .collect();
            json!({ "role": "assistant", "content": text, "tool_calls": calls })
        }
        AgentMessage::ToolResult {
            call_id,
            name,
            content,
            ..
        } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "name": name,
            "content": content,
        }),
    }
}

fn parse_choice(message: &Value) -> anyhow::Result<OracleReply> {
    if message.is_null() {
        anyhow::bail!("missing message in Groq response");
    }

    let mut tool_calls = vec![];
    for call in message["tool_calls"].as_array().into_iter().flatten() {
        let function = &call["function"];
        let raw_args = function["arguments"].as_str().unwrap_or("{}");
        let arguments: Value = serde_json::from_str(raw_args)
            .with_context(|| format!("tool call arguments are not JSON: {raw_args}"))?;
        tool_calls.push(ToolCall {
            id: call["id"].as_str().unwrap_or_default().to_string(),
            name: function["name"].as_str().unwrap_or_default().to_string(),
            arguments,
        });
    }

    Ok(OracleReply {
        text: message["content"].as_str().unwrap_or_default().to_string(),
        tool_calls,
    })
}
