use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{AgentMessage, LlmProvider, Message, OracleReply, ToolCall, ToolSpec};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl AnthropicProvider {
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
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("failed to call Anthropic API")?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .context("failed to parse Anthropic response")?;

        if !status.is_success() {
            anyhow::bail!("Anthropic API error ({}): {}", status, data);
        }
        Ok(data)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let mut turns: Vec<Value> = vec![];
        for msg in messages {
            push_blocks(&mut turns, &msg.role, vec![json!({"type": "text", "text": msg.content})]);
        }

        let data = self
            .call_api(json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "temperature": self.temperature,
                "system": system_prompt,
                "messages": turns,
            }))
            .await?;

        let reply = parse_reply(&data)?;
        Ok(reply.text)
    }

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> anyhow::Result<OracleReply> {
        let tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();

        let data = self
            .call_api(json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "temperature": self.temperature,
                "system": system_prompt,
                "messages": to_wire_messages(messages),
                "tools": tools,
            }))
            .await?;

        parse_reply(&data)
    }
}

/// Anthropic wants strictly alternating roles, so consecutive same-role
/// entries are merged into one message with several content blocks.
fn push_blocks(turns: &mut Vec<Value>, role: &str, blocks: Vec<Value>) {
    if let Some(last) = turns.last_mut() {
        if last["role"] == role {
            if let Some(content) = last["content"].as_array_mut() {
                content.extend(blocks);
                return;
            }
        }
    }
    turns.push(json!({ "role": role, "content": blocks }));
}

fn to_wire_messages(messages: &[AgentMessage]) -> Vec<Value> {
    let mut turns = vec![];
    for msg in messages {
        match msg {
            AgentMessage::User(text) => {
                push_blocks(&mut turns, "user", vec![json!({"type": "text", "text": text})]);
            }
            AgentMessage::Assistant { text, tool_calls } => {
                let mut blocks = vec![];
                if !text.is_empty() {
                    blocks.push(json!({"type": "text", "text": text}));
                }
                for call in tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                if !blocks.is_empty() {
                    push_blocks(&mut turns, "assistant", blocks);
                }
            }
            AgentMessage::ToolResult {
                call_id,
                content,
                is_error,
                ..
            } => {
                push_blocks(
                    &mut turns,
                    "user",
                    vec![json!({
                        "type": "tool_result",
                        "tool_use_id": call_id,
                        "content": content,
                        "is_error": is_error,
                    })],
                );
            }
        }
    }
    turns
}

fn parse_reply(data: &Value) -> anyhow::Result<OracleReply> {
    let blocks = data["content"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("missing content in Anthropic response"))?;

    let mut reply = OracleReply::default();
    for block in blocks {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(text) = block["text"].as_str() {
                    if !reply.text.is_empty() {
                        reply.text.push('\n');
                    }
                    reply.text.push_str(text);
                }
            }
            Some("tool_use") => reply.tool_calls.push(ToolCall {
                id: block["id"].as_str().unwrap_or_default().to_string(),
                name: block["name"].as_str().unwrap_or_default().to_string(),
                arguments: block["input"].clone(),
            }),
            _ => {}
        }
    }
    Ok(reply)
}
