use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{AgentMessage, LlmProvider, Message, OracleReply, ToolCall, ToolSpec};

pub struct OllamaProvider {
    url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url,
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
            .post(format!("{}/api/chat", self.url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .context("failed to call Ollama API")?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .context("failed to parse Ollama response")?;

        if !status.is_success() {
            anyhow::bail!("Ollama API error ({}): {}", status, data);
        }
        Ok(data)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let mut ollama_messages = vec![json!({
            "role": "system",
            "content": system_prompt,
        })];

        for msg in messages {
            ollama_messages.push(json!({
                "role": msg.role,
                "content": msg.content,
            }));
        }

        let data = self
            .call_api(json!({
                "model": self.model,
                "messages": ollama_messages,
                "stream": false,
                "options": { "temperature": self.temperature },
            }))
            .await?;

        data["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing content in Ollama response"))
    }

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> anyhow::Result<OracleReply> {
        let mut ollama_messages = vec![json!({
            "role": "system",
            "content": system_prompt,
        })];
        for msg in messages {
            ollama_messages.push(match msg {
                AgentMessage::User(text) => json!({ "role": "user", "content": text }),
                AgentMessage::Assistant { text, tool_calls } => {
                    let calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|c| json!({ "function": { "name": c.name, "arguments": c.arguments } }))
                        .collect();
                    json!({ "role": "assistant", "content": text, "tool_calls": calls })
                }
                AgentMessage::ToolResult { content, .. } => {
                    json!({ "role": "tool", "content": content })
                }
            });
        }

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
                "messages": ollama_messages,
                "tools": tools,
                "stream": false,
                "options": { "temperature": self.temperature },
            }))
            .await?;

        parse_message(&data["message"])
    }
}

/// Ollama does not assign tool call ids, so one is generated per call.
fn parse_message(message: &Value) -> anyhow::Result<OracleReply> {
    if message.is_null() {
        anyhow::bail!("missing message in Ollama response");
    }

    let tool_calls = message["tool_calls"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|call| ToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
            arguments: call["function"]["arguments"].clone(),
        })
        .collect();

    Ok(OracleReply {
        text: message["content"].as_str().unwrap_or_default().to_string(),
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_assigns_call_ids() {
        let message = json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [
                {"function": {"name": "search_patient", "arguments": {"query": "Bob"}}},
                {"function": {"name": "search_patient", "arguments": {"query": "Carol"}}}
            ]
        });
        let reply = parse_message(&message).unwrap();
        assert_eq!(reply.tool_calls.len(), 2);
        assert!(reply.tool_calls[0].id.starts_with("call_"));
        assert_ne!(reply.tool_calls[0].id, reply.tool_calls[1].id);
        assert_eq!(reply.tool_calls[1].arguments["query"], "Carol");
    }

    #[test]
    fn test_parse_message_plain_text() {
        let reply = parse_message(&json!({"role": "assistant", "content": "Done."})).unwrap();
        assert_eq!(reply.text, "Done.");
        assert!(reply.tool_calls.is_empty());
    }
}
