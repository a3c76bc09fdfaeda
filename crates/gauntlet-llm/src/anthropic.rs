use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use gauntlet_core::{GauntletError, Result, ToolCall};

use crate::backend::{AgentAction, DecisionBackend, TurnRequest};

/// Anthropic Messages API backend.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl AnthropicBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com/v1".into(),
            max_retries: 3,
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    fn build_request_body(&self, request: &TurnRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.task,
        }));

        // Each completed turn becomes an assistant tool_use block followed
        // by a user tool_result block, per the Messages API tool protocol.
        for turn in &request.transcript {
            messages.push(serde_json::json!({
                "role": "assistant",
                "content": [{
                    "type": "tool_use",
                    "id": turn.call.id,
                    "name": turn.call.tool_name,
                    "input": turn.call.arguments,
                }],
            }));
            messages.push(serde_json::json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": turn.result.tool_call_id,
                    "content": turn.result.content,
                    "is_error": turn.result.is_error(),
                }],
            }));
        }

        let tools: Vec<serde_json::Value> = request
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();

        serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": messages,
            "tools": tools,
        })
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2024-10-22")
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GauntletError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(GauntletError::RateLimited {
                    retry_after_secs: 30,
                });
            }
            return Err(GauntletError::Backend(format!("HTTP {status}: {text}")));
        }

        resp.json()
            .await
            .map_err(|e| GauntletError::Backend(e.to_string()))
    }

    fn parse_action(data: &serde_json::Value) -> AgentAction {
        // First tool_use block wins; the loop is strictly one call per turn.
        if let Some(blocks) = data["content"].as_array() {
            for block in blocks {
                if block["type"] == "tool_use" {
                    return AgentAction::ToolCall(ToolCall {
                        id: block["id"].as_str().unwrap_or("").to_string(),
                        tool_name: block["name"].as_str().unwrap_or("").to_string(),
                        arguments: block["input"].clone(),
                    });
                }
            }
        }

        let text = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| {
                        if b["type"] == "text" {
                            b["text"].as_str()
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        AgentAction::Done(text)
    }
}

#[async_trait]
impl DecisionBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn next_action(&self, request: &TurnRequest) -> Result<AgentAction> {
        let body = self.build_request_body(request);
        debug!(model = %request.model, turns = request.transcript.len(), "requesting next action");

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.send_once(&body).await {
                Ok(data) => return Ok(Self::parse_action(&data)),
                Err(e) => {
                    let backoff = match &e {
                        GauntletError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(*retry_after_secs)
                        }
                        _ => Duration::from_secs(2u64.pow(attempt.min(4))),
                    };
                    if attempt < self.max_retries {
                        warn!(error = %e, attempt, "backend request failed, retrying");
                        tokio::time::sleep(backoff).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| GauntletError::Backend("retries exhausted".into())))
    }

    async fn health_check(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(GauntletError::Backend("no API key configured".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TurnRecord;
    use gauntlet_core::{Tool, ToolResult};
    use std::sync::Arc;

    fn request_with_transcript(transcript: Vec<TurnRecord>) -> TurnRequest {
        TurnRequest {
            model: "claude-sonnet-4-20250514".into(),
            system: "system".into(),
            task: "do the thing".into(),
            transcript,
            tools: Arc::new(vec![Tool {
                name: "file_read".into(),
                description: "read".into(),
                parameters: serde_json::json!({"type": "object"}),
                is_mutating: false,
            }]),
            max_tokens: 1024,
        }
    }

    #[test]
    fn transcript_becomes_tool_use_and_tool_result_blocks() {
        let backend = AnthropicBackend::new("key".into());
        let call = ToolCall {
            id: "call_1".into(),
            tool_name: "file_read".into(),
            arguments: serde_json::json!({"path": "openapi.yaml"}),
        };
        let result = ToolResult::ok("call_1", "contents");
        let body = backend.build_request_body(&request_with_transcript(vec![TurnRecord {
            call,
            result,
        }]));

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"][0]["type"], "tool_use");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["is_error"], false);
    }

    #[test]
    fn parse_tool_use_block_as_tool_call() {
        let data = serde_json::json!({
            "content": [
                {"type": "text", "text": "linting first"},
                {"type": "tool_use", "id": "c1", "name": "cli_lint", "input": {"spec": "openapi.yaml"}}
            ]
        });
        match AnthropicBackend::parse_action(&data) {
            AgentAction::ToolCall(call) => {
                assert_eq!(call.tool_name, "cli_lint");
                assert_eq!(call.id, "c1");
            }
            AgentAction::Done(_) => panic!("expected tool call"),
        }
    }

    #[test]
    fn parse_text_only_as_done() {
        let data = serde_json::json!({
            "content": [{"type": "text", "text": "all finished"}]
        });
        match AnthropicBackend::parse_action(&data) {
            AgentAction::Done(text) => assert_eq!(text, "all finished"),
            AgentAction::ToolCall(_) => panic!("expected completion"),
        }
    }
}
