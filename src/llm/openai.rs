//! OpenAI-compatible chat completions client
//!
//! Works against api.openai.com or any server exposing `/chat/completions`
//! with function tools. Uses a long-lived reqwest::Client for connection pooling.

use crate::config::LlmConfig;
use crate::error::AgentError;
use crate::llm::{ChatCompletion, ChatMessage, ChatModel, ToolCall, ToolDefinition};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

pub struct OpenAiChatModel {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatCompletion> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: messages.iter().map(OpenAiMessage::from).collect(),
            tools: tools.iter().map(OpenAiTool::from).collect(),
        };

        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Calling chat completions"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion request failed: {}", e);
                AgentError::LlmError(format!("Chat completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Chat completion error response: {}", error_text);
            return Err(AgentError::LlmError(format!(
                "Chat completion returned {}: {}",
                status, error_text
            )));
        }

        let body: OpenAiResponse = response.json().await.map_err(|e| {
            AgentError::LlmError(format!("Chat completion parse error: {}", e))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            AgentError::LlmError("Chat completion returned no choices".to_string())
        })?;

        if let Some(usage) = body.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                finish_reason = ?choice.finish_reason,
                "Chat completion received"
            );
        }

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(parse_tool_call)
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatCompletion {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason,
        })
    }
}

fn parse_tool_call(call: OpenAiResponseToolCall) -> Result<ToolCall> {
    // Some servers send "" for argument-less calls
    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_str(raw).map_err(|e| {
            AgentError::LlmError(format!(
                "Malformed arguments for tool call {}: {}",
                call.function.name, e
            ))
        })?
    };

    Ok(ToolCall {
        id: call.id,
        name: call.function.name,
        arguments,
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ChatMessage> for OpenAiMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        match message {
            ChatMessage::System { content } => Self::plain("system", content),
            ChatMessage::User { content } => Self::plain("user", content),
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => Self {
                role: "assistant",
                content: content.as_deref(),
                tool_calls: (!tool_calls.is_empty())
                    .then(|| tool_calls.iter().map(OpenAiToolCall::from).collect()),
                tool_call_id: None,
            },
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => Self {
                role: "tool",
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_call_id),
            },
        }
    }
}

impl<'a> OpenAiMessage<'a> {
    fn plain(role: &'static str, content: &'a str) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAiFunctionCall<'a>,
}

impl<'a> From<&'a ToolCall> for OpenAiToolCall<'a> {
    fn from(call: &'a ToolCall) -> Self {
        Self {
            id: &call.id,
            tool_type: "function",
            function: OpenAiFunctionCall {
                name: &call.name,
                arguments: call.arguments.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiFunctionCall<'a> {
    name: &'a str,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAiFunction<'a>,
}

impl<'a> From<&'a ToolDefinition> for OpenAiTool<'a> {
    fn from(tool: &'a ToolDefinition) -> Self {
        Self {
            tool_type: "function",
            function: OpenAiFunction {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameters,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseToolCall {
    id: String,
    function: OpenAiResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
