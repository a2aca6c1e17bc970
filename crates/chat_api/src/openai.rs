//! OpenAI Chat Completions wire mapping.

use chat_provider::{Message, Role, ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    /// `null` only for assistant turns that carry tool calls and no text.
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

fn function_kind() -> String {
    "function".to_string()
}

pub fn build_request(
    model: &str,
    messages: &[Message],
    tools: &[ToolDefinition],
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: messages.iter().map(to_wire_message).collect(),
        tools: tools.iter().map(to_wire_tool).collect(),
    }
}

fn to_wire_message(message: &Message) -> WireMessage {
    match message.role {
        Role::Tool => WireMessage {
            role: Role::Tool.as_str(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: Some(message.tool_call_id.clone().unwrap_or_default()),
        },
        Role::Assistant if message.has_tool_calls() => WireMessage {
            role: Role::Assistant.as_str(),
            content: (!message.content.is_empty()).then(|| message.content.clone()),
            tool_calls: Some(
                message
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: function_kind(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        },
        role => WireMessage {
            role: role.as_str(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
    }
}

fn to_wire_tool(tool: &ToolDefinition) -> WireTool {
    WireTool {
        kind: "function",
        function: WireFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Maps the first choice to a neutral assistant message.
///
/// Non-function tool calls are dropped; absent text becomes `""`.
pub fn into_message(response: ChatCompletionResponse) -> Result<Message, ApiError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ApiError::EmptyResponse)?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter(|call| call.kind == "function")
        .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
        .collect();

    Ok(Message::assistant_with_tool_calls(
        choice.message.content.unwrap_or_default(),
        tool_calls,
    ))
}
