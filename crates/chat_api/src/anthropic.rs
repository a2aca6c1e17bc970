//! Anthropic Messages wire mapping.
//!
//! System turns are lifted into the top-level `system` field, tool results
//! become `tool_result` blocks inside user turns, and consecutive results are
//! merged into one user turn because the API requires strict role alternation.

use chat_provider::{Message, Role, ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response budget sent with every request.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: WireContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

pub fn build_request(model: &str, messages: &[Message], tools: &[ToolDefinition]) -> MessagesRequest {
    let system_parts: Vec<&str> = messages
        .iter()
        .filter(|message| message.role == Role::System)
        .map(|message| message.content.as_str())
        .collect();
    let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));

    let mut wire: Vec<WireMessage> = Vec::new();
    let mut previous_was_tool = false;
    for message in messages {
        match message.role {
            Role::System => continue,
            Role::User => wire.push(WireMessage {
                role: "user",
                content: WireContent::Text(message.content.clone()),
            }),
            Role::Assistant => wire.push(assistant_message(message)),
            Role::Tool => {
                let block = ContentBlock::ToolResult {
                    tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                    content: message.content.clone(),
                };
                match wire.last_mut() {
                    Some(WireMessage {
                        content: WireContent::Blocks(blocks),
                        ..
                    }) if previous_was_tool => blocks.push(block),
                    _ => wire.push(WireMessage {
                        role: "user",
                        content: WireContent::Blocks(vec![block]),
                    }),
                }
            }
        }
        previous_was_tool = message.role == Role::Tool;
    }

    MessagesRequest {
        model: model.to_string(),
        max_tokens: DEFAULT_MAX_TOKENS,
        system,
        messages: wire,
        tools: tools
            .iter()
            .map(|tool| WireTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.parameters.clone(),
            })
            .collect(),
    }
}

fn assistant_message(message: &Message) -> WireMessage {
    if !message.has_tool_calls() {
        return WireMessage {
            role: "assistant",
            content: WireContent::Text(message.content.clone()),
        };
    }

    let mut blocks = Vec::with_capacity(message.tool_calls.len() + 1);
    if !message.content.is_empty() {
        blocks.push(ContentBlock::Text {
            text: message.content.clone(),
        });
    }
    blocks.extend(message.tool_calls.iter().map(|call| ContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.name.clone(),
        input: parse_arguments(&call.arguments),
    }));

    WireMessage {
        role: "assistant",
        content: WireContent::Blocks(blocks),
    }
}

/// Unparsable or non-object arguments are sent as `{}`.
fn parse_arguments(arguments: &str) -> Value {
    match serde_json::from_str::<Value>(arguments) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}

/// Joins text blocks and collects `tool_use` blocks in order.
pub fn into_message(response: MessagesResponse) -> Message {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ResponseBlock::Text { text: chunk } => text.push_str(&chunk),
            ResponseBlock::ToolUse { id, name, input } => {
                let input = if input.is_null() {
                    Value::Object(Map::new())
                } else {
                    input
                };
                tool_calls.push(ToolCall::new(id, name, input.to_string()));
            }
            ResponseBlock::Other => {}
        }
    }

    Message::assistant_with_tool_calls(text, tool_calls)
}
