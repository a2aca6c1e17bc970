//! Provider-neutral chat contract shared by the agent loop, the conversation
//! store, and every vendor adapter.
//!
//! This crate defines only the neutral message model and the single-call
//! provider interface. Wire formats, HTTP transport, and retry policy live
//! elsewhere: adapters map to and from vendors, the agent loop owns retries.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shared cancellation signal for one agent run.
///
/// Cancelling wakes every task awaiting [`CancelSignal::cancelled`], so waits
/// can be interrupted without polling.
pub type CancelSignal = tokio_util::sync::CancellationToken;

/// Error returned while constructing/configuring a provider before any call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

/// Model-issued request to invoke a named tool.
///
/// `arguments` is the raw serialized payload exactly as the model produced it.
/// It may not parse; callers treat that as recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// One turn in a conversation.
///
/// `tool_calls` is only populated for assistant turns and `tool_call_id` only
/// for tool turns. Use the role-specific constructors to keep that shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    #[must_use]
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Returns true when this is an assistant turn that requests tool execution.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Host tool exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema describing the arguments object.
    pub parameters: Value,
}

/// Failure of a single provider call.
///
/// Adapters never retry. `retryable` tells the caller whether the fault looks
/// transient (network, rate limit, 5xx) so it can be logged accordingly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
    status: Option<u16>,
    retryable: bool,
}

impl ProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retryable: true,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Immutable metadata describing a chat provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// One configured model vendor.
///
/// `chat` performs exactly one request: it maps the neutral history to the
/// vendor wire format, sends it, and maps the reply back to a single assistant
/// message carrying text and zero or more tool calls.
#[async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{
        async_trait, ChatProvider, Message, ProviderError, ProviderInitError, ProviderProfile,
        Role, ToolCall, ToolDefinition,
    };

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        fn profile(&self) -> ProviderProfile {
            ProviderProfile {
                provider_id: "echo".to_string(),
                model_id: "echo-model".to_string(),
            }
        }

        async fn chat(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<Message, ProviderError> {
            let last = messages
                .last()
                .ok_or_else(|| ProviderError::new("empty history"))?;
            Ok(Message::assistant(last.content.clone()))
        }
    }

    #[test]
    fn provider_init_error_preserves_message() {
        let error = ProviderInitError::new("missing api key");
        assert_eq!(error.message(), "missing api key");
        assert_eq!(error.to_string(), "missing api key");
    }

    #[test]
    fn plain_messages_serialize_without_tool_fields() {
        let value = serde_json::to_value(Message::user("hello")).expect("serialize user message");
        assert_eq!(value, json!({ "role": "user", "content": "hello" }));
    }

    #[test]
    fn tool_messages_use_camel_case_back_reference() {
        let value =
            serde_json::to_value(Message::tool("call-1", "ok")).expect("serialize tool message");
        assert_eq!(
            value,
            json!({ "role": "tool", "content": "ok", "toolCallId": "call-1" })
        );
    }

    #[test]
    fn assistant_tool_calls_round_trip_through_json() {
        let message = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("call-7", "run_command", r#"{"command":"ls"}"#)],
        );
        let raw = serde_json::to_string(&message).expect("serialize assistant message");
        assert!(raw.contains("\"toolCalls\""));

        let parsed: Message = serde_json::from_str(&raw).expect("parse assistant message");
        assert_eq!(parsed, message);
        assert!(parsed.has_tool_calls());
    }

    #[test]
    fn missing_tool_fields_default_when_parsing() {
        let parsed: Message =
            serde_json::from_value(json!({ "role": "assistant", "content": "done" }))
                .expect("parse assistant message");
        assert_eq!(parsed.role, Role::Assistant);
        assert!(parsed.tool_calls.is_empty());
        assert!(parsed.tool_call_id.is_none());
        assert!(!parsed.has_tool_calls());
    }

    #[test]
    fn provider_error_defaults_to_retryable_without_status() {
        let error = ProviderError::new("connection reset");
        assert!(error.is_retryable());
        assert_eq!(error.status(), None);

        let error = ProviderError::new("bad key")
            .with_status(401)
            .with_retryable(false);
        assert_eq!(error.status(), Some(401));
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "bad key");
    }

    #[tokio::test]
    async fn trait_objects_are_callable_through_dyn_dispatch() {
        let provider: Box<dyn ChatProvider> = Box::new(EchoProvider);
        let reply = provider
            .chat(&[Message::user("ping")], &[])
            .await
            .expect("echo reply");

        assert_eq!(reply, Message::assistant("ping"));
        assert_eq!(provider.profile().provider_id, "echo");
    }
}
