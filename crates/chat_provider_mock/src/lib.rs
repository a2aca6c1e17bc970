//! Deterministic scripted implementation of the shared `chat_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for offline
//! runs and loop-level integration testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chat_provider::{
    CancelSignal, ChatProvider, Message, ProviderError, ProviderProfile, Role, ToolDefinition,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// One scripted outcome for a single `chat` call.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Message(Message),
    Error(ProviderError),
    /// Returns the message and fires the signal, as if the user cancelled
    /// right after the reply arrived.
    MessageThenCancel(Message, CancelSignal),
    /// Never resolves; only cancellation can end the wait.
    Hang,
}

impl From<Message> for ScriptedReply {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<ProviderError> for ScriptedReply {
    fn from(error: ProviderError) -> Self {
        Self::Error(error)
    }
}

/// Snapshot of one recorded `chat` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// Provider that replays queued replies in order.
///
/// Once the script runs out it answers with a plain assistant echo of the
/// latest user turn, so offline sessions never stall.
#[derive(Debug, Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockProvider {
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<ScriptedReply>) {
        lock_unpoisoned(&self.replies).push_back(reply.into());
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    #[must_use]
    pub fn remaining_replies(&self) -> usize {
        lock_unpoisoned(&self.replies).len()
    }

    fn echo(messages: &[Message]) -> Message {
        let last_user = messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        Message::assistant(format!("(mock) {last_user}"))
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: "mock".to_string(),
        }
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        lock_unpoisoned(&self.requests).push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });

        let next = lock_unpoisoned(&self.replies).pop_front();
        match next {
            None => Ok(Self::echo(messages)),
            Some(ScriptedReply::Message(message)) => Ok(message),
            Some(ScriptedReply::Error(error)) => Err(error),
            Some(ScriptedReply::MessageThenCancel(message, cancel)) => {
                cancel.cancel();
                Ok(message)
            }
            Some(ScriptedReply::Hang) => std::future::pending().await,
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
