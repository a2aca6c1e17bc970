#![allow(dead_code)]

use std::sync::Arc;

use casabot_agent::{Agent, AgentConfig, AgentError, CancelSignal, CasabotPaths};
use chat_provider::Message;
use chat_provider_mock::{MockProvider, ScriptedReply};
use conversation_store::{ConversationHistory, ConversationStore};
use futures_util::StreamExt;
use tempfile::TempDir;

pub struct Harness {
    pub dir: TempDir,
    pub provider: Arc<MockProvider>,
    pub agent: Agent,
    pub conversation: ConversationHistory,
}

impl Harness {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self::with_config(replies, AgentConfig::default())
    }

    pub fn with_config(replies: impl IntoIterator<Item = ScriptedReply>, config: AgentConfig) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = CasabotPaths::from_home(dir.path());
        let store = ConversationStore::new(paths.history.clone());
        let provider = Arc::new(MockProvider::new(replies));
        let agent = Agent::new(provider.clone(), store, paths).with_config(config);
        let conversation = ConversationHistory::with_id("conv-test", "2026-02-14T00:00:00Z");

        Self {
            dir,
            provider,
            agent,
            conversation,
        }
    }

    /// Runs one turn to completion.
    pub async fn drive(&mut self, input: &str, cancel: CancelSignal) -> RunOutcome {
        let stream = self
            .agent
            .run(&mut self.conversation, input.to_string(), &[], cancel);
        futures_util::pin_mut!(stream);

        let mut produced = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(message) => produced.push(message),
                Err(error) => {
                    return RunOutcome {
                        produced,
                        error: Some(error),
                    };
                }
            }
        }
        RunOutcome {
            produced,
            error: None,
        }
    }

    pub async fn persisted(&self) -> Vec<Message> {
        self.agent
            .store()
            .load(&self.conversation.id)
            .await
            .expect("load")
            .expect("conversation persisted")
            .messages
    }
}

pub struct RunOutcome {
    pub produced: Vec<Message>,
    pub error: Option<AgentError>,
}

pub fn contents(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|message| message.content.as_str()).collect()
}
