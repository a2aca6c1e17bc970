use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chat_provider::{ChatProvider, Message, ProviderError, Role, ToolCall};
use conversation_store::{ConversationHistory, ConversationStore, ConversationStoreError};
use futures_util::Stream;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cancel::{await_or_cancel, sleep_or_cancel, CancelSignal, Cancelled};
use crate::executor::{CommandExecutor, ERROR_MARKER};
use crate::paths::CasabotPaths;
use crate::prompt::build_system_prompt;
use crate::skills::Skill;
use crate::tools::{dispatch_tool_call, run_command_tool};

pub const ITERATION_LIMIT_MESSAGE: &str =
    "⚠️ Reached the maximum number of iterations. Please try your request again.";

/// Ends a run cancelled during its tool-call batch. Not persisted.
pub const CANCELLED_NOTICE: &str = "⏹ Cancelled.";

/// Loop limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub max_iterations: usize,
    /// Retries after the first failed provider call.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(2000),
        }
    }
}

impl AgentConfig {
    /// `retry_base_delay * 2^attempt`, for a zero-based attempt.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("provider failed after {attempts} attempts: {source}")]
    ProviderExhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },
    #[error(transparent)]
    Store(#[from] ConversationStoreError),
}

/// Drives one provider against persisted conversations.
///
/// An `Agent` is shared across runs; each call to [`Agent::run`] borrows the
/// conversation mutably, so two runs can never write the same history at once.
pub struct Agent {
    provider: Arc<dyn ChatProvider>,
    store: ConversationStore,
    executor: CommandExecutor,
    paths: CasabotPaths,
    config: AgentConfig,
}

impl Agent {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, store: ConversationStore, paths: CasabotPaths) -> Self {
        Self {
            provider,
            store,
            executor: CommandExecutor::default(),
            paths,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: CommandExecutor) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn ChatProvider> {
        &self.provider
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Runs one user turn and yields every message as it is produced.
    ///
    /// Persisted messages are written before they are yielded. Retry notices
    /// and the cancellation notice are yielded only. The stream ends after a
    /// reply without tool calls, after the iteration-limit warning, on
    /// cancellation, or with the single error that escapes a run: exhausted
    /// provider retries or a failed store write.
    ///
    /// Cancellation seen before a provider call or during backoff ends the
    /// stream silently. Seen during a tool-call batch, it skips the calls not
    /// yet dispatched and ends with [`CANCELLED_NOTICE`]. A command already
    /// running is not killed; its result is persisted first.
    ///
    /// Tool calls left unanswered by an earlier cancelled run are answered
    /// with an error reply first, so the history stays valid for providers.
    pub fn run<'a>(
        &'a self,
        conversation: &'a mut ConversationHistory,
        user_message: String,
        skills: &'a [Skill],
        cancel: CancelSignal,
    ) -> impl Stream<Item = Result<Message, AgentError>> + 'a {
        async_stream::try_stream! {
            let span = info_span!("agent_run", conversation_id = %conversation.id);
            info!(parent: &span, provider = %self.provider.profile().provider_id, "run started");

            for stale in stale_tool_replies(conversation) {
                debug!(parent: &span, tool_call_id = ?stale.tool_call_id, "answering stale tool call");
                self.store.append(conversation, stale.clone()).await?;
                yield stale;
            }
            self.store.append(conversation, Message::user(user_message)).await?;

            let system_prompt = build_system_prompt(skills, &self.paths);
            let tools = vec![run_command_tool()];
            let mut finished = false;

            'iterations: for iteration in 0..self.config.max_iterations {
                if cancel.is_cancelled() {
                    info!(parent: &span, iteration, "cancelled before provider call");
                    finished = true;
                    break 'iterations;
                }

                let mut request = Vec::with_capacity(conversation.messages.len() + 1);
                request.push(Message::system(system_prompt.clone()));
                request.extend(conversation.messages.iter().cloned());

                let mut attempt: u32 = 0;
                let reply = loop {
                    let call = self.provider.chat(&request, &tools).instrument(span.clone());
                    match await_or_cancel(call, &cancel).await {
                        Err(Cancelled) => break None,
                        Ok(Ok(reply)) => break Some(reply),
                        Ok(Err(error)) if attempt < self.config.max_retries => {
                            let delay = self.config.retry_delay(attempt);
                            warn!(
                                parent: &span,
                                iteration,
                                attempt,
                                retryable = error.is_retryable(),
                                %error,
                                "provider call failed; retrying"
                            );
                            yield retry_notice(&error, attempt, self.config.max_retries, delay);
                            attempt += 1;
                            if sleep_or_cancel(delay, &cancel).await.is_err() {
                                break None;
                            }
                        }
                        Ok(Err(error)) => {
                            warn!(parent: &span, iteration, attempt, %error, "provider retries exhausted");
                            Err(AgentError::ProviderExhausted {
                                attempts: attempt + 1,
                                source: error,
                            })?;
                        }
                    }
                };

                let Some(reply) = reply else {
                    info!(parent: &span, iteration, attempt, "cancelled during provider call");
                    finished = true;
                    break 'iterations;
                };

                self.store.append(conversation, reply.clone()).await?;
                yield reply.clone();

                if !reply.has_tool_calls() {
                    finished = true;
                    break 'iterations;
                }

                for call in &reply.tool_calls {
                    if cancel.is_cancelled() {
                        info!(parent: &span, iteration, tool_call_id = %call.id, "cancelled before tool dispatch");
                        break;
                    }

                    debug!(parent: &span, iteration, tool_call_id = %call.id, tool = %call.name, "dispatching tool call");
                    let output = dispatch_tool_call(&self.executor, call)
                        .instrument(span.clone())
                        .await;
                    let tool_message = Message::tool(call.id.clone(), output);
                    self.store.append(conversation, tool_message.clone()).await?;
                    yield tool_message;
                }

                if cancel.is_cancelled() {
                    info!(parent: &span, iteration, "cancelled after tool batch");
                    yield Message::assistant(CANCELLED_NOTICE);
                    finished = true;
                    break 'iterations;
                }
            }

            if !finished {
                warn!(parent: &span, limit = self.config.max_iterations, "iteration limit reached");
                let warning = Message::assistant(ITERATION_LIMIT_MESSAGE);
                self.store.append(conversation, warning.clone()).await?;
                yield warning;
            }

            info!(parent: &span, messages = conversation.messages.len(), "run finished");
        }
    }
}

fn retry_notice(error: &ProviderError, attempt: u32, max_retries: u32, delay: Duration) -> Message {
    Message::assistant(format!(
        "⚠️ Provider error: {error}. Retrying in {}s ({}/{max_retries})...",
        delay.as_secs_f64(),
        attempt + 1,
    ))
}

/// Error replies for tool calls of the latest assistant turn that were never
/// answered.
///
/// Only applies while that turn is still the tail of the history (followed by
/// tool replies at most).
fn stale_tool_replies(conversation: &ConversationHistory) -> Vec<Message> {
    let Some(index) = conversation
        .messages
        .iter()
        .rposition(|message| message.role == Role::Assistant)
    else {
        return Vec::new();
    };

    let tail = &conversation.messages[index + 1..];
    if tail.iter().any(|message| message.role != Role::Tool) {
        return Vec::new();
    }

    let answered: HashSet<&str> = tail
        .iter()
        .filter_map(|message| message.tool_call_id.as_deref())
        .collect();

    conversation.messages[index]
        .tool_calls
        .iter()
        .filter(|call| !answered.contains(call.id.as_str()))
        .map(stale_reply)
        .collect()
}

fn stale_reply(call: &ToolCall) -> Message {
    Message::tool(call.id.clone(), format!("{ERROR_MARKER}\ncancelled before it ran"))
}
