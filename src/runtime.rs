//! Line-oriented chat loop.
//!
//! Input arrives as [`InputEvent`]s on one channel, fed by a stdin reader
//! thread and a Ctrl-C listener task. While a run is active, interrupts cancel
//! it and typed lines are dropped, so a conversation never has two runs.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::pin::pin;

use casabot_agent::{load_skills, Agent, AgentError, CancelSignal};
use chat_provider::Message;
use conversation_store::{ConversationHistory, ConversationStoreError};
use futures_util::StreamExt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::app::{render_error, render_history_entry, render_message, HELP_TEXT, PROMPT};
use crate::commands::{parse_slash_command, SlashCommand};

pub const BUSY_NOTICE: &str = "⏳ Still working; input ignored. Press Ctrl-C to cancel.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

enum RunStep {
    Interrupt,
    Line,
    Produced(Option<Result<Message, AgentError>>),
}

/// The agent plus the conversation currently being continued.
pub struct Session {
    agent: Agent,
    skills_dir: PathBuf,
    conversation: ConversationHistory,
}

impl Session {
    /// Starts on a fresh conversation.
    pub fn new(agent: Agent, skills_dir: impl Into<PathBuf>) -> Result<Self, ConversationStoreError> {
        Ok(Self {
            agent,
            skills_dir: skills_dir.into(),
            conversation: ConversationHistory::new()?,
        })
    }

    #[must_use]
    pub fn conversation(&self) -> &ConversationHistory {
        &self.conversation
    }

    #[must_use]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    async fn submit<W: Write>(
        &mut self,
        input: String,
        events: &mut UnboundedReceiver<InputEvent>,
        output: &mut W,
    ) -> io::Result<()> {
        // Skills are re-read per run; the agent may have written new ones.
        let skills = match load_skills(&self.skills_dir).await {
            Ok(skills) => skills,
            Err(error) => {
                warn!(%error, "failed to load skills");
                Vec::new()
            }
        };

        let cancel = CancelSignal::new();
        let mut stream = pin!(self
            .agent
            .run(&mut self.conversation, input, &skills, cancel.clone()));

        loop {
            let step = tokio::select! {
                biased;
                Some(event) = events.recv(), if !cancel.is_cancelled() => match event {
                    InputEvent::Interrupt => RunStep::Interrupt,
                    InputEvent::Line(_) => RunStep::Line,
                },
                produced = stream.next() => RunStep::Produced(produced),
            };

            match step {
                RunStep::Interrupt => {
                    debug!("cancelling active run");
                    cancel.cancel();
                }
                RunStep::Line => writeln!(output, "{BUSY_NOTICE}")?,
                RunStep::Produced(Some(Ok(message))) => {
                    for line in render_message(&message) {
                        writeln!(output, "{line}")?;
                    }
                }
                RunStep::Produced(Some(Err(error))) => {
                    writeln!(output, "{}", render_error(&error))?;
                    break;
                }
                RunStep::Produced(None) => break,
            }
            output.flush()?;
        }
        Ok(())
    }

    async fn handle_command<W: Write>(&mut self, command: SlashCommand, output: &mut W) -> io::Result<Flow> {
        match command {
            SlashCommand::Help => writeln!(output, "{HELP_TEXT}")?,
            SlashCommand::Quit => return Ok(Flow::Exit),
            SlashCommand::New => match ConversationHistory::new() {
                Ok(conversation) => {
                    self.conversation = conversation;
                    writeln!(output, "Started conversation {}", self.conversation.id)?;
                }
                Err(error) => writeln!(output, "{}", render_error(&error))?,
            },
            SlashCommand::History => match self.agent.store().list().await {
                Ok(conversations) if conversations.is_empty() => {
                    writeln!(output, "No saved conversations.")?;
                }
                Ok(conversations) => {
                    for conversation in &conversations {
                        writeln!(output, "{}", render_history_entry(conversation))?;
                    }
                }
                Err(error) => writeln!(output, "{}", render_error(&error))?,
            },
            SlashCommand::Resume(None) => writeln!(output, "Usage: /resume <id>")?,
            SlashCommand::Resume(Some(id)) => match self.agent.store().load(&id).await {
                Ok(Some(conversation)) => {
                    self.conversation = conversation;
                    writeln!(output, "Resumed conversation {id}")?;
                    for message in &self.conversation.messages {
                        for line in render_message(message) {
                            writeln!(output, "{line}")?;
                        }
                    }
                }
                Ok(None) => writeln!(
                    output,
                    "{}",
                    render_error(&format!("conversation '{id}' not found"))
                )?,
                Err(error) => writeln!(output, "{}", render_error(&error))?,
            },
            SlashCommand::Unknown(name) => {
                writeln!(output, "Unknown command: {name}. Type /help for commands.")?;
            }
        }
        Ok(Flow::Continue)
    }
}

/// Reads input events until `/quit`, an interrupt at the prompt, or the end
/// of input.
pub async fn run_repl<W: Write>(
    session: &mut Session,
    events: &mut UnboundedReceiver<InputEvent>,
    output: &mut W,
) -> io::Result<()> {
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let line = match events.recv().await {
            None | Some(InputEvent::Interrupt) => break,
            Some(InputEvent::Line(line)) => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = parse_slash_command(line) {
            if session.handle_command(command, output).await? == Flow::Exit {
                break;
            }
            continue;
        }

        session.submit(line.to_string(), events, output).await?;
    }

    writeln!(output)?;
    output.flush()
}

/// Forwards stdin lines from a dedicated thread; dropping the sender at EOF
/// ends the loop.
pub fn spawn_stdin_reader(events: UnboundedSender<InputEvent>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("casabot-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if events.send(InputEvent::Line(line)).is_err() {
                    break;
                }
            }
        })
        .map(|_| ())
}

pub fn spawn_interrupt_listener(events: UnboundedSender<InputEvent>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if events.send(InputEvent::Interrupt).is_err() {
                break;
            }
        }
    });
}
