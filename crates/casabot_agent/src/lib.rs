//! Agent loop for casabot.
//!
//! The loop sends a conversation to a [`chat_provider::ChatProvider`], runs the
//! `run_command` tool the model asks for, feeds results back, and repeats
//! until the model stops calling tools or a limit is hit. Every produced
//! message is persisted through `conversation_store` before it is yielded.

pub mod agent;
pub mod cancel;
pub mod executor;
pub mod paths;
pub mod prompt;
pub mod skills;
pub mod tools;

pub use agent::{Agent, AgentConfig, AgentError};
pub use cancel::{await_or_cancel, sleep_or_cancel, CancelSignal, Cancelled};
pub use executor::{CommandExecutor, ExecutorConfig};
pub use paths::CasabotPaths;
pub use prompt::build_system_prompt;
pub use skills::{format_skills_for_prompt, load_skills, Skill, SkillLoadError};
pub use tools::{run_command_tool, RUN_COMMAND_TOOL_NAME};
