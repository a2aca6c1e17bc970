use std::fmt::Display;

use casabot_agent::tools::parse_run_command_args;
use chat_provider::{Message, Role, ToolCall};
use conversation_store::ConversationHistory;

pub const PROMPT: &str = "you › ";
pub const ASSISTANT_PREFIX: &str = "casabot › ";
pub const TOOL_RESULT_HEADER: &str = "[tool result]";

/// Lines of tool output shown before the rest is summarized.
pub const TOOL_PREVIEW_LINES: usize = 5;

pub const HELP_TEXT: &str = "\
Commands:
  /help           show this help
  /new            start a fresh conversation
  /history        list saved conversations
  /resume <id>    continue a saved conversation
  /quit           exit
Press Ctrl-C to cancel a running reply, or to exit at the prompt.";

/// Transcript lines for one message. System messages are not shown.
pub fn render_message(message: &Message) -> Vec<String> {
    match message.role {
        Role::System => Vec::new(),
        Role::User => vec![format!("{PROMPT}{}", message.content)],
        Role::Assistant => {
            let mut lines = Vec::new();
            if !message.content.trim().is_empty() {
                lines.push(format!("{ASSISTANT_PREFIX}{}", message.content));
            }
            lines.extend(message.tool_calls.iter().map(render_tool_call));
            lines
        }
        Role::Tool => {
            let mut lines = vec![TOOL_RESULT_HEADER.to_string()];
            lines.extend(truncate_output(&message.content, TOOL_PREVIEW_LINES));
            lines
        }
    }
}

fn render_tool_call(call: &ToolCall) -> String {
    let detail = parse_run_command_args(&call.arguments)
        .map(|args| args.command)
        .unwrap_or_else(|_| call.arguments.clone());
    format!("  ⚡ {}: {detail}", call.name)
}

/// First `max_lines` lines of `text`, then a count of the hidden rest.
pub fn truncate_output(text: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut shown: Vec<String> = lines
        .iter()
        .take(max_lines)
        .map(|line| line.to_string())
        .collect();
    if lines.len() > max_lines {
        shown.push(format!("  ... ({} more lines)", lines.len() - max_lines));
    }
    shown
}

pub fn render_error(error: &impl Display) -> String {
    format!("❌ Error: {error}")
}

/// One `/history` row: id, start time, size, and the opening request.
pub fn render_history_entry(conversation: &ConversationHistory) -> String {
    let opening = conversation
        .messages
        .iter()
        .find(|message| message.role == Role::User)
        .map(|message| preview(&message.content))
        .unwrap_or_default();
    format!(
        "{}  {}  {} messages  {opening}",
        conversation.id,
        conversation.started_at,
        conversation.messages.len()
    )
    .trim_end()
    .to_string()
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 48;
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > MAX_CHARS {
        let cut: String = first_line.chars().take(MAX_CHARS).collect();
        format!("{cut}…")
    } else {
        first_line.to_string()
    }
}
