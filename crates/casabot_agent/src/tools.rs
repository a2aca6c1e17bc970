use chat_provider::{ToolCall, ToolDefinition};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::executor::CommandExecutor;

pub const RUN_COMMAND_TOOL_NAME: &str = "run_command";

/// The single host tool advertised to the model.
#[must_use]
pub fn run_command_tool() -> ToolDefinition {
    ToolDefinition {
        name: RUN_COMMAND_TOOL_NAME.to_string(),
        description: "Executes a command in the terminal. Use this to read skill documents, \
                      manage sub-agents, or perform system tasks."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Terminal command to execute"
                }
            },
            "required": ["command"]
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunCommandArgs {
    pub command: String,
}

pub fn parse_run_command_args(arguments: &str) -> Result<RunCommandArgs, serde_json::Error> {
    serde_json::from_str(arguments)
}

/// Resolves one tool call to the text of its `tool` reply.
///
/// Malformed arguments and unknown tool names are answered with a readable
/// error instead of failing the run.
pub async fn dispatch_tool_call(executor: &CommandExecutor, call: &ToolCall) -> String {
    if call.name != RUN_COMMAND_TOOL_NAME {
        return format!("Unknown tool: {}", call.name);
    }

    match parse_run_command_args(&call.arguments) {
        Ok(args) => {
            debug!(tool_call_id = %call.id, command = %args.command, "running command");
            executor.execute(&args.command).await
        }
        Err(error) => {
            debug!(tool_call_id = %call.id, %error, "unparsable tool arguments");
            format!("Error: failed to parse tool arguments: {}", call.arguments)
        }
    }
}
