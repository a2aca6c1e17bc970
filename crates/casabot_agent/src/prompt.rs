use crate::paths::CasabotPaths;
use crate::skills::{format_skills_for_prompt, Skill};
use crate::tools::RUN_COMMAND_TOOL_NAME;

/// Builds the orchestrator system prompt for one run.
#[must_use]
pub fn build_system_prompt(skills: &[Skill], paths: &CasabotPaths) -> String {
    let skill_list = format_skills_for_prompt(skills);
    let home = paths.home.display();
    let skills_dir = paths.skills.display();
    let workspaces = paths.workspaces.display();
    let history = paths.history.display();
    let memory = paths.memory.display();
    let config_file = paths.config_file.display();

    format!(
        "You are the base agent of CasAbot. Like the supernova Cassiopeia A, you create anything freely.

## Core principles
1. You are an orchestrator. Do not do the actual work yourself.
2. Consult skill documents first. Read the SKILL.md of the skill you need and follow it.
3. Delegate to a suitable sub-agent; if none exists, create one and delegate to it.
4. Only orchestration (creating, delegating to, and managing agents) is done directly.

## Available tool
- `{RUN_COMMAND_TOOL_NAME}`: runs a terminal command. Reading skills, managing sub-agents, and all orchestration go through this one tool.

## Workflow
1. Analyse the user's request.
2. Read the relevant skill documents: `cat <skill path>`
3. Create or delegate to sub-agents as the skill instructs.
4. Collect the results and report back to the user.

## CasAbot directory layout
- Home: {home}
- Skills: {skills_dir}/
- Workspaces: {workspaces}/
- Conversation history: {history}/
- Memory: {memory}/
- Config: {config_file}

## {skill_list}
"
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::Map;

    use super::*;

    #[test]
    fn prompt_names_tool_layout_and_skills() {
        let paths = CasabotPaths::from_home("/opt/cb");
        let skills = vec![Skill {
            name: "agent".to_string(),
            description: "Manage agents".to_string(),
            metadata: Map::new(),
            instructions: String::new(),
            path: PathBuf::from("/opt/cb/skills/agent/SKILL.md"),
        }];

        let prompt = build_system_prompt(&skills, &paths);
        assert!(prompt.contains("`run_command`"));
        assert!(prompt.contains("- Home: /opt/cb\n"));
        assert!(prompt.contains("- Config: /opt/cb/casabot.json\n"));
        assert!(prompt.contains("## Available Skills:\n\n### agent\nManage agents\nPath: /opt/cb/skills/agent/SKILL.md"));
    }

    #[test]
    fn prompt_without_skills_uses_sentinel() {
        let prompt = build_system_prompt(&[], &CasabotPaths::from_home("/h"));
        assert!(prompt.ends_with("## No skills available.\n"));
    }
}
