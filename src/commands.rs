#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    New,
    History,
    Resume(Option<String>),
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed).to_string();

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/new" => SlashCommand::New,
        "/history" => SlashCommand::History,
        "/resume" => SlashCommand::Resume(words.next().map(str::to_string)),
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_slash_command("list my skills"), None);
        assert_eq!(parse_slash_command(""), None);
    }

    #[test]
    fn known_commands_parse() {
        assert_eq!(parse_slash_command(" /help "), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("/new"), Some(SlashCommand::New));
        assert_eq!(parse_slash_command("/history"), Some(SlashCommand::History));
        assert_eq!(parse_slash_command("/quit"), Some(SlashCommand::Quit));
        assert_eq!(parse_slash_command("/exit"), Some(SlashCommand::Quit));
    }

    #[test]
    fn resume_takes_an_optional_id() {
        assert_eq!(
            parse_slash_command("/resume abc-123"),
            Some(SlashCommand::Resume(Some("abc-123".to_string())))
        );
        assert_eq!(parse_slash_command("/resume"), Some(SlashCommand::Resume(None)));
    }

    #[test]
    fn unknown_command_keeps_its_name() {
        assert_eq!(
            parse_slash_command("/frobnicate now"),
            Some(SlashCommand::Unknown("/frobnicate".to_string()))
        );
    }
}
