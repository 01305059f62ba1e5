//! The interactive stdin command lexer.
//!
//! Commands are case-insensitive in their first word; the rest of the line
//! is passed through verbatim as the argument. Unrecognized first words
//! become [`Command::Unknown`] so the caller can print a hint rather than
//! silently ignoring a typo.

/// One parsed interactive command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Leave,
    Find(String),
    Connect(String),
    Disconnect,
    Message(String),
    RawMessage(String),
    Exit,
    Verbose(u8),
    List,
    Status,
    Help,
    Rickroll,
    Empty,
    Unknown(String),
}

/// Parses one line of stdin input into a [`Command`].
pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("").to_ascii_lowercase();
    let rest = parts.next().unwrap_or("").trim().to_string();

    match head.as_str() {
        "join" => Command::Join,
        "leave" => Command::Leave,
        "find" => Command::Find(rest),
        "connect" => Command::Connect(rest),
        "disconnect" => Command::Disconnect,
        "message" | "m" => Command::Message(rest),
        "mraw" => Command::RawMessage(rest),
        "exit" | "quit" => Command::Exit,
        "verbose" => Command::Verbose(rest.parse().unwrap_or(0)),
        "list" => Command::List,
        "status" => Command::Status,
        "help" => Command::Help,
        "rickroll" => Command::Rickroll,
        _ => Command::Unknown(head),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands_case_insensitively() {
        assert_eq!(parse("JOIN"), Command::Join);
        assert_eq!(parse("Leave"), Command::Leave);
        assert_eq!(parse("find dave.lannister"), Command::Find("dave.lannister".to_string()));
        assert_eq!(parse("m hello there"), Command::Message("hello there".to_string()));
    }

    #[test]
    fn parses_verbose_level() {
        assert_eq!(parse("verbose 3"), Command::Verbose(3));
        assert_eq!(parse("verbose"), Command::Verbose(0));
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse("   "), Command::Empty);
    }

    #[test]
    fn unknown_command_is_preserved() {
        assert_eq!(parse("frobnicate"), Command::Unknown("frobnicate".to_string()));
    }
}
