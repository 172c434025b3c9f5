//! In-chat commands shared by the TUI and headless mode.

/// Profile edits and lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    Show,
    Name(String),
    Concern(String),
    Preference { key: String, value: String },
}

/// A line the user typed that is a command rather than a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Profile(ProfileCommand),
    CheckIn,
    Clear,
    Quit,
}

/// Why a command line could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError(pub &'static str);

impl Command {
    /// Parse a line as a command.
    ///
    /// Returns `None` for ordinary chat. A leading `:` is accepted so the TUI
    /// can share this parser.
    pub fn parse(line: &str) -> Option<Result<Command, UsageError>> {
        let line = line.trim();
        let line = line.strip_prefix(':').unwrap_or(line).trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let bare = |cmd: Command| rest.is_empty().then_some(Ok(cmd));
        match head.to_lowercase().as_str() {
            "help" | "h" | "?" => bare(Command::Help),
            "checkin" | "check-in" => bare(Command::CheckIn),
            "clear" => bare(Command::Clear),
            "quit" | "exit" | "q" => bare(Command::Quit),
            "profile" => Some(parse_profile(rest).map(Command::Profile)),
            _ => None,
        }
    }
}

fn parse_profile(args: &str) -> Result<ProfileCommand, UsageError> {
    let (sub, value) = match args.split_once(char::is_whitespace) {
        Some((sub, value)) => (sub, value.trim()),
        None => (args, ""),
    };

    match sub.to_lowercase().as_str() {
        "" | "show" => Ok(ProfileCommand::Show),
        "name" if !value.is_empty() => Ok(ProfileCommand::Name(value.to_string())),
        "name" => Err(UsageError("Usage: profile name <your name>")),
        "concern" if !value.is_empty() => Ok(ProfileCommand::Concern(value.to_string())),
        "concern" => Err(UsageError("Usage: profile concern <something on your mind>")),
        "pref" | "preference" => match value.split_once('=') {
            Some((key, val)) if !key.trim().is_empty() => Ok(ProfileCommand::Preference {
                key: key.trim().to_string(),
                value: val.trim().to_string(),
            }),
            _ => Err(UsageError("Usage: profile pref <key>=<value>")),
        },
        _ => Err(UsageError(
            "Usage: profile [show | name <n> | concern <c> | pref <k>=<v>]",
        )),
    }
}

pub const HELP_TEXT: &str = "\
Just type to talk. Commands:
  help                    Show this help
  profile                 Show what I remember about you
  profile name <name>     Tell me what to call you
  profile concern <text>  Add something you're dealing with
  profile pref <k>=<v>    Set a preference (e.g. tone=gentle)
  checkin                 Get today's check-in
  clear                   Start the conversation fresh
  quit / exit             Save and leave";
