//! Console input -> commands -> messages.

use chat_core::Message;

use crate::error::CommandError;

pub const HELP: &str = "\
Commands:
  /p <name> <message>   private message
  /usuarios, /users     list connected users
  /salir, /quit         leave the chat
  /ayuda, /help         show this help
  anything else         public message to everybody";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Private { to: String, text: String },
    ListUsers,
    Quit,
    Help,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if !line.starts_with('/') {
        return Ok(Some(Command::Say(line.to_string())));
    }

    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim_start()),
        None => (line, ""),
    };

    let command = match cmd {
        "/p" => {
            let (to, text) = rest
                .split_once(char::is_whitespace)
                .ok_or(CommandError::PrivateUsage)?;
            let text = text.trim();
            if to.is_empty() || text.is_empty() {
                return Err(CommandError::PrivateUsage);
            }
            Command::Private {
                to: to.to_string(),
                text: text.to_string(),
            }
        }
        "/usuarios" | "/users" => Command::ListUsers,
        "/salir" | "/quit" => Command::Quit,
        "/ayuda" | "/help" => Command::Help,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

impl Command {
    /// The message to send for this command, if any. `me` is the
    /// registered name.
    pub fn to_message(&self, me: &str) -> Option<Message> {
        match self {
            Command::Say(text) => Some(Message::broadcast(me, text.as_str())),
            Command::Private { to, text } => Some(Message::private(me, to.as_str(), text.as_str())),
            Command::ListUsers => Some(Message::list_users(me)),
            Command::Quit => Some(Message::disconnect(me)),
            Command::Help => None,
        }
    }
}
