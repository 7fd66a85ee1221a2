//! Bot commands (`/start`, `/help`). Commands never reach the answer backend.

use crate::addressing::BotIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

/// Result of [`parse_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandParse {
    /// Plain text; goes through addressing.
    NotCommand,
    Known(Command),
    /// Unknown command, or a command addressed to another bot (`/help@otherbot`). Dropped.
    Ignored,
}

/// Classify `text`. A command is `/name` or `/name@handle` as the first token.
pub fn parse_command(text: &str, bot: &BotIdentity) -> CommandParse {
    let Some(rest) = text.trim_start().strip_prefix('/') else {
        return CommandParse::NotCommand;
    };
    if !rest.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return CommandParse::NotCommand;
    }
    let token = rest.split_whitespace().next().unwrap_or(rest);
    let (name, target) = match token.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (token, None),
    };
    if let Some(target) = target {
        let ours = bot
            .handle
            .as_deref()
            .is_some_and(|h| h.eq_ignore_ascii_case(target));
        if !ours {
            return CommandParse::Ignored;
        }
    }
    match name.to_ascii_lowercase().as_str() {
        "start" => CommandParse::Known(Command::Start),
        "help" => CommandParse::Known(Command::Help),
        _ => CommandParse::Ignored,
    }
}

impl Command {
    pub fn reply_text(self, bot: &BotIdentity) -> String {
        match self {
            Command::Start => "👋 Hello! I'm a smart bot.\n\n\
                 💬 Ask me any question!\n\n\
                 📌 Commands:\n\
                 /start - Show this message\n\
                 /help - Get help\n\n\
                 In groups, mention me or reply to my messages."
                .to_string(),
            Command::Help => {
                let mention = bot.mention().unwrap_or_else(|| "@your_bot".to_string());
                format!(
                    "🤖 How to use me:\n\n\
                     • In private: send your question\n\
                     • In groups: mention me ({}) or reply to one of my messages\n\n\
                     I answer all your questions!",
                    mention
                )
            }
        }
    }
}
