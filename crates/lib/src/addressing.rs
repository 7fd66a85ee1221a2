//! Addressing: decide whether an inbound message is directed at the bot, and clean the question.
//!
//! Rules, first match wins: private chats always; replies to one of the bot's
//! messages; text containing `@handle`. A message with no text, or whose text is
//! empty once the mention is removed, is never answered. Pure and total, so it is
//! tested without any channel or backend.

use crate::channels::{ConversationKind, InboundMessage};

/// The bot's own identity for the running session (Telegram getMe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    /// Username without the leading `@`.
    pub handle: Option<String>,
}

impl BotIdentity {
    pub fn new(id: i64, handle: Option<String>) -> Self {
        let handle = handle
            .map(|h| h.trim().trim_start_matches('@').to_string())
            .filter(|h| !h.is_empty());
        Self { id, handle }
    }

    /// `@handle`, if the bot has a handle.
    pub fn mention(&self) -> Option<String> {
        self.handle.as_ref().map(|h| format!("@{}", h))
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingDecision {
    Skip,
    Respond { question: String },
}

impl AddressingDecision {
    pub fn should_respond(&self) -> bool {
        matches!(self, AddressingDecision::Respond { .. })
    }

    pub fn cleaned_question(&self) -> Option<&str> {
        match self {
            AddressingDecision::Respond { question } => Some(question),
            AddressingDecision::Skip => None,
        }
    }
}

/// Decide whether to answer `msg` and, if so, the question to send to the backend.
pub fn decide(msg: &InboundMessage, bot: &BotIdentity) -> AddressingDecision {
    let addressed = match msg.kind {
        ConversationKind::Private => true,
        ConversationKind::Group => {
            msg.reply_to_sender_id == Some(bot.id)
                || bot.handle.as_deref().is_some_and(|h| msg.mentions(h))
        }
    };
    if !addressed {
        return AddressingDecision::Skip;
    }
    let Some(text) = msg.text.as_deref() else {
        return AddressingDecision::Skip;
    };
    let question = clean_question(text, bot.handle.as_deref());
    if question.is_empty() {
        AddressingDecision::Skip
    } else {
        AddressingDecision::Respond { question }
    }
}

/// Remove every `@handle` from `text` and trim. Idempotent: removal repeats until
/// no mention is left, so nested forms like `@my@mybotbot` are fully stripped.
pub fn clean_question(text: &str, handle: Option<&str>) -> String {
    let mut cleaned = text.to_string();
    if let Some(h) = handle.filter(|h| !h.is_empty()) {
        let mention = format!("@{}", h);
        while cleaned.contains(&mention) {
            cleaned = cleaned.replace(&mention, "");
        }
    }
    cleaned.trim().to_string()
}
