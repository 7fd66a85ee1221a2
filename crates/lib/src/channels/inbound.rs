//! Inbound message from a channel: the minimal view of a platform message the dispatcher reads.

/// Kind of conversation a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    /// One-to-one chat with the bot.
    Private,
    /// Group, supergroup or channel.
    Group,
}

/// A message from a channel, built fresh per platform event and dropped after dispatch.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel_id: String,
    /// Platform conversation id (e.g. Telegram chat_id).
    pub conversation_id: String,
    /// Platform message id, used to address the reply.
    pub message_id: Option<i64>,
    pub kind: ConversationKind,
    /// Absent for non-text messages (stickers, photos without caption, ...).
    pub text: Option<String>,
    pub sender_id: Option<i64>,
    /// Sender of the message this one replies to, if it is a reply.
    pub reply_to_sender_id: Option<i64>,
}

impl InboundMessage {
    /// True if the text contains the literal `@handle`.
    pub fn mentions(&self, handle: &str) -> bool {
        match self.text.as_deref() {
            Some(text) => text.contains(&format!("@{}", handle)),
            None => false,
        }
    }
}
