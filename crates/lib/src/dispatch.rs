//! Dispatch: one inbound message in, at most one reply out.
//!
//! Commands are answered directly. Anything else goes through addressing; an
//! addressed message gets a typing indicator, one backend call under the error
//! boundary, and exactly one reply: the answer, or a fallback chosen by failure
//! kind. The dispatcher holds only read-only state and is shared across tasks.

use crate::addressing::{self, AddressingDecision, BotIdentity};
use crate::backend::{AnswerBackend, FailureKind, PROCESSING_PLACEHOLDER};
use crate::boundary::{self, Contained};
use crate::channels::{ChannelHandle, InboundMessage};
use crate::commands::{self, CommandParse};
use std::sync::Arc;
use std::time::Duration;

/// Reply when the backend has no credential.
pub const NOT_CONFIGURED_REPLY: &str =
    "The answer service is not configured yet. Please ask the bot's operator to set it up.";

/// Reply when the backend errored, timed out or was unreachable.
pub const TRY_AGAIN_REPLY: &str =
    "Sorry, I couldn't get an answer right now. Please try again in a moment.";

/// Telegram's limit for one message, counted in UTF-16 code units.
pub const MAX_REPLY_UTF16: usize = 4096;

/// A reply handed to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub channel_id: String,
    pub conversation_id: String,
    /// Inbound message id this reply answers.
    pub reply_to: Option<i64>,
    pub text: String,
}

/// Fallback text for a failure kind. Never empty, never carries upstream detail.
pub fn fallback_text(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::NotConfigured => NOT_CONFIGURED_REPLY,
        FailureKind::UpstreamError | FailureKind::Unavailable => TRY_AGAIN_REPLY,
    }
}

/// Ask `backend` under the error boundary and map every outcome to user-facing text.
pub async fn ask_with_fallback(
    backend: &dyn AnswerBackend,
    question: &str,
    limit: Duration,
) -> String {
    let outcome = boundary::contain(
        "dispatch: backend ask",
        question.len(),
        limit,
        backend.ask(question),
    )
    .await;
    match outcome {
        Ok(answer) if !answer.trim().is_empty() => answer,
        Ok(_) => PROCESSING_PLACEHOLDER.to_string(),
        Err(Contained::Failed(e)) => {
            log::info!(
                "dispatch: backend {} failed ({}), sending fallback",
                backend.name(),
                e.kind()
            );
            fallback_text(e.kind()).to_string()
        }
        Err(_) => fallback_text(FailureKind::Unavailable).to_string(),
    }
}

/// Cut `text` to [`MAX_REPLY_UTF16`] on a char boundary, marking the cut with an ellipsis.
pub fn truncate_reply(text: &str) -> String {
    if text.encode_utf16().count() <= MAX_REPLY_UTF16 {
        return text.to_string();
    }
    let budget = MAX_REPLY_UTF16 - '…'.len_utf16();
    let mut used = 0;
    let mut cut = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        cut.push(c);
    }
    cut.push('…');
    cut
}

pub struct Dispatcher {
    bot: BotIdentity,
    backend: Arc<dyn AnswerBackend>,
    request_timeout: Duration,
}

impl Dispatcher {
    /// `request_timeout` bounds the backend call and each channel call.
    pub fn new(
        bot: BotIdentity,
        backend: Arc<dyn AnswerBackend>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            bot,
            backend,
            request_timeout,
        }
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Entry point for the gateway: commands first, then [`Dispatcher::handle`].
    pub async fn route(
        &self,
        msg: &InboundMessage,
        channel: &dyn ChannelHandle,
    ) -> Option<OutboundReply> {
        if let Some(text) = msg.text.as_deref() {
            match commands::parse_command(text, &self.bot) {
                CommandParse::Known(cmd) => {
                    log::debug!("dispatch: command {:?} in {}", cmd, msg.conversation_id);
                    let reply = cmd.reply_text(&self.bot);
                    return Some(self.deliver(msg, channel, reply).await);
                }
                CommandParse::Ignored => {
                    log::debug!("dispatch: ignoring command in {}", msg.conversation_id);
                    return None;
                }
                CommandParse::NotCommand => {}
            }
        }
        self.handle(msg, channel).await
    }

    /// Answer `msg` if it is addressed to the bot. Returns the reply that was sent
    /// (or attempted); `None` means the message was not addressed to the bot.
    pub async fn handle(
        &self,
        msg: &InboundMessage,
        channel: &dyn ChannelHandle,
    ) -> Option<OutboundReply> {
        let question = match addressing::decide(msg, &self.bot) {
            AddressingDecision::Skip => return None,
            AddressingDecision::Respond { question } => question,
        };
        boundary::best_effort(
            "dispatch: typing indicator",
            0,
            self.request_timeout,
            channel.send_typing(&msg.conversation_id),
        )
        .await;
        let answer =
            ask_with_fallback(self.backend.as_ref(), &question, self.request_timeout).await;
        Some(self.deliver(msg, channel, answer).await)
    }

    async fn deliver(
        &self,
        msg: &InboundMessage,
        channel: &dyn ChannelHandle,
        text: String,
    ) -> OutboundReply {
        let text = if text.trim().is_empty() {
            TRY_AGAIN_REPLY.to_string()
        } else {
            truncate_reply(&text)
        };
        let reply = OutboundReply {
            channel_id: msg.channel_id.clone(),
            conversation_id: msg.conversation_id.clone(),
            reply_to: msg.message_id,
            text,
        };
        let sent = boundary::best_effort(
            "dispatch: send reply",
            reply.text.len(),
            self.request_timeout,
            channel.send_message(&reply.conversation_id, reply.reply_to, &reply.text),
        )
        .await;
        if sent {
            log::debug!(
                "dispatch: replied in {} ({} chars)",
                reply.conversation_id,
                reply.text.chars().count()
            );
        }
        reply
    }
}
