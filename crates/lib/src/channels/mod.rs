//! Communication channels (e.g. Telegram).
//!
//! Channel trait and registry so the gateway can start/stop channel connectors
//! and deliver replies. Inbound messages are sent to the gateway for dispatch.

mod inbound;
mod registry;
mod telegram;

pub use inbound::{ConversationKind, InboundMessage};
pub use registry::{ChannelHandle, ChannelRegistry};
pub use telegram::{TelegramChannel, TelegramUpdate, TELEGRAM_API_BASE};
