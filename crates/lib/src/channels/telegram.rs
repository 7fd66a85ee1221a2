//! Telegram channel: long-poll getUpdates, sendMessage and sendChatAction via Bot API.

use crate::addressing::BotIdentity;
use crate::channels::inbound::{ConversationKind, InboundMessage};
use crate::channels::registry::ChannelHandle;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;
const CHANNEL_ID: &str = "telegram";

/// Bot API envelope: `{ "ok": bool, "result": T, "description": "..." }`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram update payload (getUpdates result item or webhook POST body).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<TelegramMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    /// "private", "group", "supergroup" or "channel".
    #[serde(rename = "type", default)]
    pub typ: String,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl TelegramUpdate {
    /// Convert to the channel-neutral inbound message. None for updates without a message.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let msg = self.message?;
        let kind = if msg.chat.typ == "private" {
            ConversationKind::Private
        } else {
            ConversationKind::Group
        };
        Some(InboundMessage {
            channel_id: CHANNEL_ID.to_string(),
            conversation_id: msg.chat.id.to_string(),
            message_id: Some(msg.message_id),
            kind,
            text: msg.text,
            sender_id: msg.from.map(|u| u.id),
            reply_to_sender_id: msg
                .reply_to_message
                .and_then(|r| r.from)
                .map(|u| u.id),
        })
    }
}

/// Telegram channel connector: long-polls for updates and sends replies via sendMessage.
pub struct TelegramChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    running: AtomicBool,
    stop_signal: Notify,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// `api_base` defaults to the public Bot API.
    pub fn new(token: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        Self {
            id: CHANNEL_ID.to_string(),
            token,
            api_base,
            running: AtomicBool::new(false),
            stop_signal: Notify::new(),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn method_url(&self, method: &str) -> Result<String, String> {
        let token = self
            .token
            .as_ref()
            .ok_or("telegram bot token not configured")?;
        Ok(format!("{}/bot{}/{}", self.api_base, token, method))
    }

    /// POST a Bot API method with a JSON body and unwrap the `result` field.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, String> {
        let url = self.method_url(method)?;
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("{} failed: {} {}", method, status, body));
        }
        let data: ApiResponse<T> = res.json().await.map_err(|e| e.to_string())?;
        if !data.ok {
            return Err(format!(
                "{} returned ok: false ({})",
                method,
                data.description.unwrap_or_default()
            ));
        }
        data.result
            .ok_or_else(|| format!("{} returned no result", method))
    }

    /// Start the getUpdates long-poll loop and forward messages to the gateway. Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// getMe: the bot's own id and username, used for addressing.
    pub async fn get_me(&self) -> Result<BotIdentity, String> {
        let me: TelegramUser = self.call("getMe", &serde_json::json!({})).await?;
        Ok(BotIdentity::new(me.id, me.username))
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), String> {
        let mut body = serde_json::json!({ "timeout": LONG_POLL_TIMEOUT });
        if let Some(off) = offset {
            body["offset"] = serde_json::Value::from(off);
        }
        let updates: Vec<TelegramUpdate> = self.call("getUpdates", &body).await?;
        let next_offset = updates.iter().map(|u| u.update_id).max().map(|id| id + 1);
        Ok((updates, next_offset))
    }

    /// Set webhook URL (and optional secret). When set, Telegram POSTs updates to the URL instead of getUpdates.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), String> {
        let mut body = serde_json::json!({ "url": url });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        self.call::<bool>("setWebhook", &body).await.map(|_| ())
    }

    /// Remove webhook so the bot can use getUpdates again.
    pub async fn delete_webhook(&self) -> Result<(), String> {
        self.call::<bool>("deleteWebhook", &serde_json::json!({}))
            .await
            .map(|_| ())
    }

    /// Send a text message to a chat via sendMessage, replying to `reply_to` when given.
    pub async fn send_message(
        &self,
        chat_id: &str,
        reply_to: Option<i64>,
        text: &str,
    ) -> Result<(), String> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": text });
        if let Some(id) = reply_to {
            body["reply_to_message_id"] = serde_json::Value::from(id);
            body["allow_sending_without_reply"] = serde_json::Value::Bool(true);
        }
        self.call::<serde_json::Value>("sendMessage", &body)
            .await
            .map(|_| ())
    }

    /// sendChatAction with action "typing".
    pub async fn send_chat_action(&self, chat_id: &str, action: &str) -> Result<(), String> {
        let body = serde_json::json!({ "chat_id": chat_id, "action": action });
        self.call::<bool>("sendChatAction", &body).await.map(|_| ())
    }
}

async fn run_get_updates_loop(
    channel: Arc<TelegramChannel>,
    inbound_tx: mpsc::Sender<InboundMessage>,
) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        let polled = tokio::select! {
            r = channel.get_updates(offset) => r,
            _ = channel.stop_signal.notified() => break,
        };
        match polled {
            Ok((updates, next)) => {
                if next.is_some() {
                    offset = next;
                }
                for u in updates {
                    let Some(inbound) = u.into_inbound() else {
                        continue;
                    };
                    if inbound_tx.send(inbound).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl ChannelHandle for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_signal.notify_one();
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        reply_to: Option<i64>,
        text: &str,
    ) -> Result<(), String> {
        TelegramChannel::send_message(self, conversation_id, reply_to, text).await
    }

    async fn send_typing(&self, conversation_id: &str) -> Result<(), String> {
        self.send_chat_action(conversation_id, "typing").await
    }
}
