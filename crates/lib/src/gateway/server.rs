//! Gateway HTTP server and inbound processing loop.

use crate::backend;
use crate::channels::{
    ChannelHandle, ChannelRegistry, InboundMessage, TelegramChannel, TelegramUpdate,
};
use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinHandle, JoinSet};

/// Shared state for the gateway (config, dispatcher, channels).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
    /// In-process channel connector tasks; awaited during graceful shutdown.
    pub channel_tasks: Arc<tokio::sync::RwLock<Vec<JoinHandle<()>>>>,
    /// Sender for inbound channel messages (e.g. Telegram webhook POSTs). Processor task receives.
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    pub channel_registry: Arc<ChannelRegistry>,
}

/// Process one inbound channel message: look up its channel and dispatch.
async fn process_inbound_message(state: GatewayState, msg: InboundMessage) {
    let Some(handle) = state.channel_registry.get(&msg.channel_id).await else {
        log::warn!("inbound: no channel registered for {}", msg.channel_id);
        return;
    };
    if let Some(reply) = state.dispatcher.route(&msg, handle.as_ref()).await {
        log::info!(
            "inbound: answered message {:?} in {}:{}",
            reply.reply_to,
            reply.channel_id,
            reply.conversation_id
        );
    }
}

/// Receive inbound messages and run one dispatch task per message.
/// On `drain`, stops accepting, dispatches what is already queued, then waits up to `grace`
/// for in-flight messages before abandoning them.
async fn process_inbound(
    state: GatewayState,
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
    drain: Arc<Notify>,
    grace: Duration,
) {
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            msg = inbound_rx.recv() => match msg {
                Some(msg) => {
                    in_flight.spawn(process_inbound_message(state.clone(), msg));
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    log::warn!("inbound: dispatch task failed: {}", e);
                }
            }
            _ = drain.notified() => break,
        }
    }

    inbound_rx.close();
    while let Some(msg) = inbound_rx.recv().await {
        in_flight.spawn(process_inbound_message(state.clone(), msg));
    }
    if in_flight.is_empty() {
        return;
    }
    log::info!(
        "inbound: waiting up to {:?} for {} message(s) in flight",
        grace,
        in_flight.len()
    );
    let drained = tokio::time::timeout(grace, async {
        while in_flight.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        log::warn!(
            "inbound: abandoning {} message(s) still in flight after {:?}",
            in_flight.len(),
            grace
        );
        in_flight.abort_all();
    }
}

/// Run the relay until SIGINT or SIGTERM. See [`run_gateway_until`].
pub async fn run_gateway(config: Config) -> Result<()> {
    run_gateway_until(config, os_signal()).await
}

/// Run the relay; binds the HTTP server to config.gateway.bind:config.gateway.port.
/// Fails at startup when no Telegram token is configured or the bot identity cannot be resolved.
/// When `stop` completes: stops the channel, removes the webhook if used, then drains
/// queued and in-flight inbound messages before returning.
pub async fn run_gateway_until<F>(config: Config, stop: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let telegram_token = config::resolve_telegram_token(&config).context(
        "telegram bot token not configured (set channels.telegram.botToken or TELEGRAM_BOT_TOKEN)",
    )?;
    let telegram = Arc::new(TelegramChannel::new(
        Some(telegram_token),
        config.channels.telegram.api_base.clone(),
    ));
    let bot = telegram
        .get_me()
        .await
        .map_err(anyhow::Error::msg)
        .context("resolving bot identity via getMe")?;
    log::info!(
        "telegram: running as {} (id {})",
        bot.mention().unwrap_or_else(|| "<no username>".to_string()),
        bot.id
    );

    let request_timeout = config.backend.request_timeout();
    let backend = backend::build_backend(&config);
    let dispatcher = Arc::new(Dispatcher::new(bot, backend, request_timeout));

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(64);
    let channel_tasks = Arc::new(tokio::sync::RwLock::new(Vec::new()));
    let state = GatewayState {
        config: Arc::new(config.clone()),
        dispatcher,
        channel_tasks: channel_tasks.clone(),
        inbound_tx: inbound_tx.clone(),
        channel_registry: Arc::new(ChannelRegistry::new()),
    };

    // Registered before any update can arrive.
    state
        .channel_registry
        .register(telegram.id().to_string(), telegram.clone())
        .await;

    let drain = Arc::new(Notify::new());
    // One backend call plus delivery of its reply.
    let grace = request_timeout * 2;
    let processor = tokio::spawn(process_inbound(
        state.clone(),
        inbound_rx,
        drain.clone(),
        grace,
    ));

    let webhook_url = config.channels.telegram.webhook_url.clone();
    let telegram_webhook_for_shutdown: Option<Arc<TelegramChannel>> =
        if let Some(ref url) = webhook_url {
            let secret = config.channels.telegram.webhook_secret.as_deref();
            if let Err(e) = telegram.set_webhook(url, secret).await {
                log::warn!("telegram set_webhook failed: {}", e);
            } else {
                log::info!("telegram channel registered (webhook mode): {}", url);
            }
            Some(telegram)
        } else {
            if let Err(e) = telegram.delete_webhook().await {
                log::debug!("telegram delete_webhook before polling: {}", e);
            }
            let handle = telegram.start_inbound(inbound_tx);
            state.channel_tasks.write().await.push(handle);
            log::info!("telegram channel registered and getUpdates loop started");
            None
        };

    let channel_registry = state.channel_registry.clone();
    let app = Router::new()
        .route("/", get(health_http))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    let shutdown = async move {
        stop.await;
        log::info!("shutdown requested, stopping channels");
        stop_channels(channel_registry, channel_tasks, telegram_webhook_for_shutdown).await;
        drain.notify_one();
        if let Err(e) = processor.await {
            log::warn!("inbound processor ended abnormally: {}", e);
        }
        log::info!("inbound messages drained");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes on SIGINT or SIGTERM.
async fn os_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Stops channel connectors, removes the Telegram webhook if used, then awaits in-process channel tasks.
async fn stop_channels(
    channel_registry: Arc<ChannelRegistry>,
    channel_tasks: Arc<tokio::sync::RwLock<Vec<JoinHandle<()>>>>,
    telegram_webhook: Option<Arc<TelegramChannel>>,
) {
    for id in channel_registry.ids().await {
        if let Some(handle) = channel_registry.get(&id).await {
            handle.stop();
        }
    }

    if let Some(t) = telegram_webhook {
        if let Err(e) = t.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }

    let handles = {
        let mut g = channel_tasks.write().await;
        std::mem::take(&mut *g)
    };
    for h in handles {
        let _ = h.await;
    }
    log::info!("channel tasks finished");
}

/// POST /telegram/webhook: receives Telegram update JSON; verifies optional secret, pushes InboundMessage.
async fn telegram_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.config.channels.telegram.webhook_secret {
        let provided = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let Some(inbound) = update.into_inbound() else {
        return StatusCode::OK;
    };
    if state.inbound_tx.send(inbound).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "bot": state.dispatcher.bot().handle.clone(),
        "backend": state.dispatcher.backend_name(),
    }))
}
