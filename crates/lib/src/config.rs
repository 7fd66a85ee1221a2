//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.askbot/config.json`) and environment.
//! Every field has a default, so a missing file or an empty `{}` is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings (health endpoint and Telegram webhook).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (e.g. Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Answer backend settings.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 15151).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15151
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config (e.g. Telegram bot token).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// When set, use webhook mode: Telegram POSTs updates to this URL. If unset, long-poll getUpdates is used.
    pub webhook_url: Option<String>,
    /// Optional secret for webhook verification (X-Telegram-Bot-Api-Secret-Token). Used only when webhook_url is set.
    pub webhook_secret: Option<String>,
    /// Bot API base URL (default https://api.telegram.org). Useful for a local Bot API server or tests.
    pub api_base: Option<String>,
}

/// Which answer backend to build (from backend.kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Inference backend when an API token is configured, echo otherwise.
    Auto,
    /// Always the inference backend; without a token every answer is the "not configured" notice.
    Inference,
    /// Always the echo backend.
    Echo,
}

pub const DEFAULT_INFERENCE_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/google/flan-t5-large";

/// Answer backend config: credential, endpoint and generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// "auto" (default), "inference" or "echo", case-insensitive. Unknown values fall back to auto.
    #[serde(default)]
    pub kind: Option<String>,
    /// Bearer token for the inference endpoint. Overridden by ASKBOT_BACKEND_TOKEN env when set.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Inference endpoint URL (POSTed to as-is).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Upper bound for one backend call and one outbound send, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Sent as parameters.max_length; a hint to the backend, not a post-hoc truncation.
    #[serde(default = "default_max_answer_length")]
    pub max_answer_length: u32,
    /// Sent as parameters.temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_answer_length() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: None,
            api_token: None,
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_answer_length: default_max_answer_length(),
            temperature: default_temperature(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn endpoint(&self) -> String {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_INFERENCE_ENDPOINT)
            .to_string()
    }
}

/// Parse backend.kind (case-insensitive). Absent or unknown values resolve to `Auto`.
pub fn resolve_backend_kind(backend: &BackendConfig) -> BackendKind {
    match backend
        .kind
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("inference") => BackendKind::Inference,
        Some("echo") => BackendKind::Echo,
        Some("auto") | None => BackendKind::Auto,
        Some(other) => {
            log::warn!("config: unknown backend.kind {:?}, using auto", other);
            BackendKind::Auto
        }
    }
}

/// Trimmed, non-empty env var value.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_non_empty("TELEGRAM_BOT_TOKEN")
        .or_else(|| config_non_empty(config.channels.telegram.bot_token.as_ref()))
}

/// Resolve the backend API token: env ASKBOT_BACKEND_TOKEN overrides config.
pub fn resolve_backend_token(config: &Config) -> Option<String> {
    env_non_empty("ASKBOT_BACKEND_TOKEN")
        .or_else(|| config_non_empty(config.backend.api_token.as_ref()))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("ASKBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".askbot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or ASKBOT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 15151);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn empty_json_gives_backend_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.backend.max_answer_length, 200);
        assert!((config.backend.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.backend.endpoint(), DEFAULT_INFERENCE_ENDPOINT);
        assert!(config.channels.telegram.bot_token.is_none());
    }

    #[test]
    fn camel_case_keys() {
        let config: Config = serde_json::from_str(
            r#"{
                "channels": { "telegram": { "botToken": "123:abc", "apiBase": "http://127.0.0.1:9" } },
                "backend": { "kind": "Echo", "apiToken": " hf_x ", "requestTimeoutSecs": 5, "maxAnswerLength": 64, "temperature": 0.2 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.channels.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(
            config.channels.telegram.api_base.as_deref(),
            Some("http://127.0.0.1:9")
        );
        assert_eq!(resolve_backend_kind(&config.backend), BackendKind::Echo);
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.backend.max_answer_length, 64);
    }

    #[test]
    fn backend_kind_defaults_to_auto() {
        let mut backend = BackendConfig::default();
        assert_eq!(resolve_backend_kind(&backend), BackendKind::Auto);
        backend.kind = Some("INFERENCE".to_string());
        assert_eq!(resolve_backend_kind(&backend), BackendKind::Inference);
        backend.kind = Some("gpt".to_string());
        assert_eq!(resolve_backend_kind(&backend), BackendKind::Auto);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let backend = BackendConfig {
            request_timeout_secs: 0,
            ..BackendConfig::default()
        };
        assert_eq!(backend.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn blank_config_token_is_none() {
        let mut config = Config::default();
        config.channels.telegram.bot_token = Some("   ".to_string());
        assert_eq!(
            config_non_empty(config.channels.telegram.bot_token.as_ref()),
            None
        );
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join(format!(
            "askbot-missing-{}.json",
            uuid::Uuid::new_v4()
        ));
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 15151);
    }
}
