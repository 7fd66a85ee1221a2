//! Answer backends: "ask a question, get text back".
//!
//! [`InferenceHttpBackend`] calls a hosted text-generation endpoint; [`EchoBackend`]
//! answers with a fixed template and is used when no API token is configured.

mod echo;
mod inference;

pub use echo::EchoBackend;
pub use inference::{InferenceHttpBackend, PROCESSING_PLACEHOLDER};

use crate::config::{self, BackendKind, Config};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Coarse failure class, used for logging and to pick the fallback reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotConfigured,
    UpstreamError,
    Unavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::NotConfigured => "not_configured",
            FailureKind::UpstreamError => "upstream_error",
            FailureKind::Unavailable => "unavailable",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendFailure {
    #[error("backend not configured: no api token")]
    NotConfigured,
    #[error("backend upstream error: {status} {body}")]
    Upstream { status: u16, body: String },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            BackendFailure::NotConfigured => FailureKind::NotConfigured,
            BackendFailure::Upstream { .. } => FailureKind::UpstreamError,
            BackendFailure::Unavailable(_) => FailureKind::Unavailable,
        }
    }
}

/// Turns a question into an answer. Implementations hold no per-call state.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Short name for logs and the health endpoint (e.g. "inference").
    fn name(&self) -> &str;
    async fn ask(&self, question: &str) -> Result<String, BackendFailure>;
}

/// Build the backend selected by backend.kind. `auto` picks inference when a token resolves, echo otherwise.
pub fn build_backend(config: &Config) -> Arc<dyn AnswerBackend> {
    let token = config::resolve_backend_token(config);
    let kind = config::resolve_backend_kind(&config.backend);
    match kind {
        BackendKind::Echo => {
            log::info!("backend: echo");
            Arc::new(EchoBackend)
        }
        BackendKind::Auto if token.is_none() => {
            log::warn!("backend: no api token configured, answering with the echo backend");
            Arc::new(EchoBackend)
        }
        BackendKind::Auto | BackendKind::Inference => {
            let backend = InferenceHttpBackend::from_config(&config.backend, token);
            if backend.is_configured() {
                log::info!("backend: inference at {}", config.backend.endpoint());
            } else {
                log::warn!("backend: inference selected without api token, every answer will be the not-configured notice");
            }
            Arc::new(backend)
        }
    }
}
