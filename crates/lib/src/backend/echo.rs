use super::{AnswerBackend, BackendFailure};
use async_trait::async_trait;

/// Deterministic templated answer quoting the question. Degraded mode and test double.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBackend;

#[async_trait]
impl AnswerBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn ask(&self, question: &str) -> Result<String, BackendFailure> {
        Ok(format!(
            "I received your question: '{}'. I'm a bot in development and I can answer your questions!",
            question
        ))
    }
}
