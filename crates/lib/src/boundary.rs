//! Error boundary for I/O performed while dispatching: backend calls, typing
//! indicator, outbound sends.
//!
//! Each wrapped future runs under a timeout with panics caught. Failures are
//! logged with the operation name, the input size and the failure kind, then
//! handed back as [`Contained`] so the caller can pick its fallback. Nothing
//! escapes to the dispatch loop.

use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// A failure caught by the boundary.
#[derive(Debug)]
pub enum Contained<E> {
    /// The operation returned an error.
    Failed(E),
    /// The operation did not finish within its limit.
    TimedOut,
    /// The operation panicked; carries the panic message.
    Panicked(String),
}

impl<E: fmt::Display> fmt::Display for Contained<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contained::Failed(e) => write!(f, "failed: {}", e),
            Contained::TimedOut => f.write_str("timed out"),
            Contained::Panicked(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `fut` with a time limit and panic catch. `op` and `input_len` only feed the log line.
pub async fn contain<T, E, F>(
    op: &str,
    input_len: usize,
    limit: Duration,
    fut: F,
) -> Result<T, Contained<E>>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let guarded = AssertUnwindSafe(fut).catch_unwind();
    match tokio::time::timeout(limit, guarded).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => {
            log::warn!("{}: failed (input {} bytes): {}", op, input_len, e);
            Err(Contained::Failed(e))
        }
        Ok(Err(payload)) => {
            let msg = panic_message(payload.as_ref());
            log::error!("{}: panicked (input {} bytes): {}", op, input_len, msg);
            Err(Contained::Panicked(msg))
        }
        Err(_) => {
            log::warn!(
                "{}: timed out after {:?} (input {} bytes)",
                op,
                limit,
                input_len
            );
            Err(Contained::TimedOut)
        }
    }
}

/// Like [`contain`] for side actions whose outcome does not matter. Returns whether it succeeded.
pub async fn best_effort<E, F>(op: &str, input_len: usize, limit: Duration, fut: F) -> bool
where
    F: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    contain(op, input_len, limit, fut).await.is_ok()
}
