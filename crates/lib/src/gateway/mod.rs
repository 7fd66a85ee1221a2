//! Gateway: the running relay.
//!
//! Resolves the bot identity, starts the Telegram connector (long-poll or webhook),
//! dispatches each inbound message on its own task, and serves a health endpoint.

mod server;

pub use server::{run_gateway, run_gateway_until, GatewayState};
