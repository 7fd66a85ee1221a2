//! askbot core library: addressing policy, answer backends, dispatch, and the
//! Telegram channel, used by the `askbot` CLI.

pub mod addressing;
pub mod backend;
pub mod boundary;
pub mod channels;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod init;
