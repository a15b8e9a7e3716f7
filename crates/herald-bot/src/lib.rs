//! Telegram front end and expiry scanner for Herald.
//!
//! The engine lives in `herald-core` / `herald-store-sqlite`; this crate is
//! the I/O shell around it: a long-polling Bot API client, the multi-step
//! admin wizard, command dispatch, message rendering, and the recurring
//! alert loop.

pub mod config;
pub mod handler;
pub mod render;
pub mod scanner;
pub mod telegram;
pub mod wizard;

pub use config::BotConfig;
