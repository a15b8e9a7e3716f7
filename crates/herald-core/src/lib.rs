//! Core types and trait definitions for the Herald expiry tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod clock;
pub mod content;
pub mod error;
pub mod region;
pub mod store;

pub use error::{Error, Result};
