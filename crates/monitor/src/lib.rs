//! USE monitor daemon
//!
//! Configuration loading and the HTTP API, split from `main.rs` so the
//! router can be exercised by integration tests.

pub mod api;
pub mod config;
