//! Slidegate - Sliding-Window Rate Limiting
//!
//! This crate implements a per-client, per-endpoint sliding-window-log rate
//! limiter and an axum middleware that puts it in front of an HTTP
//! application. Requests are keyed by client address and path; once a key has
//! used its quota within the trailing window, further requests are answered
//! with 429 and an advisory retry delay.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
pub mod telemetry;
