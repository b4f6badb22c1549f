//! HTTP client for the upstream agent engine.

mod client;
mod stream;

pub use client::HttpAgentService;
