//! Infrastructure layer for Perch.
//!
//! Contains implementations of the service traits defined in `perch-core`:
//! SQLite memory storage, the HTTP client for the upstream agent engine, and
//! the Anthropic summarizer.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod upstream;
