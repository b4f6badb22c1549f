//! Core session middleware logic for Perch.
//!
//! This crate defines the service traits (agent engine, summarizer, memory
//! store) and the pure logic built on top of them: session resolution,
//! context estimation and compaction, the message pipeline, memory recall,
//! and the heartbeat scheduler. Concrete implementations live in
//! perch-infra.

pub mod heartbeat;
pub mod memory;
pub mod pipeline;
pub mod session;
pub mod summarize;
pub mod upstream;
