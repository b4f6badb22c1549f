//! Shared domain types for Perch.
//!
//! This crate contains the types used across the Perch middleware:
//! sessions, agent events, memories, transport message shapes, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod error;
pub mod event;
pub mod memory;
pub mod session;
pub mod transport;
