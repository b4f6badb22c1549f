//! The self-managed heartbeat loop.

pub mod directive;
mod runner;

pub use runner::{run_heartbeat, HeartbeatConfig, OutboundSink, HEARTBEAT_PRINCIPAL};
