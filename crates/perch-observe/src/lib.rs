//! Observability setup for Perch.

pub mod tracing_setup;
