//! Shared helpers for integration tests.
//!
//! - `fixtures`: provider scenarios built from `MockProvider`
//! - `log_capture`: tracing layer that records events for assertions

pub mod fixtures;
pub mod log_capture;
