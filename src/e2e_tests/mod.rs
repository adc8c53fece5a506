//! End-to-end tests over a local-directory engine

pub mod recording;

// Test scenario modules
pub mod concurrency;

pub use recording::{Call, Probe, RecordingEngine};
pub use test_context::TestContext;
