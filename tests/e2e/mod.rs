//! End-to-end scenarios.
//!
//! Every test runs on a paused tokio clock, so settle and retry delays elapse
//! instantly and deterministically.

pub mod hotplug_tests;
pub mod lifecycle_tests;
