//! Testing utilities for workflows.
//!
//! This module provides:
//! - A fake execution engine whose deliveries the test controls
//! - A fake action launcher that records launches and can fail or signal
//! - A shared timeline for asserting cross-component ordering

mod fakes;
mod timeline;

pub use fakes::{FakeEngine, FakeLauncher};
pub use timeline::Timeline;
