//! Common test utilities for loopdeck.
//!
//! - `fixtures`: Temporary config directories and a mocked application context
//! - `mocks`: Recording automation, launcher, fetcher and volume control
//! - `cli`: Runner for the compiled binary
#![allow(dead_code)]

pub mod cli;
pub mod fixtures;
pub mod mocks;

use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
