//! Loopdeck library - shortcut daemon core for Loupedeck-style control surfaces.
//!
//! This library exposes the core of the `loopdeck` binary for use in tests
//! and by other front ends.
//!
//! # Modules
//!
//! - `config`: The persisted shortcut document, repair and strict validation
//! - `render`: Key image pipeline, icon resolution and caching
//! - `actions`: Action dispatch, debouncing and the knob mixer
//! - `automation`: OS automation surface (scripts, app catalog)
//! - `device`: Device gateway abstraction, mock and preview gateways
//! - `app`: Shared application context
//! - `service`: Connection and event loop
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod actions;
pub mod app;
pub mod automation;
pub mod cli;
pub mod color;
pub mod config;
pub mod device;
pub mod error;
pub mod image_ops;
pub mod logging;
pub mod render;
pub mod service;
pub mod status;
