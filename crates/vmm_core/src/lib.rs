//! VMM Core - Backend logic for Video Music Merger
//!
//! This crate merges one video with an ordered list of audio clips. The
//! clips are normalized, concatenated back-to-back, and muxed against the
//! untouched video stream. It has zero UI dependencies and is driven by the
//! `vmm` command line front end.

pub mod config;
pub mod engine;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
