//! Serial Trace Studio
//!
//! Protocol command reconstruction from captured serial/USB device
//! traces.
//!
//! This crate provides the core implementation for the
//! `serial-trace` CLI tool: it turns a byte-level capture of an
//! undocumented device protocol into a deduplicated catalog of
//! commands, their observed responses, timing, and best-guess
//! classification.
//!
//! ## Getting Started
//!
//! Most users should install and use the CLI:
//!
//! ```bash
//! cargo install serial-trace-studio
//! serial-trace --help
//! ```

pub mod aggregator;
pub mod classifier;
pub mod commands;
pub mod correlator;
pub mod output;
pub mod parser;
pub mod utils;
