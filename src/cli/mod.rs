//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `demo` - Sample queries and saves against the in-process backend
//! - `paths` - Eager-load path resolution for the sample model

pub mod args;

pub use args::{Cli, Commands};
