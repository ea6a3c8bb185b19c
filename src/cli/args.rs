//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// repokit - Query specifications and repositories over pluggable backends
#[derive(Parser, Debug)]
#[command(name = "repokit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sample queries and a save against a seeded in-process store
    Demo(DemoArgs),

    /// Show how eager-load members resolve to navigation paths
    Paths(PathsArgs),
}

/// Arguments for the demo command
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Number of customers to seed
    #[arg(short, long, default_value = "5")]
    pub customers: usize,

    /// Orders seeded per customer
    #[arg(short, long, default_value = "4")]
    pub orders: usize,

    /// Only list orders with a total above this amount
    #[arg(long, default_value = "100")]
    pub min_total: f64,

    /// Maximum number of orders to list
    #[arg(short, long, default_value = "10")]
    pub take: u64,

    /// Materialize results without tracking them
    #[arg(long)]
    pub no_tracking: bool,
}

/// Arguments for the paths command
#[derive(Parser, Debug)]
pub struct PathsArgs {
    /// Only show paths from this root shape (e.g. "Customer")
    #[arg(short, long)]
    pub root: Option<String>,
}
