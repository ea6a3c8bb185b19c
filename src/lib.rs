//! repokit - A backend-agnostic repository layer
//!
//! Application code describes what to load with a [`QuerySpecification`]
//! (filters, eager-load paths, ordering and paging) and runs it through a
//! [`RepositoryAdapter`] backed by either an object-graph persistence context
//! or a remote entity-collection service.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Repository configuration and constants
//! - **types**: Shared value types (paging, ordering, tracking flags)
//! - **query**: Predicates, eager-load paths, specifications and plans
//! - **infra**: Backend seams, entity-set resolution, repositories
//! - **demo**: Sample shop model used by the CLI and tests
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Run the sample queries against a seeded in-process store
//! cargo run -- demo --customers 5
//!
//! # Show how eager-load paths resolve for the sample model
//! cargo run -- paths
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod demo;
pub mod errors;
pub mod infra;
pub mod query;
pub mod types;

// Re-export commonly used types at crate root
pub use config::RepositoryConfig;
pub use errors::{RepoError, RepoResult};
pub use infra::{ReadRepository, Repository, RepositoryAdapter, WriteRepository};
pub use query::{Predicate, QuerySpecification};
pub use types::{Limit, TrackingPolicy};
