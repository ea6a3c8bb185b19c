//! Repository layer - Data access abstraction
//!
//! Repositories run query specifications and change-tracking operations
//! against a backend collaborator. Two backend kinds are supported behind the
//! same read/write traits; [`RepositoryAdapter`] wraps either.

mod adapter;
mod base;
mod data_service;
mod object_context;

pub use adapter::RepositoryAdapter;
pub use base::{ReadRepository, Repository, WriteRepository};
pub use data_service::DataServiceRepository;
pub use object_context::ObjectContextRepository;
