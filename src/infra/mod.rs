//! Infrastructure layer - Backend integration
//!
//! This module handles everything that touches a backend:
//! - Collaborator seams for object contexts and remote data services
//! - Entity-set resolution
//! - Repositories driving either backend kind
//! - An in-process object context

pub mod backend;
pub mod entity_set;
pub mod memory;
pub mod repositories;

pub use backend::{
    AddCall, AddEntryPoint, BackendError, BackendResult, ContainerKind, ContextMember,
    DataServiceContext, EntityKey, EntityState, ObjectContext, SaveOptions, SaveSummary,
};
pub use entity_set::EntitySet;
pub use memory::{MemoryContext, MemoryContextBuilder, MemoryStore};
pub use repositories::{
    DataServiceRepository, ObjectContextRepository, ReadRepository, Repository,
    RepositoryAdapter, WriteRepository,
};

#[cfg(any(test, feature = "test-utils"))]
pub use backend::MockDataServiceContext;
