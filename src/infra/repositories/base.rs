//! Base repository traits following Interface Segregation Principle (ISP).
//!
//! Reads and writes are separate traits so a backend that only supports one
//! side can still be used through the part it implements. Every operation is
//! synchronous and takes `&mut self`: a repository wraps one backend session,
//! which is never shared between threads.

use domain::{Entity, Tracked};

use crate::errors::RepoResult;
use crate::query::{Predicate, QuerySpecification};

/// Read operations (Query)
pub trait ReadRepository {
    /// Materialize every entity matching `spec`
    fn get<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<Vec<T>>;

    /// Count entities matching `spec`'s filters (ordering and paging ignored)
    fn count<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<u64>;

    /// Materialize every entity matching all `predicates`
    fn get_where<T: Entity>(
        &mut self,
        predicates: impl IntoIterator<Item = Predicate<T>>,
    ) -> RepoResult<Vec<T>> {
        self.get(&QuerySpecification::new().filter_all(predicates))
    }

    /// Count entities matching all `predicates`
    fn count_where<T: Entity>(
        &mut self,
        predicates: impl IntoIterator<Item = Predicate<T>>,
    ) -> RepoResult<u64> {
        self.count(&QuerySpecification::new().filter_all(predicates))
    }
}

/// Write operations (Command)
pub trait WriteRepository {
    /// Track a new entity for insertion
    fn add<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()>;

    /// Mark an entity for deletion
    fn remove<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()>;

    /// Track an existing entity as modified
    fn attach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()>;

    /// Stop tracking an entity without deleting it
    fn detach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()>;

    /// Reload an entity's values from the store
    fn refresh<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()>;

    /// Commit pending changes
    fn save(&mut self) -> RepoResult<()>;

    /// New, untracked instance
    fn create<T: Entity>(&mut self) -> RepoResult<T>;
}

/// Full repository - Combines both sides
pub trait Repository: ReadRepository + WriteRepository {}

// Auto-implement Repository for types implementing both traits
impl<R> Repository for R where R: ReadRepository + WriteRepository {}
