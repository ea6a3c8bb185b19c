//! Backend collaborator seams.
//!
//! Repositories never talk to storage directly. They drive one of two
//! collaborator traits: an [`ObjectContext`] (an object-graph persistence
//! context with an identity map and per-entity states) or a
//! [`DataServiceContext`] (a remote entity-collection service).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use domain::{DomainError, EntityShape, ObjectId, Record, ShapeId, TrackedObject};

use crate::config::{ADD_METHOD_PREFIX, ADD_OBJECT_METHOD};
use crate::query::{EvalError, QueryPlan, ServiceQuery};
use crate::types::RefreshMode;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Errors reported by a backend collaborator
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("entity is not tracked: {0}")]
    NotTracked(String),

    #[error("cannot change entity state from {from} to {to}")]
    InvalidStateTransition { from: EntityState, to: EntityState },

    #[error("no entity with key {0}")]
    KeyNotFound(EntityKey),

    #[error("an entity with key {0} is already tracked")]
    DuplicateKey(EntityKey),

    #[error("query evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("context is closed")]
    Closed,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// How a context member exposes its entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Read-oriented query root
    Query,
    /// Full entity set
    Set,
}

/// A member a context exposes, parameterized by a mapped entity shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextMember {
    pub name: String,
    pub container: ContainerKind,
    pub entity: ShapeId,
}

impl ContextMember {
    pub fn new(name: impl Into<String>, container: ContainerKind, shape: &EntityShape) -> Self {
        Self {
            name: name.into(),
            container,
            entity: shape.id(),
        }
    }
}

/// An add operation a backend offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddEntryPoint {
    /// Single-argument add taking one entity shape (`AddToOrders(order)`)
    Typed { method: String, entity: ShapeId },
    /// Two-argument add taking an entity set name (`AddObject(set, entity)`)
    Named { method: String },
}

impl AddEntryPoint {
    /// Typed single-argument entry point for `shape`, by naming convention
    pub fn typed_for(points: &[AddEntryPoint], shape: ShapeId) -> Option<&str> {
        points.iter().find_map(|point| match point {
            AddEntryPoint::Typed { method, entity }
                if *entity == shape && method.starts_with(ADD_METHOD_PREFIX) =>
            {
                Some(method.as_str())
            }
            _ => None,
        })
    }

    /// Generic add-by-set-name entry point
    pub fn named(points: &[AddEntryPoint]) -> Option<&str> {
        points.iter().find_map(|point| match point {
            AddEntryPoint::Named { method } if method == ADD_OBJECT_METHOD => Some(method.as_str()),
            _ => None,
        })
    }
}

/// A resolved add invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddCall {
    Typed { method: String },
    Named { method: String, entity_set: String },
}

/// Per-entity change-tracking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    Detached,
    Unchanged,
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityState::Detached => "detached",
            EntityState::Unchanged => "unchanged",
            EntityState::Added => "added",
            EntityState::Modified => "modified",
            EntityState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Identity of an entity within a backend: entity set plus key values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_set: String,
    pub key: String,
}

impl EntityKey {
    /// Key of `record` under `shape`'s key properties
    pub fn of(entity_set: &str, shape: &EntityShape, record: &Record) -> Self {
        let key = shape
            .key_properties()
            .map(|property| {
                record
                    .get(property.name())
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "null".to_string())
            })
            .collect::<Vec<_>>()
            .join("|");
        Self {
            entity_set: entity_set.to_string(),
            key,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.entity_set, self.key)
    }
}

/// Counts reported by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Options for a remote commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    /// Send full entities on update instead of merging changed fields
    pub replace_on_update: bool,
}

/// Object-graph persistence context.
///
/// One context is one session: it is not shared between threads. Use
/// [`ObjectContext::reopen`] to get an independent session over the same
/// connection.
pub trait ObjectContext: Send {
    /// Name of the context type
    fn context_type(&self) -> &'static str;

    /// Members through which entity sets are exposed
    fn exposed_members(&self) -> &[ContextMember];

    fn add_entry_points(&self) -> &[AddEntryPoint];

    /// Run a query and materialize its rows
    fn execute(&mut self, plan: &QueryPlan) -> BackendResult<Vec<Record>>;

    fn count(&mut self, plan: &QueryPlan) -> BackendResult<u64>;

    /// Start tracking `object` as added
    fn add(&mut self, call: AddCall, object: Arc<dyn TrackedObject>) -> BackendResult<()>;

    fn entity_key(&self, entity_set: &str, object: &dyn TrackedObject) -> BackendResult<EntityKey>;

    /// State of the entry tracked under `key`, if any
    fn entry_state(&self, key: &EntityKey) -> Option<EntityState>;

    /// State of the entry tracking `object`, if any
    fn object_state(&self, object: ObjectId) -> Option<EntityState>;

    /// Start tracking `object` as unchanged
    fn attach_to(&mut self, entity_set: &str, object: Arc<dyn TrackedObject>) -> BackendResult<()>;

    fn change_state(&mut self, object: &dyn TrackedObject, state: EntityState) -> BackendResult<()>;

    /// Copy `object`'s values onto the entry tracked under the same key
    fn apply_current_values(&mut self, entity_set: &str, object: &dyn TrackedObject) -> BackendResult<()>;

    fn delete_object(&mut self, object: &dyn TrackedObject) -> BackendResult<()>;

    /// Mark the entry tracked under `key` for deletion
    fn delete_entry(&mut self, key: &EntityKey) -> BackendResult<()>;

    fn detach(&mut self, object: &dyn TrackedObject) -> BackendResult<()>;

    /// Reload `object` from the store
    fn refresh(&mut self, mode: RefreshMode, object: &dyn TrackedObject) -> BackendResult<()>;

    /// Tracked objects in any of `states`
    fn pending(&self, states: &[EntityState]) -> Vec<Arc<dyn TrackedObject>>;

    /// Commit every pending change, all or nothing
    fn save_changes(&mut self) -> BackendResult<SaveSummary>;

    /// Field values of a fresh, untracked instance of `shape`
    fn create_object(&self, shape: &'static EntityShape) -> BackendResult<Record>;

    fn connection(&self) -> &str;

    /// New session over the same connection
    fn reopen(&self) -> BackendResult<Box<dyn ObjectContext>>;

    /// Release the connection
    fn close(&mut self);
}

/// Remote entity-collection service
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait DataServiceContext: Send {
    fn service_root(&self) -> String;

    fn add_entry_points(&self) -> Vec<AddEntryPoint>;

    fn execute(&mut self, query: &ServiceQuery) -> BackendResult<Vec<Record>>;

    fn count(&mut self, query: &ServiceQuery) -> BackendResult<u64>;

    /// Track `object` for insertion through a typed add entry point
    fn add(&mut self, method: &str, object: Arc<dyn TrackedObject>) -> BackendResult<()>;

    fn attach_to(&mut self, entity_set: &str, object: Arc<dyn TrackedObject>) -> BackendResult<()>;

    fn delete_object(&mut self, object: Arc<dyn TrackedObject>) -> BackendResult<()>;

    fn detach(&mut self, object: Arc<dyn TrackedObject>) -> BackendResult<()>;

    fn save_changes(&mut self, options: SaveOptions) -> BackendResult<()>;

    /// New session against the same service root
    fn reopen(&self) -> BackendResult<Box<dyn DataServiceContext>>;
}
