//! In-process object-context backend.
//!
//! Used by the CLI demo and the integration tests; it implements the same
//! [`ObjectContext`](crate::infra::ObjectContext) seam a database-backed
//! context would.

mod context;
mod store;

pub use context::{MemoryContext, MemoryContextBuilder};
pub use store::MemoryStore;
