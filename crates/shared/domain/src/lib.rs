//! Domain layer - Entity shapes, members, and entity values.
//!
//! This crate describes persistable data independently of any backend:
//! the structural metadata queries are resolved against, and the record
//! representation entities travel in.

pub mod entity;
pub mod error;
pub mod member;
pub mod shape;

pub use entity::{Entity, ObjectId, Record, Tracked, TrackedObject};
pub use error::{DomainError, DomainResult};
pub use member::{MemberKey, NavigationMember};
pub use shape::{EntityShape, Generated, Property, PropertyKind, ScalarType, ShapeBuilder, ShapeFn, ShapeId};
