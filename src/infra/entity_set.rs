//! Entity-set resolution.
//!
//! Maps an entity shape to the member of an [`ObjectContext`] that exposes
//! its entities. Derived shapes collapse to their nearest mapped ancestor,
//! query-style members win over set-style members, and results are cached per
//! (context type, member layout, shape) for the life of the process.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

use domain::{EntityShape, ShapeId};

use super::backend::{ContainerKind, ContextMember, ObjectContext};
use crate::errors::{RepoError, RepoResult};

/// Context type, fingerprint of its exposed members, requested shape
type CacheKey = (&'static str, u64, ShapeId);

static ENTITY_SETS: Lazy<RwLock<HashMap<CacheKey, EntitySet>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A resolved entity set
#[derive(Debug, Clone)]
pub struct EntitySet {
    pub name: String,
    /// Mapped shape the set holds
    pub shape: &'static EntityShape,
    pub container: ContainerKind,
}

/// Nearest ancestor of `shape` that is mapped to its own entity set.
///
/// Climbs while a base exists and is not abstract; an abstract base marks the
/// top of the persistable hierarchy.
pub fn mapped_shape(shape: &'static EntityShape) -> &'static EntityShape {
    let mut current = shape;
    while let Some(base) = current.base() {
        if base.is_abstract() {
            break;
        }
        current = base;
    }
    current
}

/// Resolve (and cache) the entity set backing `shape` on `context`
pub fn resolve(context: &dyn ObjectContext, shape: &'static EntityShape) -> RepoResult<EntitySet> {
    let key = (context.context_type(), layout(context.exposed_members()), shape.id());
    if let Some(set) = ENTITY_SETS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(set.clone());
    }

    let set = find(context.exposed_members(), context.context_type(), shape)?;
    tracing::debug!(
        context = context.context_type(),
        entity = shape.name(),
        entity_set = %set.name,
        "resolved entity set"
    );
    Ok(ENTITY_SETS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(set)
        .clone())
}

/// Two contexts of the same type may still expose different members
fn layout(members: &[ContextMember]) -> u64 {
    let mut hasher = DefaultHasher::new();
    members.hash(&mut hasher);
    hasher.finish()
}

/// Resolve without touching the cache
pub fn find(
    members: &[ContextMember],
    context_type: &str,
    shape: &'static EntityShape,
) -> RepoResult<EntitySet> {
    let mapped = mapped_shape(shape);
    [ContainerKind::Query, ContainerKind::Set]
        .into_iter()
        .find_map(|container| {
            members
                .iter()
                .find(|member| member.container == container && member.entity == mapped.id())
        })
        .map(|member| EntitySet {
            name: member.name.clone(),
            shape: mapped,
            container: member.container,
        })
        .ok_or_else(|| RepoError::EntitySetNotFound {
            entity: mapped.name().to_string(),
            context: context_type.to_string(),
        })
}
