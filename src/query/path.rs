//! Navigation path resolution for eager loading.
//!
//! Given a root shape and a member declared somewhere in the model, find the
//! dotted path that reaches the member from a value of the root shape. The
//! search looks at most two navigation levels deep; anything further falls
//! back to the bare member name.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

use domain::{EntityShape, MemberKey, NavigationMember, ShapeId};

static PATHS: Lazy<RwLock<HashMap<(ShapeId, MemberKey), String>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Resolve `member` relative to `root`, memoized per (root, member)
pub fn resolve(root: &EntityShape, member: &NavigationMember) -> String {
    let key = (root.id(), member.key());
    if let Some(path) = PATHS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return path.clone();
    }

    let path = resolve_uncached(root, member);
    PATHS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(path)
        .clone()
}

/// Resolve without touching the process-wide cache
pub fn resolve_uncached(root: &EntityShape, member: &NavigationMember) -> String {
    let declaring = member.declaring();
    if root.id() == declaring {
        return member.name().to_string();
    }

    if let Some(path) = one_level(root, declaring, member.name()) {
        return path;
    }

    root.properties()
        .filter_map(|property| {
            let target = property.target()?;
            let nested = one_level(target, declaring, member.name())?;
            Some(format!("{}.{}", property.name(), nested))
        })
        .next()
        .unwrap_or_else(|| {
            tracing::debug!(
                root = root.name(),
                member = member.name(),
                "no navigation path within two levels, using bare member name"
            );
            member.name().to_string()
        })
}

/// First property of `owner` whose (element) shape is exactly `declaring`
fn one_level(owner: &EntityShape, declaring: ShapeId, member: &str) -> Option<String> {
    owner
        .properties()
        .find(|property| property.target().map(EntityShape::id) == Some(declaring))
        .map(|property| format!("{}.{}", property.name(), member))
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use domain::ScalarType;

    use super::*;

    struct Root;
    struct Middle;
    struct Leaf;
    struct Deep;
    struct Fork;

    fn root() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Root>("Root")
                .identity("id")
                .scalar("label", ScalarType::Text)
                .reference("middle", middle, "middle_id")
                .build()
        });
        &SHAPE
    }

    fn middle() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Middle>("Middle")
                .identity("id")
                .scalar("title", ScalarType::Text)
                .collection("leaves", leaf, "middle_id")
                .build()
        });
        &SHAPE
    }

    fn leaf() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Leaf>("Leaf")
                .identity("id")
                .scalar("weight", ScalarType::Float)
                .reference("deep", deep, "deep_id")
                .build()
        });
        &SHAPE
    }

    fn deep() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Deep>("Deep")
                .identity("id")
                .scalar("depth", ScalarType::Integer)
                .build()
        });
        &SHAPE
    }

    /// Two references to the same shape, `left` declared first
    fn fork() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Fork>("Fork")
                .identity("id")
                .scalar("left_id", ScalarType::Integer)
                .scalar("right_id", ScalarType::Integer)
                .reference("left", middle, "left_id")
                .reference("right", middle, "right_id")
                .build()
        });
        &SHAPE
    }

    #[test]
    fn test_own_member_is_bare_name() {
        let label = root().member("label").unwrap();
        assert_eq!(resolve(root(), &label), "label");
    }

    #[test]
    fn test_one_level_reference() {
        let title = middle().member("title").unwrap();
        assert_eq!(resolve(root(), &title), "middle.title");
    }

    #[test]
    fn test_one_level_collection_element() {
        let weight = leaf().member("weight").unwrap();
        assert_eq!(resolve(middle(), &weight), "leaves.weight");
    }

    #[test]
    fn test_two_levels() {
        let weight = leaf().member("weight").unwrap();
        assert_eq!(resolve(root(), &weight), "middle.leaves.weight");
    }

    #[test]
    fn test_three_levels_falls_back_to_bare_name() {
        let depth = deep().member("depth").unwrap();
        assert_eq!(resolve(root(), &depth), "depth");
    }

    #[test]
    fn test_cached_matches_uncached() {
        let title = middle().member("title").unwrap();
        let first = resolve(root(), &title);
        let second = resolve(root(), &title);
        assert_eq!(first, second);
        assert_eq!(first, resolve_uncached(root(), &title));
    }

    #[test]
    fn test_first_declared_reference_wins_one_level() {
        let title = middle().member("title").unwrap();
        assert_eq!(resolve_uncached(fork(), &title), "left.title");
    }

    #[test]
    fn test_first_declared_reference_wins_two_levels() {
        let weight = leaf().member("weight").unwrap();
        assert_eq!(resolve_uncached(fork(), &weight), "left.leaves.weight");
    }
}
