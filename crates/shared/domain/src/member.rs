//! Navigation members and their position keys.

use std::hash::{Hash, Hasher};

use crate::shape::{Property, ShapeId};

/// Position of a member within the shape that declares it.
///
/// Two references to the same member compare equal through this key even
/// when they were obtained from different shapes in the hierarchy, while two
/// unrelated members that merely share a name never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey {
    declaring: ShapeId,
    ordinal: usize,
}

/// A structural member (declaring shape + member name)
#[derive(Debug, Clone)]
pub struct NavigationMember {
    key: MemberKey,
    name: &'static str,
}

impl NavigationMember {
    pub(crate) fn from_property(property: &Property) -> Self {
        Self {
            key: MemberKey {
                declaring: property.declaring(),
                ordinal: property.ordinal(),
            },
            name: property.name(),
        }
    }

    pub fn key(&self) -> MemberKey {
        self.key
    }

    /// Shape that declares the member
    pub fn declaring(&self) -> ShapeId {
        self.key.declaring
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for NavigationMember {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for NavigationMember {}

impl Hash for NavigationMember {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use crate::shape::{EntityShape, ScalarType};

    struct Invoice;
    struct Receipt;

    fn invoice() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Invoice>("Invoice")
                .identity("id")
                .scalar("number", ScalarType::Text)
                .build()
        });
        &SHAPE
    }

    fn receipt() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Receipt>("Receipt")
                .extends(invoice)
                .scalar("number", ScalarType::Text)
                .build()
        });
        &SHAPE
    }

    #[test]
    fn test_same_member_through_derived_shape_is_equal() {
        let direct = invoice().member("id").unwrap();
        let inherited = receipt().member("id").unwrap();
        assert_eq!(direct, inherited);
    }

    #[test]
    fn test_same_name_on_unrelated_declarations_differs() {
        let base = invoice().member("number").unwrap();
        let shadowing = receipt().member("number").unwrap();
        assert_eq!(base.name(), shadowing.name());
        assert_ne!(base, shadowing);
    }
}
