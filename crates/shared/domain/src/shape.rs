//! Entity shape metadata.
//!
//! A shape is the structural description of a persistable entity: its name,
//! the mapped base shape it extends, and the properties it declares. Shapes
//! are built once per type (usually behind a `Lazy` static) and are never
//! mutated afterwards, so every lookup here is a pure function of the shape.

use std::any::TypeId;
use std::fmt;

use crate::error::{DomainError, DomainResult};
use crate::member::NavigationMember;

/// Accessor for a shape that lives for the rest of the process.
///
/// Relationships are declared through accessors rather than references so
/// that shapes can point at each other (Order -> Customer -> Orders).
pub type ShapeFn = fn() -> &'static EntityShape;

/// Identity of a shape: two ids are equal only for the same Rust type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId {
    type_id: TypeId,
    name: &'static str,
}

impl ShapeId {
    /// Id of the shape describing `M`
    pub fn of<M: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name,
        }
    }

    /// Shape name (for messages and entity-set naming)
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", self.name)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Scalar column types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Integer,
    Float,
    Text,
    Timestamp,
}

impl ScalarType {
    /// Value a freshly created entity carries for this column
    pub fn default_value(&self) -> serde_json::Value {
        match self {
            ScalarType::Bool => serde_json::Value::Bool(false),
            ScalarType::Integer => serde_json::Value::from(0),
            ScalarType::Float => serde_json::Value::from(0.0),
            ScalarType::Text => serde_json::Value::String(String::new()),
            ScalarType::Timestamp => serde_json::Value::Null,
        }
    }
}

/// Values the store computes on commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    /// Monotonic identity assigned on insert
    Identity,
    /// Commit timestamp, refreshed on insert and update
    Timestamp,
}

/// What a property holds
#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    Scalar(ScalarType),
    /// Single related entity, located through a foreign key column on the owner
    Reference {
        target: ShapeFn,
        foreign_key: &'static str,
    },
    /// Related entities whose `inverse_key` column points back at the owner
    Collection {
        target: ShapeFn,
        inverse_key: &'static str,
    },
}

/// A property declared on a shape
#[derive(Debug, Clone)]
pub struct Property {
    name: &'static str,
    kind: PropertyKind,
    declaring: ShapeId,
    ordinal: usize,
    key: bool,
    generated: Option<Generated>,
}

impl Property {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Shape that declares this property
    pub fn declaring(&self) -> ShapeId {
        self.declaring
    }

    /// Position within the declaring shape
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    pub fn generated(&self) -> Option<Generated> {
        self.generated
    }

    pub fn is_navigation(&self) -> bool {
        !matches!(self.kind, PropertyKind::Scalar(_))
    }

    /// Shape reached through this property, for navigation properties
    ///
    /// Collections report their element shape, so `Vec<OrderLine>` and
    /// `OrderLine` both answer `OrderLine`.
    pub fn target(&self) -> Option<&'static EntityShape> {
        match self.kind {
            PropertyKind::Scalar(_) => None,
            PropertyKind::Reference { target, .. } | PropertyKind::Collection { target, .. } => {
                Some(target())
            }
        }
    }
}

/// Structural description of an entity type
#[derive(Debug)]
pub struct EntityShape {
    id: ShapeId,
    base: Option<ShapeFn>,
    is_abstract: bool,
    properties: Vec<Property>,
}

impl EntityShape {
    /// Start describing the shape of `M`
    pub fn builder<M: 'static>(name: &'static str) -> ShapeBuilder {
        ShapeBuilder {
            id: ShapeId::of::<M>(name),
            base: None,
            is_abstract: false,
            properties: Vec::new(),
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name
    }

    /// Mapped base shape, if this shape extends one
    pub fn base(&self) -> Option<&'static EntityShape> {
        self.base.map(|base| base())
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Properties declared directly on this shape
    pub fn declared_properties(&self) -> &[Property] {
        &self.properties
    }

    /// All properties, own declarations first, then each ancestor's
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties
            .iter()
            .chain(self.ancestors().flat_map(|shape| shape.properties.iter()))
    }

    /// Base shapes from nearest to furthest
    pub fn ancestors(&self) -> impl Iterator<Item = &'static EntityShape> {
        std::iter::successors(self.base(), |shape| shape.base())
    }

    /// Look up a property by name, including inherited ones
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties().find(|property| property.name == name)
    }

    /// Key properties (declared or inherited)
    pub fn key_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties().filter(|property| property.key)
    }

    /// Whether a value of this shape can stand in for `other`
    pub fn is_assignable_to(&self, other: ShapeId) -> bool {
        self.id == other || self.ancestors().any(|shape| shape.id == other)
    }

    /// Identify the member `name` as reachable from this shape
    pub fn member(&self, name: &str) -> DomainResult<NavigationMember> {
        self.property(name)
            .map(NavigationMember::from_property)
            .ok_or_else(|| DomainError::unknown_member(self.name(), name))
    }
}

/// Incremental builder for [`EntityShape`]
pub struct ShapeBuilder {
    id: ShapeId,
    base: Option<ShapeFn>,
    is_abstract: bool,
    properties: Vec<Property>,
}

impl ShapeBuilder {
    /// Extend a mapped base shape
    pub fn extends(mut self, base: ShapeFn) -> Self {
        self.base = Some(base);
        self
    }

    /// Mark the shape as abstract (never mapped to its own entity set)
    pub fn abstract_shape(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare a key column
    pub fn key(self, name: &'static str, scalar: ScalarType) -> Self {
        self.push(name, PropertyKind::Scalar(scalar), true, None)
    }

    /// Declare a key column whose value the store assigns
    pub fn identity(self, name: &'static str) -> Self {
        self.push(
            name,
            PropertyKind::Scalar(ScalarType::Integer),
            true,
            Some(Generated::Identity),
        )
    }

    pub fn scalar(self, name: &'static str, scalar: ScalarType) -> Self {
        self.push(name, PropertyKind::Scalar(scalar), false, None)
    }

    /// Declare a column the store computes on commit
    pub fn computed(self, name: &'static str, scalar: ScalarType, generated: Generated) -> Self {
        self.push(name, PropertyKind::Scalar(scalar), false, Some(generated))
    }

    pub fn reference(self, name: &'static str, target: ShapeFn, foreign_key: &'static str) -> Self {
        self.push(
            name,
            PropertyKind::Reference {
                target,
                foreign_key,
            },
            false,
            None,
        )
    }

    pub fn collection(self, name: &'static str, target: ShapeFn, inverse_key: &'static str) -> Self {
        self.push(
            name,
            PropertyKind::Collection {
                target,
                inverse_key,
            },
            false,
            None,
        )
    }

    pub fn build(self) -> EntityShape {
        EntityShape {
            id: self.id,
            base: self.base,
            is_abstract: self.is_abstract,
            properties: self.properties,
        }
    }

    fn push(
        mut self,
        name: &'static str,
        kind: PropertyKind,
        key: bool,
        generated: Option<Generated>,
    ) -> Self {
        let ordinal = self.properties.len();
        self.properties.push(Property {
            name,
            kind,
            declaring: self.id,
            ordinal,
            key,
            generated,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use super::*;

    struct Animal;
    struct Dog;
    struct Kennel;

    fn animal() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Animal>("Animal")
                .abstract_shape()
                .identity("id")
                .scalar("name", ScalarType::Text)
                .build()
        });
        &SHAPE
    }

    fn dog() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Dog>("Dog")
                .extends(animal)
                .scalar("breed", ScalarType::Text)
                .reference("kennel", kennel, "kennel_id")
                .build()
        });
        &SHAPE
    }

    fn kennel() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Kennel>("Kennel")
                .identity("id")
                .collection("dogs", dog, "kennel_id")
                .build()
        });
        &SHAPE
    }

    #[test]
    fn test_properties_include_inherited_after_own() {
        let names: Vec<_> = dog().properties().map(Property::name).collect();
        assert_eq!(names, vec!["breed", "kennel", "id", "name"]);
    }

    #[test]
    fn test_inherited_property_reports_declaring_shape() {
        let name = dog().property("name").unwrap();
        assert_eq!(name.declaring(), animal().id());
        assert_eq!(name.ordinal(), 1);
    }

    #[test]
    fn test_assignability_follows_hierarchy() {
        assert!(dog().is_assignable_to(animal().id()));
        assert!(!animal().is_assignable_to(dog().id()));
        assert!(!kennel().is_assignable_to(animal().id()));
    }

    #[test]
    fn test_collection_target_is_element_shape() {
        let dogs = kennel().property("dogs").unwrap();
        assert_eq!(dogs.target().unwrap().id(), dog().id());
        assert!(dogs.is_navigation());
    }

    #[test]
    fn test_unknown_member_is_an_error() {
        let err = dog().member("owner").unwrap_err();
        assert!(matches!(err, DomainError::UnknownMember { .. }));
    }

    #[test]
    fn test_key_properties() {
        let keys: Vec<_> = dog().key_properties().map(Property::name).collect();
        assert_eq!(keys, vec!["id"]);
    }
}
