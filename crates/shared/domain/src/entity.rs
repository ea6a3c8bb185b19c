//! Entity trait, records, and shared entity handles.
//!
//! Entities cross the backend boundary as [`Record`]s: the flat JSON object
//! produced by the entity's serde representation. Navigation properties are
//! nested objects (references) or arrays (collections) inside the record.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DomainError, DomainResult};
use crate::shape::EntityShape;

/// Field map of a single entity
pub type Record = serde_json::Map<String, Value>;

/// A persistable entity type.
///
/// `Default` doubles as the "empty" value: repositories refuse to add an
/// entity equal to it.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Structural description of the type
    fn shape() -> &'static EntityShape;

    /// Serialize into a record
    fn to_record(&self) -> DomainResult<Record> {
        match serde_json::to_value(self)? {
            Value::Object(record) => Ok(record),
            _ => Err(DomainError::NotARecord {
                shape: Self::shape().name().to_string(),
            }),
        }
    }

    /// Materialize from a record
    fn from_record(record: &Record) -> DomainResult<Self> {
        Ok(serde_json::from_value(Value::Object(record.clone()))?)
    }

    /// Whether this value is the type's empty value
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Identity of a tracked object (the address of its shared cell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity for an object pinned at `address` (behind an `Arc` or similar)
    pub fn from_address(address: usize) -> Self {
        Self(address)
    }
}

/// Type-erased view of an entity instance a backend can track.
///
/// Backends hold these for as long as the entity is tracked; loading a record
/// into one is visible to every clone of the owning [`Tracked`] handle.
pub trait TrackedObject: fmt::Debug + Send + Sync {
    fn shape(&self) -> &'static EntityShape;

    fn object_id(&self) -> ObjectId;

    /// Current values
    fn snapshot(&self) -> DomainResult<Record>;

    /// Overwrite the fields present in `record`, keeping the rest
    fn load(&self, record: &Record) -> DomainResult<()>;
}

/// Shared, mutable handle to an entity instance.
///
/// Cloning the handle shares the instance, which is how store-computed values
/// written by a backend become visible to the caller.
pub struct Tracked<T> {
    inner: Arc<RwLock<T>>,
}

impl<T: Entity> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Copy of the current value
    pub fn get(&self) -> T {
        self.read(T::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Whether both handles share one instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Type-erased view for handing to a backend
    pub fn object(&self) -> Arc<dyn TrackedObject> {
        Arc::new(self.clone())
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_tuple("Tracked").field(&*guard).finish()
    }
}

impl<T: Entity> From<T> for Tracked<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Entity> TrackedObject for Tracked<T> {
    fn shape(&self) -> &'static EntityShape {
        T::shape()
    }

    fn object_id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    fn snapshot(&self) -> DomainResult<Record> {
        self.read(T::to_record)
    }

    fn load(&self, record: &Record) -> DomainResult<()> {
        self.update(|value| {
            let mut merged = value.to_record()?;
            for (field, incoming) in record {
                merged.insert(field.clone(), incoming.clone());
            }
            *value = T::from_record(&merged)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::shape::ScalarType;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: i64,
        text: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Entity for Note {
        fn shape() -> &'static EntityShape {
            static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
                EntityShape::builder::<Note>("Note")
                    .identity("id")
                    .scalar("text", ScalarType::Text)
                    .build()
            });
            &SHAPE
        }
    }

    #[test]
    fn test_record_round_trip_keeps_field_names() {
        let note = Note {
            id: 3,
            text: "hello".into(),
            tags: vec![],
        };
        let record = note.to_record().unwrap();
        assert_eq!(record["text"], "hello");
        assert_eq!(Note::from_record(&record).unwrap(), note);
    }

    #[test]
    fn test_load_merges_into_shared_instance() {
        let note = Tracked::new(Note {
            id: 0,
            text: "draft".into(),
            tags: vec!["a".into()],
        });
        let object = note.object();

        let mut incoming = Record::new();
        incoming.insert("id".into(), 42.into());
        object.load(&incoming).unwrap();

        let current = note.get();
        assert_eq!(current.id, 42);
        assert_eq!(current.text, "draft");
        assert_eq!(current.tags, vec!["a".to_string()]);
    }

    #[test]
    fn test_object_identity_is_shared_by_clones() {
        let note = Tracked::new(Note::default());
        let other = Tracked::new(Note::default());
        assert_eq!(note.object().object_id(), note.clone().object().object_id());
        assert_ne!(note.object().object_id(), other.object().object_id());
        assert!(note.ptr_eq(&note.clone()));
    }

    #[test]
    fn test_default_value_is_empty() {
        assert!(Note::default().is_empty());
        assert!(!Note {
            id: 1,
            ..Note::default()
        }
        .is_empty());
    }
}
