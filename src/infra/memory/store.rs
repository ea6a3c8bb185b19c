//! Shared in-process row storage.
//!
//! Rows hold scalar columns only; navigation values are reassembled from
//! foreign keys at query time. Every session opened over the same store sees
//! the same rows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::Value;

use domain::{Entity, EntityShape, Generated, PropertyKind, Record};

use crate::infra::backend::{BackendError, BackendResult, EntityKey};

const SCHEME: &str = "memory://";

/// A stored row: the concrete shape it was written as plus its columns
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub shape: &'static EntityShape,
    pub values: Record,
}

impl Row {
    pub fn key(&self, entity_set: &str) -> EntityKey {
        EntityKey::of(entity_set, self.shape, &self.values)
    }
}

/// A pending write
#[derive(Debug, Clone)]
pub(crate) enum Change {
    Insert {
        entity_set: String,
        shape: &'static EntityShape,
        values: Record,
    },
    Update {
        key: EntityKey,
        shape: &'static EntityShape,
        values: Record,
    },
    Delete {
        key: EntityKey,
    },
}

#[derive(Debug, Default, Clone)]
struct Tables {
    sets: HashMap<String, Vec<Row>>,
    identities: HashMap<String, i64>,
}

impl Tables {
    fn next_identity(&mut self, entity_set: &str) -> i64 {
        let rows = self.sets.get(entity_set);
        let counter = self.identities.entry(entity_set.to_string()).or_insert_with(|| {
            rows.into_iter()
                .flatten()
                .filter_map(|row| {
                    row.shape
                        .key_properties()
                        .find(|p| p.generated() == Some(Generated::Identity))
                        .and_then(|p| row.values.get(p.name()))
                        .and_then(Value::as_i64)
                })
                .max()
                .unwrap_or(0)
        });
        *counter += 1;
        *counter
    }

    fn position(&self, key: &EntityKey) -> Option<usize> {
        self.sets
            .get(&key.entity_set)?
            .iter()
            .position(|row| row.key(&key.entity_set) == *key)
    }
}

/// Handle to a named in-process store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    name: String,
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }

    /// Open a store from a `memory://<name>` connection string
    pub fn open(connection_string: &str) -> BackendResult<Self> {
        connection_string
            .strip_prefix(SCHEME)
            .filter(|name| !name.is_empty())
            .map(Self::new)
            .ok_or_else(|| {
                BackendError::Connection(format!(
                    "expected {SCHEME}<name>, got '{connection_string}'"
                ))
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_string(&self) -> String {
        format!("{SCHEME}{}", self.name)
    }

    /// Write `entity` straight to `entity_set`, returning the stored columns
    pub fn insert<T: Entity>(&self, entity_set: &str, entity: &T) -> BackendResult<Record> {
        let values = entity.to_record()?;
        let mut stored = self.commit(vec![Change::Insert {
            entity_set: entity_set.to_string(),
            shape: T::shape(),
            values,
        }])?;
        stored
            .pop()
            .flatten()
            .map(|row| row.values)
            .ok_or_else(|| BackendError::Unsupported("insert produced no row".into()))
    }

    /// Number of rows in `entity_set`
    pub fn len(&self, entity_set: &str) -> usize {
        self.with(|tables| tables.sets.get(entity_set).map_or(0, Vec::len))
    }

    pub fn is_empty(&self, entity_set: &str) -> bool {
        self.len(entity_set) == 0
    }

    pub(crate) fn rows(&self, entity_set: &str) -> Vec<Row> {
        self.with(|tables| tables.sets.get(entity_set).cloned().unwrap_or_default())
    }

    pub(crate) fn find(&self, key: &EntityKey) -> Option<Row> {
        self.with(|tables| {
            let index = tables.position(key)?;
            tables.sets.get(&key.entity_set)?.get(index).cloned()
        })
    }

    /// Apply `changes` atomically.
    ///
    /// Changes run in order against a working copy of the tables, so each one
    /// sees the effect of those before it. Every update and delete must find
    /// its row, or nothing is written. The result holds the stored row for
    /// each insert and update, `None` for deletes, in input order.
    pub(crate) fn commit(&self, changes: Vec<Change>) -> BackendResult<Vec<Option<Row>>> {
        self.with(|tables| {
            let mut working = tables.clone();
            let stored = apply(&mut working, changes)?;
            *tables = working;
            Ok(stored)
        })
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

fn apply(tables: &mut Tables, changes: Vec<Change>) -> BackendResult<Vec<Option<Row>>> {
    let now = Value::String(Utc::now().to_rfc3339());
    let mut stored = Vec::with_capacity(changes.len());
    for change in changes {
        match change {
            Change::Insert {
                entity_set,
                shape,
                values,
            } => {
                let mut values = columns(shape, &values);
                for property in shape.properties() {
                    match property.generated() {
                        Some(Generated::Identity) if is_unset(values.get(property.name())) => {
                            let id = tables.next_identity(&entity_set);
                            values.insert(property.name().to_string(), id.into());
                        }
                        Some(Generated::Timestamp) => {
                            values.insert(property.name().to_string(), now.clone());
                        }
                        _ => {}
                    }
                }
                let row = Row { shape, values };
                tables.sets.entry(entity_set).or_default().push(row.clone());
                stored.push(Some(row));
            }
            Change::Update { key, shape, values } => {
                let mut values = columns(shape, &values);
                for property in shape.properties() {
                    if property.generated() == Some(Generated::Timestamp) {
                        values.insert(property.name().to_string(), now.clone());
                    }
                }
                let index = tables
                    .position(&key)
                    .ok_or_else(|| BackendError::KeyNotFound(key.clone()))?;
                let rows = tables.sets.entry(key.entity_set.clone()).or_default();
                let row = Row { shape, values };
                rows[index] = row.clone();
                stored.push(Some(row));
            }
            Change::Delete { key } => {
                let index = tables
                    .position(&key)
                    .ok_or_else(|| BackendError::KeyNotFound(key.clone()))?;
                tables.sets.entry(key.entity_set.clone()).or_default().remove(index);
                stored.push(None);
            }
        }
    }
    Ok(stored)
}

/// Scalar columns of `shape` taken from `record`
pub(crate) fn columns(shape: &EntityShape, record: &Record) -> Record {
    shape
        .properties()
        .filter_map(|property| match property.kind() {
            PropertyKind::Scalar(scalar) => Some((
                property.name().to_string(),
                record
                    .get(property.name())
                    .cloned()
                    .unwrap_or_else(|| scalar.default_value()),
            )),
            _ => None,
        })
        .collect()
}

fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(value) => value.as_i64() == Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{Customer, Order, PriorityOrder};

    #[test]
    fn test_open_requires_memory_scheme() {
        assert!(MemoryStore::open("memory://shop").is_ok());
        assert!(matches!(
            MemoryStore::open("postgres://localhost"),
            Err(BackendError::Connection(_))
        ));
        assert!(MemoryStore::open("memory://").is_err());
    }

    #[test]
    fn test_insert_assigns_identity_and_timestamp() {
        let store = MemoryStore::new("test");
        let first = store.insert("Orders", &Order::default()).unwrap();
        let second = store.insert("Orders", &Order::default()).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert!(first["updated_at"].is_string());
        assert_eq!(store.len("Orders"), 2);
    }

    #[test]
    fn test_rows_keep_scalar_columns_only() {
        let store = MemoryStore::new("test");
        let values = store.insert("Customers", &Customer::default()).unwrap();
        assert!(values.contains_key("name"));
        assert!(!values.contains_key("orders"));
    }

    #[test]
    fn test_derived_rows_keep_their_shape() {
        let store = MemoryStore::new("test");
        store.insert("Orders", &PriorityOrder::default()).unwrap();
        let rows = store.rows("Orders");
        assert_eq!(rows[0].shape.name(), "PriorityOrder");
        assert!(rows[0].values.contains_key("priority"));
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let store = MemoryStore::new("test");
        let missing = EntityKey {
            entity_set: "Orders".into(),
            key: "99".into(),
        };
        let result = store.commit(vec![
            Change::Insert {
                entity_set: "Orders".into(),
                shape: <Order as Entity>::shape(),
                values: Record::new(),
            },
            Change::Delete { key: missing },
        ]);
        assert!(matches!(result, Err(BackendError::KeyNotFound(_))));
        assert!(store.is_empty("Orders"));
    }

    #[test]
    fn test_commit_sees_earlier_changes_in_the_batch() {
        let store = MemoryStore::new("test");
        let values = store
            .insert(
                "Orders",
                &Order {
                    total: 10.0,
                    ..Order::default()
                },
            )
            .unwrap();
        let key = EntityKey::of("Orders", <Order as Entity>::shape(), &values);

        let result = store.commit(vec![
            Change::Update {
                key: key.clone(),
                shape: <Order as Entity>::shape(),
                values: {
                    let mut changed = values.clone();
                    changed.insert("total".into(), 99.0_f64.into());
                    changed
                },
            },
            Change::Delete { key: key.clone() },
            Change::Delete { key: key.clone() },
        ]);
        assert!(matches!(result, Err(BackendError::KeyNotFound(_))));

        let row = store.find(&key).unwrap();
        assert_eq!(row.values["total"], 10.0);
        assert_eq!(store.len("Orders"), 1);
    }
}
