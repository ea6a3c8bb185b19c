//! In-process object context.
//!
//! A [`MemoryContext`] is one session over a [`MemoryStore`]: it keeps an
//! identity map of tracked objects with their states, evaluates query plans
//! against stored rows, and commits pending changes in one step.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use uuid::Uuid;

use domain::{
    DomainError, DomainResult, EntityShape, ObjectId, PropertyKind, Record, ShapeId,
    TrackedObject,
};

use super::store::{columns, Change, MemoryStore, Row};
use crate::infra::backend::{
    AddCall, AddEntryPoint, BackendError, BackendResult, ContainerKind, ContextMember, EntityKey,
    EntityState, ObjectContext, SaveSummary,
};
use crate::infra::entity_set::mapped_shape;
use crate::query::predicate::sort_order;
use crate::query::{MergeOption, QueryPlan};
use crate::types::{Direction, RefreshMode};

/// Members and entry points a context type exposes
#[derive(Debug)]
struct Schema {
    context_type: &'static str,
    members: Vec<ContextMember>,
    add_points: Vec<AddEntryPoint>,
    /// Typed add method -> entity set
    typed_sets: HashMap<String, String>,
    /// Mapped shape -> entity set
    set_names: HashMap<ShapeId, String>,
}

/// Builder for [`MemoryContext`]
pub struct MemoryContextBuilder {
    schema: Schema,
}

impl MemoryContextBuilder {
    /// Expose `shape` through a query-style member
    pub fn query(self, name: &str, shape: &'static EntityShape) -> Self {
        self.member(name, ContainerKind::Query, shape)
    }

    /// Expose `shape` through a set-style member
    pub fn set(self, name: &str, shape: &'static EntityShape) -> Self {
        self.member(name, ContainerKind::Set, shape)
    }

    fn member(mut self, name: &str, container: ContainerKind, shape: &'static EntityShape) -> Self {
        self.schema
            .members
            .push(ContextMember::new(name, container, shape));
        self.schema
            .set_names
            .entry(shape.id())
            .or_insert_with(|| name.to_string());
        self
    }

    /// Offer a typed add entry point that inserts into `entity_set`
    pub fn add_method(mut self, method: &str, shape: &'static EntityShape, entity_set: &str) -> Self {
        self.schema.add_points.push(AddEntryPoint::Typed {
            method: method.to_string(),
            entity: shape.id(),
        });
        self.schema
            .typed_sets
            .insert(method.to_string(), entity_set.to_string());
        self
    }

    /// Offer the generic add-by-set-name entry point
    pub fn add_object(mut self, method: &str) -> Self {
        self.schema.add_points.push(AddEntryPoint::Named {
            method: method.to_string(),
        });
        self
    }

    pub fn build(self, store: MemoryStore) -> MemoryContext {
        MemoryContext::open(Arc::new(self.schema), store)
    }
}

#[derive(Debug)]
struct Entry {
    key: EntityKey,
    state: EntityState,
    object: Arc<dyn TrackedObject>,
}

/// Object-context session over a [`MemoryStore`]
pub struct MemoryContext {
    schema: Arc<Schema>,
    store: MemoryStore,
    session: Uuid,
    entries: Vec<Entry>,
    closed: bool,
}

impl MemoryContext {
    pub fn builder(context_type: &'static str) -> MemoryContextBuilder {
        MemoryContextBuilder {
            schema: Schema {
                context_type,
                members: Vec::new(),
                add_points: Vec::new(),
                typed_sets: HashMap::new(),
                set_names: HashMap::new(),
            },
        }
    }

    fn open(schema: Arc<Schema>, store: MemoryStore) -> Self {
        let session = Uuid::new_v4();
        tracing::debug!(
            context = schema.context_type,
            store = store.name(),
            %session,
            "opened memory context"
        );
        Self {
            schema,
            store,
            session,
            entries: Vec::new(),
            closed: false,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if self.closed {
            Err(BackendError::Closed)
        } else {
            Ok(())
        }
    }

    fn ensure_set(&self, entity_set: &str) -> BackendResult<()> {
        if self.schema.members.iter().any(|m| m.name == entity_set) {
            Ok(())
        } else {
            Err(BackendError::Unsupported(format!(
                "{} exposes no entity set '{entity_set}'",
                self.schema.context_type
            )))
        }
    }

    fn by_object(&self, id: ObjectId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.object.object_id() == id)
    }

    fn tracked(&self, object: &dyn TrackedObject) -> BackendResult<usize> {
        self.by_object(object.object_id()).ok_or_else(|| {
            BackendError::NotTracked(format!(
                "{} is not tracked by session {}",
                object.shape().name(),
                self.session
            ))
        })
    }

    /// Entry under `key`, preferring persisted entries over added ones
    fn by_key(&self, key: &EntityKey) -> Option<usize> {
        let mut matching = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.key == *key);
        let first = matching.next()?;
        if first.1.state != EntityState::Added {
            return Some(first.0);
        }
        matching
            .find(|(_, entry)| entry.state != EntityState::Added)
            .or(Some(first))
            .map(|(index, _)| index)
    }

    /// Stored rows of the plan's entity set narrowed to its shape and filter.
    ///
    /// Filters see persisted values only; unsaved client edits never decide
    /// membership.
    fn select(&self, plan: &QueryPlan) -> BackendResult<Vec<Row>> {
        let mut selected = Vec::new();
        for row in self.store.rows(&plan.entity_set) {
            if !row.shape.is_assignable_to(plan.of_type.id()) {
                continue;
            }
            if let Some(filter) = &plan.filter {
                let mut view = row.values.clone();
                self.expand_references(&mut view, row.shape)?;
                if !filter.evaluate(&view)? {
                    continue;
                }
            }
            selected.push(row);
        }
        Ok(selected)
    }

    /// Values returned for `row`: the tracked entry's current values when the
    /// plan merges into the identity map, the stored columns otherwise
    fn merged(&self, plan: &QueryPlan, row: &Row) -> BackendResult<Record> {
        if plan.merge == MergeOption::AppendOnly {
            if let Some(index) = self.by_key(&row.key(&plan.entity_set)) {
                let current = self.entries[index].object.snapshot()?;
                return Ok(columns(row.shape, &current));
            }
        }
        Ok(row.values.clone())
    }

    /// Populate every reference one level deep (filters may navigate them)
    fn expand_references(&self, record: &mut Record, shape: &'static EntityShape) -> BackendResult<()> {
        for property in shape.properties() {
            if let PropertyKind::Reference { .. } = property.kind() {
                self.populate(record, shape, &[property.name()])?;
            }
        }
        Ok(())
    }

    /// Fill in the navigation chain named by `segments`
    fn populate(&self, record: &mut Record, shape: &'static EntityShape, segments: &[&str]) -> BackendResult<()> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(());
        };
        let property = shape
            .property(first)
            .ok_or_else(|| DomainError::unknown_member(shape.name(), *first))?;

        match property.kind() {
            PropertyKind::Scalar(_) => Ok(()),
            PropertyKind::Reference {
                target,
                foreign_key,
            } => {
                let target = target();
                let mut related = match record.get(property.name()) {
                    Some(Value::Object(existing)) => Some(existing.clone()),
                    _ => match record.get(foreign_key) {
                        Some(fk) if !fk.is_null() => self.find_related(target, fk),
                        _ => None,
                    },
                };
                if let Some(related) = related.as_mut() {
                    self.populate(related, target, rest)?;
                }
                record.insert(
                    property.name().to_string(),
                    related.map(Value::Object).unwrap_or(Value::Null),
                );
                Ok(())
            }
            PropertyKind::Collection {
                target,
                inverse_key,
            } => {
                let target = target();
                let mut items = match record.get(property.name()) {
                    Some(Value::Array(existing)) if !existing.is_empty() => existing
                        .iter()
                        .filter_map(|item| item.as_object().cloned())
                        .collect(),
                    _ => self.find_children(shape, record, target, inverse_key),
                };
                for item in &mut items {
                    self.populate(item, target, rest)?;
                }
                record.insert(
                    property.name().to_string(),
                    Value::Array(items.into_iter().map(Value::Object).collect()),
                );
                Ok(())
            }
        }
    }

    fn set_for(&self, shape: &'static EntityShape) -> Option<&str> {
        self.schema
            .set_names
            .get(&mapped_shape(shape).id())
            .map(String::as_str)
    }

    fn find_related(&self, target: &'static EntityShape, key: &Value) -> Option<Record> {
        let entity_set = self.set_for(target)?;
        let key_name = target.key_properties().next()?.name();
        self.store
            .rows(entity_set)
            .into_iter()
            .find(|row| {
                row.shape.is_assignable_to(target.id())
                    && row.values.get(key_name).is_some_and(|v| sort_order(v, key).is_eq())
            })
            .map(|row| row.values)
    }

    fn find_children(
        &self,
        owner: &EntityShape,
        record: &Record,
        target: &'static EntityShape,
        inverse_key: &str,
    ) -> Vec<Record> {
        let owner_key = owner
            .key_properties()
            .next()
            .and_then(|key| record.get(key.name()));
        let (Some(entity_set), Some(owner_key)) = (self.set_for(target), owner_key) else {
            return Vec::new();
        };
        self.store
            .rows(entity_set)
            .into_iter()
            .filter(|row| {
                row.shape.is_assignable_to(target.id())
                    && row
                        .values
                        .get(inverse_key)
                        .is_some_and(|v| sort_order(v, owner_key).is_eq())
            })
            .map(|row| row.values)
            .collect()
    }

    fn mark_deleted(&mut self, index: usize) {
        match self.entries[index].state {
            EntityState::Added => {
                self.entries.remove(index);
            }
            EntityState::Deleted => {}
            _ => self.entries[index].state = EntityState::Deleted,
        }
    }

    fn transition_allowed(from: EntityState, to: EntityState) -> bool {
        matches!(
            (from, to),
            (EntityState::Unchanged, EntityState::Modified)
                | (EntityState::Modified, EntityState::Unchanged)
                | (EntityState::Unchanged | EntityState::Modified, EntityState::Deleted)
                | (EntityState::Deleted, EntityState::Unchanged)
        )
    }
}

impl ObjectContext for MemoryContext {
    fn context_type(&self) -> &'static str {
        self.schema.context_type
    }

    fn exposed_members(&self) -> &[ContextMember] {
        &self.schema.members
    }

    fn add_entry_points(&self) -> &[AddEntryPoint] {
        &self.schema.add_points
    }

    fn execute(&mut self, plan: &QueryPlan) -> BackendResult<Vec<Record>> {
        self.ensure_open()?;
        let mut selected = self.select(plan)?;

        if let Some(order) = &plan.order {
            selected.sort_by(|a, b| {
                let ordering = sort_order(
                    a.values.get(&order.field).unwrap_or(&Value::Null),
                    b.values.get(&order.field).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let skip = plan.limit.skip().unwrap_or(0) as usize;
        let take = plan.limit.take().map_or(usize::MAX, |take| take as usize);
        let window: Vec<_> = selected.into_iter().skip(skip).take(take).collect();

        let mut records = Vec::with_capacity(window.len());
        for row in window {
            let mut record = self.merged(plan, &row)?;
            for include in &plan.includes {
                let segments: Vec<&str> = include.split('.').collect();
                self.populate(&mut record, row.shape, &segments)?;
            }

            if plan.merge == MergeOption::AppendOnly {
                let key = row.key(&plan.entity_set);
                if self.by_key(&key).is_none() {
                    self.entries.push(Entry {
                        key,
                        state: EntityState::Unchanged,
                        object: Arc::new(RowObject::new(row.shape, row.values.clone())),
                    });
                }
            }
            records.push(record);
        }

        tracing::debug!(
            entity_set = %plan.entity_set,
            of_type = plan.of_type.name(),
            rows = records.len(),
            "executed query"
        );
        Ok(records)
    }

    fn count(&mut self, plan: &QueryPlan) -> BackendResult<u64> {
        self.ensure_open()?;
        Ok(self.select(plan)?.len() as u64)
    }

    fn add(&mut self, call: AddCall, object: Arc<dyn TrackedObject>) -> BackendResult<()> {
        self.ensure_open()?;
        let entity_set = match call {
            AddCall::Typed { method } => self
                .schema
                .typed_sets
                .get(&method)
                .cloned()
                .ok_or_else(|| BackendError::Unsupported(format!("no add method '{method}'")))?,
            AddCall::Named { method, entity_set } => {
                if AddEntryPoint::named(&self.schema.add_points) != Some(method.as_str()) {
                    return Err(BackendError::Unsupported(format!("no add method '{method}'")));
                }
                self.ensure_set(&entity_set)?;
                entity_set
            }
        };

        if let Some(index) = self.by_object(object.object_id()) {
            return Err(BackendError::InvalidStateTransition {
                from: self.entries[index].state,
                to: EntityState::Added,
            });
        }

        let key = self.entity_key(&entity_set, object.as_ref())?;
        self.entries.push(Entry {
            key,
            state: EntityState::Added,
            object,
        });
        Ok(())
    }

    fn entity_key(&self, entity_set: &str, object: &dyn TrackedObject) -> BackendResult<EntityKey> {
        Ok(EntityKey::of(entity_set, object.shape(), &object.snapshot()?))
    }

    fn entry_state(&self, key: &EntityKey) -> Option<EntityState> {
        self.by_key(key).map(|index| self.entries[index].state)
    }

    fn object_state(&self, object: ObjectId) -> Option<EntityState> {
        self.by_object(object).map(|index| self.entries[index].state)
    }

    fn attach_to(&mut self, entity_set: &str, object: Arc<dyn TrackedObject>) -> BackendResult<()> {
        self.ensure_open()?;
        self.ensure_set(entity_set)?;
        if self.by_object(object.object_id()).is_some() {
            return Ok(());
        }

        let key = self.entity_key(entity_set, object.as_ref())?;
        if let Some(index) = self.by_key(&key) {
            if self.entries[index].state != EntityState::Added {
                return Err(BackendError::DuplicateKey(key));
            }
        }
        self.entries.push(Entry {
            key,
            state: EntityState::Unchanged,
            object,
        });
        Ok(())
    }

    fn change_state(&mut self, object: &dyn TrackedObject, state: EntityState) -> BackendResult<()> {
        self.ensure_open()?;
        let index = self.tracked(object)?;
        let from = self.entries[index].state;
        if state == EntityState::Detached {
            self.entries.remove(index);
            return Ok(());
        }
        if !Self::transition_allowed(from, state) {
            return Err(BackendError::InvalidStateTransition { from, to: state });
        }
        self.entries[index].state = state;
        Ok(())
    }

    fn apply_current_values(&mut self, entity_set: &str, object: &dyn TrackedObject) -> BackendResult<()> {
        self.ensure_open()?;
        let key = self.entity_key(entity_set, object)?;
        let index = self
            .by_key(&key)
            .ok_or_else(|| BackendError::KeyNotFound(key.clone()))?;

        let entry = &mut self.entries[index];
        if entry.object.object_id() != object.object_id() {
            let current = columns(object.shape(), &object.snapshot()?);
            entry.object.load(&current)?;
        }
        if entry.state == EntityState::Unchanged {
            entry.state = EntityState::Modified;
        }
        Ok(())
    }

    fn delete_object(&mut self, object: &dyn TrackedObject) -> BackendResult<()> {
        self.ensure_open()?;
        let index = self.tracked(object)?;
        self.mark_deleted(index);
        Ok(())
    }

    fn delete_entry(&mut self, key: &EntityKey) -> BackendResult<()> {
        self.ensure_open()?;
        let index = self
            .by_key(key)
            .ok_or_else(|| BackendError::KeyNotFound(key.clone()))?;
        self.mark_deleted(index);
        Ok(())
    }

    fn detach(&mut self, object: &dyn TrackedObject) -> BackendResult<()> {
        self.ensure_open()?;
        let index = self.tracked(object)?;
        self.entries.remove(index);
        Ok(())
    }

    fn refresh(&mut self, mode: RefreshMode, object: &dyn TrackedObject) -> BackendResult<()> {
        self.ensure_open()?;
        let index = self.tracked(object)?;
        let entry = &self.entries[index];
        if entry.state == EntityState::Added {
            return Err(BackendError::InvalidStateTransition {
                from: EntityState::Added,
                to: EntityState::Unchanged,
            });
        }
        let row = self
            .store
            .find(&entry.key)
            .ok_or_else(|| BackendError::KeyNotFound(entry.key.clone()))?;

        let entry = &mut self.entries[index];
        match mode {
            RefreshMode::StoreWins => {
                entry.object.load(&row.values)?;
                entry.state = EntityState::Unchanged;
            }
            RefreshMode::ClientWins => {
                let generated: Record = row
                    .shape
                    .properties()
                    .filter(|property| property.generated().is_some())
                    .filter_map(|property| {
                        row.values
                            .get(property.name())
                            .map(|value| (property.name().to_string(), value.clone()))
                    })
                    .collect();
                entry.object.load(&generated)?;
            }
        }
        Ok(())
    }

    fn pending(&self, states: &[EntityState]) -> Vec<Arc<dyn TrackedObject>> {
        self.entries
            .iter()
            .filter(|entry| states.contains(&entry.state))
            .map(|entry| Arc::clone(&entry.object))
            .collect()
    }

    fn save_changes(&mut self) -> BackendResult<SaveSummary> {
        self.ensure_open()?;
        let mut changes = Vec::new();
        let mut touched = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let change = match entry.state {
                EntityState::Added => Change::Insert {
                    entity_set: entry.key.entity_set.clone(),
                    shape: entry.object.shape(),
                    values: entry.object.snapshot()?,
                },
                EntityState::Modified => Change::Update {
                    key: entry.key.clone(),
                    shape: entry.object.shape(),
                    values: entry.object.snapshot()?,
                },
                EntityState::Deleted => Change::Delete {
                    key: entry.key.clone(),
                },
                _ => continue,
            };
            changes.push(change);
            touched.push(index);
        }

        let mut summary = SaveSummary::default();
        let stored = self.store.commit(changes)?;
        let mut removed = Vec::new();
        for (index, row) in touched.into_iter().zip(stored) {
            let entry = &mut self.entries[index];
            match (entry.state, row) {
                (EntityState::Deleted, _) => {
                    summary.deleted += 1;
                    removed.push(index);
                }
                (state, Some(row)) => {
                    if state == EntityState::Added {
                        summary.inserted += 1;
                    } else {
                        summary.updated += 1;
                    }
                    entry.key = row.key(&entry.key.entity_set);
                    entry.state = EntityState::Unchanged;
                }
                (_, None) => {}
            }
        }
        for index in removed.into_iter().rev() {
            self.entries.remove(index);
        }

        tracing::debug!(
            session = %self.session,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "committed changes"
        );
        Ok(summary)
    }

    fn create_object(&self, shape: &'static EntityShape) -> BackendResult<Record> {
        Ok(shape
            .properties()
            .map(|property| {
                let value = match property.kind() {
                    PropertyKind::Scalar(scalar) => scalar.default_value(),
                    PropertyKind::Reference { .. } => Value::Null,
                    PropertyKind::Collection { .. } => Value::Array(Vec::new()),
                };
                (property.name().to_string(), value)
            })
            .collect())
    }

    fn connection(&self) -> &str {
        self.store.name()
    }

    fn reopen(&self) -> BackendResult<Box<dyn ObjectContext>> {
        Ok(Box::new(MemoryContext::open(
            Arc::clone(&self.schema),
            self.store.clone(),
        )))
    }

    fn close(&mut self) {
        if !self.closed {
            tracing::debug!(session = %self.session, tracked = self.entries.len(), "closing memory context");
            self.entries.clear();
            self.closed = true;
        }
    }
}

/// A row materialized by a tracked query, with no caller-side instance
#[derive(Debug)]
struct RowObject {
    shape: &'static EntityShape,
    values: RwLock<Record>,
}

impl RowObject {
    fn new(shape: &'static EntityShape, values: Record) -> Self {
        Self {
            shape,
            values: RwLock::new(values),
        }
    }
}

impl TrackedObject for RowObject {
    fn shape(&self) -> &'static EntityShape {
        self.shape
    }

    fn object_id(&self) -> ObjectId {
        ObjectId::from_address(self as *const Self as usize)
    }

    fn snapshot(&self) -> DomainResult<Record> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn load(&self, record: &Record) -> DomainResult<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        for (field, value) in record {
            values.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use domain::{Entity, Tracked};

    use super::*;
    use crate::demo::{self, Customer, Order};
    use crate::query::{Predicate, QuerySpecification};

    fn context() -> MemoryContext {
        demo::shop_context(demo::seeded_store(3, 2).unwrap())
    }

    fn orders_plan(spec: &QuerySpecification<Order>, merge: MergeOption) -> QueryPlan {
        QueryPlan::from_spec("Orders", Order::shape(), spec, merge)
    }

    #[test]
    fn test_filter_and_window() {
        let mut ctx = context();
        let spec = QuerySpecification::<Order>::new()
            .filter(Predicate::new(|o| o.field("total").gt(0)))
            .order_by_descending("total")
            .limit(1, 2);
        let rows = ctx.execute(&orders_plan(&spec, MergeOption::NoTracking)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0]["total"].as_f64() >= rows[1]["total"].as_f64());
    }

    #[test]
    fn test_include_populates_reference_and_collection() {
        let mut ctx = context();
        let spec = QuerySpecification::<Order>::new()
            .load_with("customer")
            .load_with("lines");
        let rows = ctx.execute(&orders_plan(&spec, MergeOption::NoTracking)).unwrap();
        for row in rows {
            assert!(row["customer"].is_object());
            assert!(row["lines"].as_array().is_some_and(|lines| !lines.is_empty()));
        }
    }

    #[test]
    fn test_nested_include() {
        let mut ctx = context();
        let spec = QuerySpecification::<Order>::new().load_with("customer.orders");
        let rows = ctx.execute(&orders_plan(&spec, MergeOption::NoTracking)).unwrap();
        assert!(rows[0]["customer"]["orders"].as_array().is_some_and(|o| !o.is_empty()));
    }

    #[test]
    fn test_filter_can_navigate_references() {
        let mut ctx = context();
        let spec = QuerySpecification::<Order>::new()
            .filter(Predicate::new(|o| o.field("customer").field("name").eq("Customer 1")));
        let plan = orders_plan(&spec, MergeOption::NoTracking);
        assert_eq!(ctx.count(&plan).unwrap(), 2);
    }

    #[test]
    fn test_tracked_query_registers_unchanged_entries() {
        let mut ctx = context();
        let spec = QuerySpecification::<Customer>::new();
        let plan = QueryPlan::from_spec("Customers", Customer::shape(), &spec, MergeOption::AppendOnly);
        ctx.execute(&plan).unwrap();
        assert_eq!(ctx.pending(&[EntityState::Unchanged]).len(), 3);

        let untracked = QueryPlan::from_spec("Customers", Customer::shape(), &spec, MergeOption::NoTracking);
        let mut fresh = context();
        fresh.execute(&untracked).unwrap();
        assert!(fresh.pending(&[EntityState::Unchanged]).is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let mut ctx = context();
        let order = Tracked::new(Order {
            id: 1,
            ..Order::default()
        });
        let object = order.object();

        assert!(matches!(
            ctx.change_state(object.as_ref(), EntityState::Modified),
            Err(BackendError::NotTracked(_))
        ));
        ctx.attach_to("Orders", order.object()).unwrap();
        ctx.change_state(object.as_ref(), EntityState::Modified).unwrap();
        assert!(matches!(
            ctx.change_state(object.as_ref(), EntityState::Modified),
            Err(BackendError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_attach_duplicate_key_rejected() {
        let mut ctx = context();
        let first = Tracked::new(Order { id: 1, ..Order::default() });
        let second = Tracked::new(Order { id: 1, ..Order::default() });
        ctx.attach_to("Orders", first.object()).unwrap();
        assert!(matches!(
            ctx.attach_to("Orders", second.object()),
            Err(BackendError::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_save_inserts_updates_and_deletes() {
        let mut ctx = context();
        let before = ctx.store().len("Orders");

        let added = Tracked::new(Order {
            total: 5.0,
            customer_id: Some(1),
            ..Order::default()
        });
        ctx.add(
            AddCall::Typed {
                method: "AddToOrders".into(),
            },
            added.object(),
        )
        .unwrap();

        let existing = Tracked::new(Order::from_record(&ctx.store().rows("Orders")[0].values).unwrap());
        ctx.attach_to("Orders", existing.object()).unwrap();
        existing.update(|o| o.total = 999.0);
        ctx.change_state(existing.object().as_ref(), EntityState::Modified).unwrap();

        let doomed = Tracked::new(Order::from_record(&ctx.store().rows("Orders")[1].values).unwrap());
        ctx.attach_to("Orders", doomed.object()).unwrap();
        ctx.delete_object(doomed.object().as_ref()).unwrap();

        let summary = ctx.save_changes().unwrap();
        assert_eq!(summary, SaveSummary { inserted: 1, updated: 1, deleted: 1 });
        assert_eq!(ctx.store().len("Orders"), before);
        assert!(ctx.pending(&[EntityState::Added, EntityState::Modified]).is_empty());
        // no key fixup without a refresh
        assert_eq!(added.get().id, 0);
    }

    #[test]
    fn test_refresh_store_wins_and_client_wins() {
        let mut ctx = context();
        let row = ctx.store().rows("Orders")[0].values.clone();
        let order = Tracked::new(Order::from_record(&row).unwrap());
        ctx.attach_to("Orders", order.object()).unwrap();

        order.update(|o| {
            o.total = -1.0;
            o.updated_at = None;
        });
        ctx.refresh(RefreshMode::ClientWins, order.object().as_ref()).unwrap();
        assert_eq!(order.get().total, -1.0);
        assert!(order.get().updated_at.is_some());

        ctx.refresh(RefreshMode::StoreWins, order.object().as_ref()).unwrap();
        assert_eq!(order.get().total, row["total"].as_f64().unwrap());
    }

    #[test]
    fn test_refresh_added_entity_is_rejected() {
        let mut ctx = context();
        let order = Tracked::new(Order { total: 1.0, ..Order::default() });
        ctx.add(AddCall::Typed { method: "AddToOrders".into() }, order.object()).unwrap();
        assert!(matches!(
            ctx.refresh(RefreshMode::StoreWins, order.object().as_ref()),
            Err(BackendError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_closed_context_refuses_work() {
        let mut ctx = context();
        ctx.close();
        let spec = QuerySpecification::<Order>::new();
        assert!(matches!(
            ctx.execute(&orders_plan(&spec, MergeOption::NoTracking)),
            Err(BackendError::Closed)
        ));
        assert!(ctx.reopen().is_ok());
    }

    #[test]
    fn test_reopened_session_shares_store() {
        let mut ctx = context();
        let order = Tracked::new(Order { total: 3.0, ..Order::default() });
        ctx.add(AddCall::Typed { method: "AddToOrders".into() }, order.object()).unwrap();
        ctx.save_changes().unwrap();

        let other = ctx.reopen().unwrap();
        assert_eq!(other.connection(), ctx.connection());
        assert!(other.pending(&[EntityState::Unchanged]).is_empty());
    }
}
