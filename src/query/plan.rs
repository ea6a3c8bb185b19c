//! Backend-facing query plans.
//!
//! A plan is a specification resolved against a backend: the entity set to
//! read from, the shape to narrow to, include directives in registration
//! order, a single untyped filter, and the sort/page window.

use serde::Serialize;

use domain::{Entity, EntityShape};

use super::predicate::Lambda;
use super::spec::QuerySpecification;
use crate::types::{Limit, OrderBy};

/// How query results interact with the backend's identity map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeOption {
    /// Results are tracked; already-tracked rows keep their current values
    #[default]
    AppendOnly,
    /// Results are materialized without being tracked
    NoTracking,
}

/// Resolved query handed to an object-context backend
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub entity_set: String,
    /// Shape the entity set is mapped to
    pub root: &'static EntityShape,
    /// Shape results are narrowed to (equal to `root` unless querying a derived shape)
    pub of_type: &'static EntityShape,
    pub includes: Vec<String>,
    pub filter: Option<Lambda>,
    pub order: Option<OrderBy>,
    pub limit: Limit,
    pub merge: MergeOption,
}

impl QueryPlan {
    /// Build a plan for `spec` against `entity_set`
    pub fn from_spec<T: Entity>(
        entity_set: impl Into<String>,
        root: &'static EntityShape,
        spec: &QuerySpecification<T>,
        merge: MergeOption,
    ) -> Self {
        Self {
            entity_set: entity_set.into(),
            root,
            of_type: T::shape(),
            includes: spec.preloaded_members(),
            filter: spec.combined_predicate().map(|p| p.into_lambda()),
            order: spec.order().cloned(),
            limit: spec.get_limit(),
            merge,
        }
    }

    /// Same plan without ordering or paging, for counting
    pub fn for_count(mut self) -> Self {
        self.order = None;
        self.limit = Limit::default();
        self.includes.clear();
        self
    }

    pub fn is_narrowed(&self) -> bool {
        self.root.id() != self.of_type.id()
    }
}

/// Query sent to a remote entity-collection service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceQuery {
    pub entity_set: String,
    pub filter: Option<Lambda>,
    pub order: Option<OrderBy>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl ServiceQuery {
    pub fn from_spec<T: Entity>(entity_set: impl Into<String>, spec: &QuerySpecification<T>) -> Self {
        let limit = spec.get_limit();
        Self {
            entity_set: entity_set.into(),
            filter: spec.combined_predicate().map(|p| p.into_lambda()),
            order: spec.order().cloned(),
            skip: limit.skip(),
            take: limit.take(),
        }
    }

    /// Same query without ordering or paging, for counting
    pub fn for_count(mut self) -> Self {
        self.order = None;
        self.skip = None;
        self.take = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{Order, PriorityOrder};
    use crate::query::Predicate;

    #[test]
    fn test_plan_carries_spec() {
        let spec = QuerySpecification::<Order>::new()
            .filter(Predicate::new(|o| o.field("total").gt(100)))
            .filter(Predicate::new(|o| o.field("status").eq("open")))
            .load_with("customer")
            .order_by("total")
            .limit(0, 10);
        let plan = QueryPlan::from_spec("Orders", Order::shape(), &spec, MergeOption::NoTracking);

        assert_eq!(plan.entity_set, "Orders");
        assert_eq!(plan.includes, vec!["customer"]);
        assert!(plan.filter.is_some());
        assert_eq!(plan.limit.take(), Some(10));
        assert!(!plan.is_narrowed());
    }

    #[test]
    fn test_count_plan_drops_window() {
        let spec = QuerySpecification::<PriorityOrder>::new()
            .order_by("total")
            .limit(3, 10);
        let plan = QueryPlan::from_spec("Orders", Order::shape(), &spec, MergeOption::AppendOnly)
            .for_count();
        assert!(plan.order.is_none());
        assert_eq!(plan.limit, Limit::default());
        assert!(plan.is_narrowed());
    }

    #[test]
    fn test_service_query_serializes() {
        let spec = QuerySpecification::<Order>::new()
            .filter(Predicate::new(|o| o.field("total").gt(100)))
            .limit(5, 10);
        let query = ServiceQuery::from_spec("Order", &spec);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["skip"], 5);
        assert_eq!(json["filter"]["body"]["node"], "compare");
    }
}
