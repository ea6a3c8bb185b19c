//! Query specifications.
//!
//! A [`QuerySpecification`] collects everything a caller wants from one query
//! (filters, eager loads, a sort key and a page) without saying anything about
//! how a backend runs it. Repositories turn it into a [`QueryPlan`].
//!
//! [`QueryPlan`]: super::plan::QueryPlan

use std::collections::HashSet;
use std::fmt;

use domain::{Entity, NavigationMember};

use super::path;
use super::predicate::Predicate;
use crate::errors::RepoResult;
use crate::types::{Direction, Limit, OrderBy};

/// An eager-load requirement as registered
#[derive(Debug, Clone, PartialEq)]
enum Preload {
    /// Resolved against the root shape when read
    Member(NavigationMember),
    /// Used verbatim
    Path(String),
}

/// Filters, eager loads, ordering and paging for a query over `T`
pub struct QuerySpecification<T> {
    predicates: Vec<Predicate<T>>,
    preloads: Vec<Preload>,
    order: Option<OrderBy>,
    limit: Limit,
}

impl<T: Entity> QuerySpecification<T> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
            preloads: Vec::new(),
            order: None,
            limit: Limit::default(),
        }
    }

    /// Add a filter; all filters must hold
    pub fn filter(mut self, predicate: Predicate<T>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Predicate<T>>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Eager-load a dotted navigation path. Registering a path twice is a no-op.
    pub fn load_with(mut self, path: impl Into<String>) -> Self {
        let preload = Preload::Path(path.into());
        if !self.preloads.contains(&preload) {
            self.preloads.push(preload);
        }
        self
    }

    /// Eager-load whatever `member` is reachable through. Registering the
    /// same member twice is a no-op.
    pub fn load_with_member(mut self, member: NavigationMember) -> Self {
        let preload = Preload::Member(member);
        if !self.preloads.contains(&preload) {
            self.preloads.push(preload);
        }
        self
    }

    /// Eager-load a navigation property of `T` by name
    pub fn load_with_property(self, name: &str) -> RepoResult<Self> {
        let member = T::shape().member(name)?;
        Ok(self.load_with_member(member))
    }

    /// Sort ascending on `field`, replacing any previous sort key
    pub fn order_by(self, field: impl Into<String>) -> Self {
        self.set_order(Some(OrderBy::new(field, Direction::Asc)))
    }

    /// Sort descending on `field`, replacing any previous sort key
    pub fn order_by_descending(self, field: impl Into<String>) -> Self {
        self.set_order(Some(OrderBy::new(field, Direction::Desc)))
    }

    pub fn set_order(mut self, order: Option<OrderBy>) -> Self {
        self.order = order;
        self
    }

    /// Replace paging with a bounded window
    pub fn limit(self, skip: u64, take: u64) -> Self {
        self.limit_to(Limit::new(skip, take))
    }

    pub fn limit_to(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    pub fn predicates(&self) -> &[Predicate<T>] {
        &self.predicates
    }

    /// All filters joined with AND, `None` when unfiltered
    pub fn combined_predicate(&self) -> Option<Predicate<T>> {
        Predicate::all(self.predicates.iter().cloned())
    }

    /// Eager-load paths relative to `T`, in registration order without duplicates
    pub fn preloaded_members(&self) -> Vec<String> {
        let root = T::shape();
        let mut seen = HashSet::new();
        self.preloads
            .iter()
            .map(|preload| match preload {
                Preload::Member(member) => path::resolve(root, member),
                Preload::Path(path) => path.clone(),
            })
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }

    /// Append raw eager-load paths
    pub fn set_preloaded_members<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for path in paths {
            self = self.load_with(path);
        }
        self
    }

    pub fn order(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    /// Direction of the active sort key (ascending when unsorted)
    pub fn direction(&self) -> Direction {
        self.order
            .as_ref()
            .map(|order| order.direction)
            .unwrap_or_default()
    }

    pub fn get_limit(&self) -> Limit {
        self.limit
    }

    /// Project this specification onto `dest`.
    ///
    /// Paging and ordering are copied verbatim, every filter is converted to
    /// `U`, and every eager load is re-registered so member-based loads resolve
    /// against `U`. If any filter fails to convert, nothing is copied.
    pub fn copy_to<U: Entity>(
        &self,
        dest: QuerySpecification<U>,
    ) -> RepoResult<QuerySpecification<U>> {
        let converted = self
            .predicates
            .iter()
            .map(Predicate::convert::<U>)
            .collect::<RepoResult<Vec<_>>>()?;

        let mut dest = dest
            .limit_to(self.limit)
            .set_order(self.order.clone())
            .filter_all(converted);
        for preload in &self.preloads {
            dest = match preload {
                Preload::Member(member) => dest.load_with_member(member.clone()),
                Preload::Path(path) => dest.load_with(path.clone()),
            };
        }
        Ok(dest)
    }

    /// Shorthand for copying into a fresh specification
    pub fn retarget<U: Entity>(&self) -> RepoResult<QuerySpecification<U>> {
        self.copy_to(QuerySpecification::new())
    }
}

impl<T: Entity> Default for QuerySpecification<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for QuerySpecification<T> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            preloads: self.preloads.clone(),
            order: self.order.clone(),
            limit: self.limit,
        }
    }
}

impl<T> fmt::Debug for QuerySpecification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpecification")
            .field("predicates", &self.predicates)
            .field("preloads", &self.preloads)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .finish()
    }
}
