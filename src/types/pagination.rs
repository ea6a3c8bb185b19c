//! Pagination and ordering types for query specifications.

use serde::{Deserialize, Serialize};

/// Skip/take window applied after filtering and ordering.
///
/// `take == None` means unbounded. The default window (skip 0, unbounded)
/// leaves the query untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Limit {
    pub skip: u64,
    pub take: Option<u64>,
}

impl Limit {
    pub fn new(skip: u64, take: u64) -> Self {
        Self {
            skip,
            take: Some(take),
        }
    }

    /// Skip only, take everything after
    pub fn unbounded(skip: u64) -> Self {
        Self { skip, take: None }
    }

    /// Skip to apply, if not the default
    pub fn skip(&self) -> Option<u64> {
        (self.skip != 0).then_some(self.skip)
    }

    /// Take to apply, if bounded
    pub fn take(&self) -> Option<u64> {
        self.take
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// The single active sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_applies_nothing() {
        let limit = Limit::default();
        assert_eq!(limit.skip(), None);
        assert_eq!(limit.take(), None);
    }

    #[test]
    fn test_bounded_window() {
        let limit = Limit::new(5, 10);
        assert_eq!(limit.skip(), Some(5));
        assert_eq!(limit.take(), Some(10));
        assert_eq!(Limit::new(0, 0).take(), Some(0));
    }
}
