//! Shared value types used by specifications, adapters, and backends.

mod pagination;
mod tracking;

pub use pagination::{Direction, Limit, OrderBy};
pub use tracking::{RefreshMode, RefreshPolicy, TrackingPolicy};
