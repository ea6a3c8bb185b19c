//! Query layer - specifications, predicates and path resolution.
//!
//! Everything here is backend-agnostic; repositories turn a
//! [`QuerySpecification`] into a [`QueryPlan`] or [`ServiceQuery`].

pub mod path;
pub mod plan;
pub mod predicate;
pub mod spec;

pub use plan::{MergeOption, QueryPlan, ServiceQuery};
pub use predicate::{CompareOp, EvalError, Expr, Lambda, LogicalOp, Operand, Param, Parameter, Predicate};
pub use spec::QuerySpecification;
