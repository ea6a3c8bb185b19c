//! Predicate expression trees.
//!
//! A predicate is a boolean [`Lambda`] over a single entity parameter. The
//! tree is plain data (serializable, comparable) so it can be shipped to a
//! backend, combined with other predicates, or retargeted at a structurally
//! related shape.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use domain::{Entity, EntityShape, Property, Record};

use crate::config::DEFAULT_PARAMETER_NAME;
use crate::errors::{RepoError, RepoResult};

static NEXT_PARAMETER: AtomicU64 = AtomicU64::new(1);
static NULL: Value = Value::Null;

/// A lambda parameter. Identity is the id, never the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    id: u64,
    name: String,
    shape: String,
}

impl Parameter {
    fn fresh(name: &str, shape: &str) -> Self {
        Self {
            id: NEXT_PARAMETER.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.to_string(),
            shape: shape.to_string(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the shape the parameter ranges over
    pub fn shape(&self) -> &str {
        &self.shape
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    Parameter {
        parameter: Parameter,
    },
    /// `target.member`, where `declaring` names the shape that declares it
    Member {
        target: Box<Expr>,
        member: String,
        declaring: String,
    },
    Literal {
        value: Value,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        operand: Box<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal {
            value: value.into(),
        }
    }

    pub fn and(self, other: Expr) -> Self {
        Self::logical(LogicalOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Self::logical(LogicalOp::Or, self, other)
    }

    fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not {
            operand: Box::new(self),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Parameter { parameter } => f.write_str(&parameter.name),
            Expr::Member { target, member, .. } => write!(f, "{target}.{member}"),
            Expr::Literal { value } => write!(f, "{value}"),
            Expr::Compare { op, left, right } => {
                let symbol = match op {
                    CompareOp::Eq => "==",
                    CompareOp::Ne => "!=",
                    CompareOp::Gt => ">",
                    CompareOp::Ge => ">=",
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                    CompareOp::Contains => "contains",
                    CompareOp::StartsWith => "starts_with",
                };
                write!(f, "({left} {symbol} {right})")
            }
            Expr::Logical { op, left, right } => {
                let symbol = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                write!(f, "({left} {symbol} {right})")
            }
            Expr::Not { operand } => write!(f, "!{operand}"),
        }
    }
}

/// Evaluation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("parameter '{0}' is not bound")]
    UnboundParameter(String),

    #[error("member '{0}' accessed on a value that is not an entity")]
    NotAnObject(String),

    #[error("expected a boolean, found {0}")]
    NotBoolean(String),
}

/// Untyped boolean lambda: one parameter and a body over it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub parameter: Parameter,
    pub body: Expr,
}

impl Lambda {
    /// Evaluate against a record bound to the parameter
    pub fn evaluate(&self, record: &Record) -> Result<bool, EvalError> {
        let result = eval(&self.body, &self.parameter, record)?;
        truth(&result.into_value())
    }

    /// Merge two lambdas into one over `self`'s parameter
    fn compose(self, other: Lambda, op: LogicalOp) -> Lambda {
        let mut map = HashMap::new();
        map.insert(other.parameter.id, self.parameter.clone());
        let right = rebind(other.body, &map);
        Lambda {
            parameter: self.parameter,
            body: Expr::logical(op, self.body, right),
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.parameter.name, self.body)
    }
}

/// Parameter reference handed to predicate builders
pub struct Param<T> {
    parameter: Parameter,
    _shape: PhantomData<fn() -> T>,
}

impl<T: Entity> Param<T> {
    /// Access a member of the entity
    pub fn field(&self, name: &str) -> Operand {
        Operand::member(self.expr(), Some(T::shape()), name)
    }

    pub fn expr(&self) -> Expr {
        Expr::Parameter {
            parameter: self.parameter.clone(),
        }
    }
}

/// A value-producing expression under construction
#[derive(Debug, Clone)]
pub struct Operand {
    expr: Expr,
    shape: Option<&'static EntityShape>,
}

impl Operand {
    fn member(target: Expr, owner: Option<&'static EntityShape>, name: &str) -> Self {
        let property = owner.and_then(|shape| shape.property(name));
        let declaring = property
            .map(|p| p.declaring().name())
            .or_else(|| owner.map(EntityShape::name))
            .unwrap_or_default();
        Self {
            expr: Expr::Member {
                target: Box::new(target),
                member: name.to_string(),
                declaring: declaring.to_string(),
            },
            shape: property.and_then(Property::target),
        }
    }

    /// Access a member of the related entity
    pub fn field(self, name: &str) -> Operand {
        Operand::member(self.expr, self.shape, name)
    }

    pub fn eq(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::Eq, self.expr, Expr::literal(value))
    }

    pub fn ne(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::Ne, self.expr, Expr::literal(value))
    }

    pub fn gt(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::Gt, self.expr, Expr::literal(value))
    }

    pub fn ge(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::Ge, self.expr, Expr::literal(value))
    }

    pub fn lt(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::Lt, self.expr, Expr::literal(value))
    }

    pub fn le(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::Le, self.expr, Expr::literal(value))
    }

    pub fn contains(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::Contains, self.expr, Expr::literal(value))
    }

    pub fn starts_with(self, value: impl Into<Value>) -> Expr {
        Expr::compare(CompareOp::StartsWith, self.expr, Expr::literal(value))
    }

    pub fn is_null(self) -> Expr {
        Expr::compare(CompareOp::Eq, self.expr, Expr::Literal { value: Value::Null })
    }

    /// Compare against another member
    pub fn compare_to(self, op: CompareOp, other: Operand) -> Expr {
        Expr::compare(op, self.expr, other.expr)
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

/// Boolean predicate over entities of type `T`
pub struct Predicate<T> {
    lambda: Lambda,
    _shape: PhantomData<fn() -> T>,
}

impl<T: Entity> Predicate<T> {
    /// Build a predicate over a fresh parameter
    ///
    /// ```ignore
    /// let expensive = Predicate::<Order>::new(|o| o.field("total").gt(100));
    /// ```
    pub fn new(build: impl FnOnce(&Param<T>) -> Expr) -> Self {
        Self::named(DEFAULT_PARAMETER_NAME, build)
    }

    /// Build a predicate whose parameter carries `name`
    pub fn named(name: &str, build: impl FnOnce(&Param<T>) -> Expr) -> Self {
        let param = Param {
            parameter: Parameter::fresh(name, T::shape().name()),
            _shape: PhantomData,
        };
        let body = build(&param);
        Self::from_lambda(Lambda {
            parameter: param.parameter,
            body,
        })
    }

    fn from_lambda(lambda: Lambda) -> Self {
        Self {
            lambda,
            _shape: PhantomData,
        }
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    pub fn into_lambda(self) -> Lambda {
        self.lambda
    }

    pub fn parameter(&self) -> &Parameter {
        &self.lambda.parameter
    }

    pub fn body(&self) -> &Expr {
        &self.lambda.body
    }

    pub fn evaluate(&self, entity: &T) -> RepoResult<bool> {
        let record = entity.to_record()?;
        Ok(self.lambda.evaluate(&record)?)
    }

    /// Both must hold; the result ranges over `self`'s parameter
    pub fn and(self, other: Self) -> Self {
        Self::from_lambda(self.lambda.compose(other.lambda, LogicalOp::And))
    }

    /// Either must hold; the result ranges over `self`'s parameter
    pub fn or(self, other: Self) -> Self {
        Self::from_lambda(self.lambda.compose(other.lambda, LogicalOp::Or))
    }

    /// AND of all predicates, `None` when there are none
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Option<Self> {
        predicates.into_iter().reduce(Self::and)
    }

    /// OR of all predicates, `None` when there are none
    pub fn any(predicates: impl IntoIterator<Item = Self>) -> Option<Self> {
        predicates.into_iter().reduce(Self::or)
    }

    /// Retarget this predicate at the structurally related shape `U`.
    ///
    /// Every member accessed directly on the parameter must exist on `U`
    /// (declared or inherited); otherwise nothing is converted.
    pub fn convert<U: Entity>(&self) -> RepoResult<Predicate<U>> {
        let to = Parameter::fresh(&self.lambda.parameter.name, U::shape().name());
        let body = convert_expr(&self.lambda.body, &self.lambda.parameter, &to, U::shape())?;
        Ok(Predicate::from_lambda(Lambda { parameter: to, body }))
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            lambda: self.lambda.clone(),
            _shape: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.lambda).finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lambda.fmt(f)
    }
}

// =============================================================================
// Tree rewriting
// =============================================================================

fn rebind(expr: Expr, map: &HashMap<u64, Parameter>) -> Expr {
    match expr {
        Expr::Parameter { parameter } => Expr::Parameter {
            parameter: map.get(&parameter.id).cloned().unwrap_or(parameter),
        },
        Expr::Member {
            target,
            member,
            declaring,
        } => Expr::Member {
            target: Box::new(rebind(*target, map)),
            member,
            declaring,
        },
        Expr::Literal { value } => Expr::Literal { value },
        Expr::Compare { op, left, right } => {
            Expr::compare(op, rebind(*left, map), rebind(*right, map))
        }
        Expr::Logical { op, left, right } => {
            Expr::logical(op, rebind(*left, map), rebind(*right, map))
        }
        Expr::Not { operand } => !rebind(*operand, map),
    }
}

fn convert_expr(
    expr: &Expr,
    from: &Parameter,
    to: &Parameter,
    shape: &EntityShape,
) -> RepoResult<Expr> {
    Ok(match expr {
        Expr::Parameter { .. } => Expr::Parameter {
            parameter: to.clone(),
        },
        Expr::Member {
            target,
            member,
            declaring,
        } => match target.as_ref() {
            Expr::Parameter { parameter } if parameter.id == from.id => {
                let property =
                    shape
                        .property(member)
                        .ok_or_else(|| RepoError::ShapeConversion {
                            from: from.shape.clone(),
                            to: to.shape.clone(),
                            member: member.clone(),
                        })?;
                Expr::Member {
                    target: Box::new(Expr::Parameter {
                        parameter: to.clone(),
                    }),
                    member: member.clone(),
                    declaring: property.declaring().name().to_string(),
                }
            }
            _ => Expr::Member {
                target: Box::new(convert_expr(target, from, to, shape)?),
                member: member.clone(),
                declaring: declaring.clone(),
            },
        },
        Expr::Literal { value } => Expr::Literal {
            value: value.clone(),
        },
        Expr::Compare { op, left, right } => Expr::compare(
            *op,
            convert_expr(left, from, to, shape)?,
            convert_expr(right, from, to, shape)?,
        ),
        Expr::Logical { op, left, right } => Expr::logical(
            *op,
            convert_expr(left, from, to, shape)?,
            convert_expr(right, from, to, shape)?,
        ),
        Expr::Not { operand } => !convert_expr(operand, from, to, shape)?,
    })
}

// =============================================================================
// Evaluation
// =============================================================================

enum Evaluated<'a> {
    Record(&'a Record),
    Value(Cow<'a, Value>),
}

impl Evaluated<'_> {
    fn into_value(self) -> Value {
        match self {
            Evaluated::Record(record) => Value::Object(record.clone()),
            Evaluated::Value(value) => value.into_owned(),
        }
    }

    fn as_value(&self) -> Cow<'_, Value> {
        match self {
            Evaluated::Record(record) => Cow::Owned(Value::Object((*record).clone())),
            Evaluated::Value(value) => Cow::Borrowed(value.as_ref()),
        }
    }
}

fn eval<'a>(expr: &'a Expr, bound: &Parameter, root: &'a Record) -> Result<Evaluated<'a>, EvalError> {
    Ok(match expr {
        Expr::Parameter { parameter } if parameter.id == bound.id => Evaluated::Record(root),
        Expr::Parameter { parameter } => {
            return Err(EvalError::UnboundParameter(parameter.name.clone()))
        }
        Expr::Member { target, member, .. } => match eval(target, bound, root)? {
            Evaluated::Record(record) => {
                Evaluated::Value(Cow::Borrowed(record.get(member).unwrap_or(&NULL)))
            }
            Evaluated::Value(Cow::Borrowed(value)) => match value {
                Value::Object(map) => Evaluated::Value(Cow::Borrowed(map.get(member).unwrap_or(&NULL))),
                Value::Null => Evaluated::Value(Cow::Borrowed(&NULL)),
                _ => return Err(EvalError::NotAnObject(member.clone())),
            },
            Evaluated::Value(Cow::Owned(value)) => match value {
                Value::Object(mut map) => {
                    Evaluated::Value(Cow::Owned(map.remove(member).unwrap_or(Value::Null)))
                }
                Value::Null => Evaluated::Value(Cow::Borrowed(&NULL)),
                _ => return Err(EvalError::NotAnObject(member.clone())),
            },
        },
        Expr::Literal { value } => Evaluated::Value(Cow::Borrowed(value)),
        Expr::Compare { op, left, right } => {
            let left = eval(left, bound, root)?;
            let right = eval(right, bound, root)?;
            let result = compare(*op, &left.as_value(), &right.as_value());
            Evaluated::Value(Cow::Owned(Value::Bool(result)))
        }
        Expr::Logical { op, left, right } => {
            let left = truth(&eval(left, bound, root)?.into_value())?;
            let result = match (op, left) {
                (LogicalOp::And, false) => false,
                (LogicalOp::Or, true) => true,
                _ => truth(&eval(right, bound, root)?.into_value())?,
            };
            Evaluated::Value(Cow::Owned(Value::Bool(result)))
        }
        Expr::Not { operand } => {
            let value = truth(&eval(operand, bound, root)?.into_value())?;
            Evaluated::Value(Cow::Owned(Value::Bool(!value)))
        }
    })
}

fn truth(value: &Value) -> Result<bool, EvalError> {
    value
        .as_bool()
        .ok_or_else(|| EvalError::NotBoolean(value.to_string()))
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        CompareOp::Gt => order_values(left, right) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            order_values(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => order_values(left, right) == Some(Ordering::Less),
        CompareOp::Le => matches!(
            order_values(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Contains => match (left, right) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.iter().any(|item| values_equal(item, needle)),
            _ => false,
        },
        CompareOp::StartsWith => match (left, right) {
            (Value::String(text), Value::String(prefix)) => text.starts_with(prefix.as_str()),
            _ => false,
        },
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Natural ordering of two values of the same kind
pub fn order_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total ordering for sorting: natural order, nulls first, then by kind
pub fn sort_order(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    order_values(left, right).unwrap_or_else(|| rank(left).cmp(&rank(right)))
}

#[cfg(test)]
mod tests {
    use crate::demo::{Customer, Order, PriorityOrder};
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_simple_comparison() {
        let expensive = Predicate::<Order>::new(|o| o.field("total").gt(100));
        assert!(expensive.lambda().evaluate(&record(json!({"total": 150.0}))).unwrap());
        assert!(!expensive.lambda().evaluate(&record(json!({"total": 99}))).unwrap());
    }

    #[test]
    fn test_and_requires_both() {
        let expensive = Predicate::<Order>::new(|o| o.field("total").gt(100));
        let open = Predicate::<Order>::named("x", |o| o.field("status").eq("open"));
        let both = expensive.and(open);

        assert!(both.lambda().evaluate(&record(json!({"total": 150, "status": "open"}))).unwrap());
        assert!(!both.lambda().evaluate(&record(json!({"total": 150, "status": "shipped"}))).unwrap());
    }

    #[test]
    fn test_or_requires_either() {
        let expensive = Predicate::<Order>::new(|o| o.field("total").gt(100));
        let open = Predicate::<Order>::new(|o| o.field("status").eq("open"));
        let either = expensive.or(open);

        assert!(either.lambda().evaluate(&record(json!({"total": 150, "status": "shipped"}))).unwrap());
        assert!(!either.lambda().evaluate(&record(json!({"total": 5, "status": "shipped"}))).unwrap());
    }

    #[test]
    fn test_composition_rebinds_to_single_parameter() {
        let a = Predicate::<Order>::new(|o| o.field("total").gt(1));
        let b = Predicate::<Order>::new(|o| o.field("total").lt(10));
        assert_ne!(a.parameter().id(), b.parameter().id());

        let id = a.parameter().id();
        let combined = a.and(b);
        assert_eq!(combined.parameter().id(), id);

        let serialized = serde_json::to_string(combined.body()).unwrap();
        let other_ids = serialized.matches("\"id\":").count();
        let own_ids = serialized.matches(&format!("\"id\":{id}")).count();
        assert_eq!(other_ids, own_ids);
    }

    #[test]
    fn test_unbound_parameter_is_reported() {
        let a = Predicate::<Order>::new(|o| o.field("total").gt(1));
        let b = Predicate::<Order>::new(|o| o.field("total").lt(10));
        let broken = Lambda {
            parameter: a.parameter().clone(),
            body: b.body().clone(),
        };
        let err = broken.evaluate(&record(json!({"total": 5}))).unwrap_err();
        assert!(matches!(err, EvalError::UnboundParameter(_)));
    }

    #[test]
    fn test_all_and_any_of_nothing() {
        assert!(Predicate::<Order>::all(Vec::new()).is_none());
        assert!(Predicate::<Order>::any(Vec::new()).is_none());
    }

    #[test]
    fn test_nested_member_and_null_navigation() {
        let named = Predicate::<Order>::new(|o| o.field("customer").field("name").eq("Ada"));
        assert!(named
            .lambda()
            .evaluate(&record(json!({"customer": {"name": "Ada"}})))
            .unwrap());
        assert!(!named.lambda().evaluate(&record(json!({"customer": null}))).unwrap());
    }

    #[test]
    fn test_not_and_string_operators() {
        let p = Predicate::<Customer>::new(|c| !c.field("name").starts_with("A"));
        assert!(p.lambda().evaluate(&record(json!({"name": "Bob"}))).unwrap());
        let q = Predicate::<Customer>::new(|c| c.field("name").contains("do"));
        assert!(q.lambda().evaluate(&record(json!({"name": "Gordon"}))).unwrap());
    }

    #[test]
    fn test_convert_to_related_shape_evaluates_identically() {
        let expensive = Predicate::<Order>::new(|o| o.field("total").gt(100).and(o.field("status").eq("open")));
        let converted: Predicate<PriorityOrder> = expensive.convert().unwrap();
        assert_eq!(converted.parameter().shape(), "PriorityOrder");

        for (total, status) in [(150.0, "open"), (50.0, "open"), (150.0, "closed")] {
            let order = Order {
                total,
                status: status.into(),
                ..Order::default()
            };
            let priority = PriorityOrder {
                order: order.clone(),
                priority: 3,
            };
            assert_eq!(expensive.evaluate(&order).unwrap(), converted.evaluate(&priority).unwrap());
        }
    }

    #[test]
    fn test_convert_fails_when_member_missing() {
        let urgent = Predicate::<PriorityOrder>::new(|o| o.field("priority").gt(1));
        let err = urgent.convert::<Order>().unwrap_err();
        match err {
            RepoError::ShapeConversion { from, to, member } => {
                assert_eq!(from, "PriorityOrder");
                assert_eq!(to, "Order");
                assert_eq!(member, "priority");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_convert_is_all_or_nothing() {
        let mixed = Predicate::<PriorityOrder>::new(|o| {
            o.field("total").gt(1).and(o.field("priority").gt(1))
        });
        assert!(mixed.convert::<Order>().is_err());
    }

    #[test]
    fn test_conversion_records_declaring_shape() {
        let p = Predicate::<Order>::new(|o| o.field("total").gt(1));
        let converted = p.convert::<PriorityOrder>().unwrap();
        match converted.body() {
            Expr::Compare { left, .. } => match left.as_ref() {
                Expr::Member { declaring, .. } => assert_eq!(declaring, "Order"),
                other => panic!("unexpected node: {other:?}"),
            },
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let p = Predicate::<Order>::named("o", |o| o.field("total").gt(100));
        assert_eq!(p.to_string(), "o => (o.total > 100)");
    }

    #[test]
    fn test_sort_order_puts_nulls_first() {
        assert_eq!(sort_order(&Value::Null, &json!(1)), Ordering::Less);
        assert_eq!(sort_order(&json!(2), &json!(1.5)), Ordering::Greater);
        assert_eq!(sort_order(&json!("a"), &json!("b")), Ordering::Less);
    }
}
