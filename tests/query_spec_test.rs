//! Query specification tests: copying across shapes and running the result.

use domain::{Entity, Tracked};

use repokit::config::RepositoryConfig;
use repokit::demo::{seeded_store, shop_context, Customer, Order, PriorityOrder};
use repokit::errors::RepoError;
use repokit::infra::{ObjectContextRepository, ReadRepository, WriteRepository};
use repokit::query::{Lambda, Predicate, QuerySpecification};
use repokit::types::{Direction, Limit};

fn open_orders_over(amount: f64) -> QuerySpecification<Order> {
    QuerySpecification::new()
        .filter(Predicate::new(move |o| o.field("total").gt(amount)))
        .filter(Predicate::new(|o| o.field("status").eq("open")))
        .order_by_descending("total")
        .limit(0, 5)
}

#[test]
fn test_copied_specification_runs_against_derived_shape() {
    let store = seeded_store(2, 2).unwrap();
    let mut repo =
        ObjectContextRepository::new(Box::new(shop_context(store)), RepositoryConfig::default());

    for (total, priority) in [(500.0, 1), (20.0, 2)] {
        let order = Tracked::new(PriorityOrder {
            order: Order {
                status: "open".into(),
                total,
                ..Order::default()
            },
            priority,
        });
        repo.add(&order).unwrap();
    }
    repo.save().unwrap();

    let spec = open_orders_over(100.0);
    let copied: QuerySpecification<PriorityOrder> = spec.retarget().unwrap();
    assert_eq!(copied.get_limit(), Limit::new(0, 5));
    assert_eq!(copied.direction(), Direction::Desc);
    assert_eq!(copied.predicates().len(), 2);

    let priority = repo.get(&copied).unwrap();
    assert_eq!(priority.len(), 1);
    assert_eq!(priority[0].priority, 1);

    // the source specification still sees every open order above the threshold
    let all = repo.get(&spec).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].total, 500.0);
}

#[test]
fn test_copy_to_unrelated_shape_fails_without_partial_copy() {
    let spec = open_orders_over(100.0);
    let err = spec.retarget::<Customer>().unwrap_err();
    match err {
        RepoError::ShapeConversion { from, to, member } => {
            assert_eq!(from, "Order");
            assert_eq!(to, "Customer");
            assert_eq!(member, "total");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_copy_appends_to_existing_destination() {
    let spec = open_orders_over(100.0).load_with("lines");
    let dest = QuerySpecification::<PriorityOrder>::new()
        .filter(Predicate::new(|o| o.field("priority").ge(2)))
        .load_with("customer");

    let copied = spec.copy_to(dest).unwrap();
    assert_eq!(copied.predicates().len(), 3);
    assert_eq!(copied.preloaded_members(), vec!["customer", "lines"]);
}

#[test]
fn test_member_preload_resolves_against_copy_target() {
    let spec = QuerySpecification::<Order>::new()
        .load_with_member(Customer::shape().member("address").unwrap());
    assert_eq!(spec.preloaded_members(), vec!["customer.address"]);

    let copied = spec.retarget::<Customer>().unwrap();
    assert_eq!(copied.preloaded_members(), vec!["address"]);
}

#[test]
fn test_combined_filter_survives_serialization() {
    let spec = open_orders_over(150.0);
    let lambda = spec.combined_predicate().unwrap().into_lambda();

    let json = serde_json::to_string(&lambda).unwrap();
    let restored: Lambda = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, lambda);

    let order = Order {
        status: "open".into(),
        total: 200.0,
        ..Order::default()
    };
    assert!(restored.evaluate(&order.to_record().unwrap()).unwrap());
}
