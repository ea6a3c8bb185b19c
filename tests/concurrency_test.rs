//! Repositories and process-wide lookups used from several threads.

use std::thread;

use domain::{Entity, Tracked};

use repokit::config::RepositoryConfig;
use repokit::demo::{seeded_store, shop_context, Customer, Order, OrderLine, PriorityOrder};
use repokit::infra::{entity_set, ObjectContextRepository, ReadRepository, WriteRepository};
use repokit::query::path;
use repokit::query::{Predicate, QuerySpecification};

#[test]
fn test_cloned_repository_runs_on_another_thread() {
    let store = seeded_store(3, 2).unwrap();
    let mut repo =
        ObjectContextRepository::new(Box::new(shop_context(store.clone())), RepositoryConfig::default());
    let clone = repo.try_clone().unwrap();

    let worker = thread::spawn(move || {
        let mut clone = clone;
        let spec = QuerySpecification::<Order>::new()
            .filter(Predicate::new(|o| o.field("total").gt(0)))
            .load_with("customer");
        let orders = clone.get(&spec).unwrap();

        let added = Tracked::new(Order {
            status: "open".into(),
            total: 7.0,
            customer_id: Some(1),
            ..Order::default()
        });
        clone.add(&added).unwrap();
        clone.save().unwrap();
        (orders.len(), added.get().id)
    });

    let (seen, added_id) = worker.join().unwrap();
    assert_eq!(seen, 6);
    assert!(added_id > 0);
    assert_eq!(repo.count(&QuerySpecification::<Order>::new()).unwrap(), 7);
}

#[test]
fn test_concurrent_path_resolution_agrees() {
    let address = Customer::shape().member("address").unwrap();
    let product = OrderLine::shape().member("product").unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let address = address.clone();
            let product = product.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|_| {
                        (
                            path::resolve(Order::shape(), &address),
                            path::resolve(Customer::shape(), &product),
                        )
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for worker in workers {
        for (from_order, from_customer) in worker.join().unwrap() {
            assert_eq!(from_order, "customer.address");
            assert_eq!(from_customer, "orders.lines.product");
        }
    }
    assert_eq!(
        path::resolve(Order::shape(), &address),
        path::resolve_uncached(Order::shape(), &address)
    );
}

#[test]
fn test_concurrent_entity_set_resolution_agrees() {
    let store = seeded_store(1, 1).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let context = shop_context(store);
                (0..50)
                    .map(|_| {
                        let derived = entity_set::resolve(&context, PriorityOrder::shape()).unwrap();
                        let customers = entity_set::resolve(&context, Customer::shape()).unwrap();
                        (derived.name, customers.name)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for worker in workers {
        for (derived, customers) in worker.join().unwrap() {
            assert_eq!(derived, "Orders");
            assert_eq!(customers, "Customers");
        }
    }
}
