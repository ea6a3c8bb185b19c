//! Seed data and the shop context used by the CLI and tests.

use serde_json::Value;

use domain::{Entity, Record};

use super::model::{Address, Customer, Order, OrderLine};
use crate::config::ADD_OBJECT_METHOD;
use crate::infra::{BackendError, BackendResult, MemoryContext, MemoryStore};

pub const SHOP_CONTEXT: &str = "ShopContext";

/// Context exposing the shop model over `store`
pub fn shop_context(store: MemoryStore) -> MemoryContext {
    MemoryContext::builder(SHOP_CONTEXT)
        .query("Orders", Order::shape())
        .set("Customers", Customer::shape())
        .set("Addresses", Address::shape())
        .set("OrderLines", OrderLine::shape())
        .add_method("AddToOrders", Order::shape(), "Orders")
        .add_method("AddToCustomers", Customer::shape(), "Customers")
        .add_object(ADD_OBJECT_METHOD)
        .build(store)
}

/// Store with `customers` customers, each with `orders_per_customer` orders
/// of two lines.
pub fn seeded_store(customers: usize, orders_per_customer: usize) -> BackendResult<MemoryStore> {
    let store = MemoryStore::new("demo");
    seed(&store, customers, orders_per_customer)?;
    Ok(store)
}

/// Insert the sample rows into `store`
pub fn seed(store: &MemoryStore, customers: usize, orders_per_customer: usize) -> BackendResult<()> {
    for c in 1..=customers {
        let address = store.insert(
            "Addresses",
            &Address {
                street: format!("{c} Main Street"),
                city: (if c % 2 == 0 { "Shelbyville" } else { "Springfield" }).to_string(),
                ..Address::default()
            },
        )?;
        let customer = store.insert(
            "Customers",
            &Customer {
                name: format!("Customer {c}"),
                address_id: Some(id_of(&address)?),
                ..Customer::default()
            },
        )?;
        let customer_id = id_of(&customer)?;

        for o in 1..=orders_per_customer {
            let order = store.insert(
                "Orders",
                &Order {
                    status: (if o % 2 == 0 { "shipped" } else { "open" }).to_string(),
                    total: (c * 100 + o * 10) as f64,
                    customer_id: Some(customer_id),
                    ..Order::default()
                },
            )?;
            let order_id = id_of(&order)?;
            for (product, quantity) in [("widget", 2), ("gadget", 1)] {
                store.insert(
                    "OrderLines",
                    &OrderLine {
                        order_id,
                        product: product.to_string(),
                        quantity,
                        price: 5.0,
                        ..OrderLine::default()
                    },
                )?;
            }
        }
    }
    Ok(())
}

fn id_of(record: &Record) -> BackendResult<i64> {
    record
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| BackendError::Unsupported("stored row has no integer id".into()))
}
