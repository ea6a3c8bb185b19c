//! Sample shop model: customers with addresses, orders and order lines.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use domain::{Entity, EntityShape, Generated, ScalarType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub id: i64,
    pub street: String,
    pub city: String,
}

impl Entity for Address {
    fn shape() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Address>("Address")
                .identity("id")
                .scalar("street", ScalarType::Text)
                .scalar("city", ScalarType::Text)
                .build()
        });
        &SHAPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub address_id: Option<i64>,
    pub address: Option<Address>,
    pub orders: Vec<Order>,
}

impl Entity for Customer {
    fn shape() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Customer>("Customer")
                .identity("id")
                .scalar("name", ScalarType::Text)
                .scalar("address_id", ScalarType::Integer)
                .reference("address", Address::shape, "address_id")
                .collection("orders", Order::shape, "customer_id")
                .build()
        });
        &SHAPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub id: i64,
    pub status: String,
    pub total: f64,
    pub customer_id: Option<i64>,
    pub customer: Option<Box<Customer>>,
    pub lines: Vec<OrderLine>,
    /// Stamped by the store on every commit
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Order {
    fn shape() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<Order>("Order")
                .identity("id")
                .scalar("status", ScalarType::Text)
                .scalar("total", ScalarType::Float)
                .scalar("customer_id", ScalarType::Integer)
                .reference("customer", Customer::shape, "customer_id")
                .collection("lines", OrderLine::shape, "order_id")
                .computed("updated_at", ScalarType::Timestamp, Generated::Timestamp)
                .build()
        });
        &SHAPE
    }
}

/// An order with a handling priority, stored alongside plain orders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityOrder {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub priority: i64,
}

impl Entity for PriorityOrder {
    fn shape() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<PriorityOrder>("PriorityOrder")
                .extends(Order::shape)
                .scalar("priority", ScalarType::Integer)
                .build()
        });
        &SHAPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product: String,
    pub quantity: i64,
    pub price: f64,
}

impl Entity for OrderLine {
    fn shape() -> &'static EntityShape {
        static SHAPE: Lazy<EntityShape> = Lazy::new(|| {
            EntityShape::builder::<OrderLine>("OrderLine")
                .identity("id")
                .scalar("order_id", ScalarType::Integer)
                .scalar("product", ScalarType::Text)
                .scalar("quantity", ScalarType::Integer)
                .scalar("price", ScalarType::Float)
                .build()
        });
        &SHAPE
    }
}
