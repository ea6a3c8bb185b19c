//! Demo shop model and seed data.

mod model;
mod seed;

pub use model::{Address, Customer, Order, OrderLine, PriorityOrder};
pub use seed::{seed, seeded_store, shop_context, SHOP_CONTEXT};
