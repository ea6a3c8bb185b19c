//! Demo command - Sample queries and a save against the in-process backend.

use domain::Tracked;

use crate::cli::args::DemoArgs;
use crate::config::RepositoryConfig;
use crate::demo::{seed, shop_context, Order};
use crate::errors::RepoResult;
use crate::infra::{MemoryStore, ReadRepository, RepositoryAdapter, WriteRepository};
use crate::query::{Predicate, QuerySpecification};
use crate::types::TrackingPolicy;

/// Execute the demo command
pub fn execute(args: DemoArgs, config: RepositoryConfig) -> RepoResult<()> {
    let store = MemoryStore::open(config.connection_string())?;
    seed(&store, args.customers, args.orders)?;
    tracing::info!(
        store = store.name(),
        customers = args.customers,
        orders = store.len("Orders"),
        "store seeded"
    );

    let config = if args.no_tracking {
        let tracking = config.tracking | TrackingPolicy::NO_TRACKING;
        config.with_tracking(tracking)
    } else {
        config
    };
    let mut repo = RepositoryAdapter::object_context(Box::new(shop_context(store)), config);

    let min_total = args.min_total;
    let spec = QuerySpecification::<Order>::new()
        .filter(Predicate::named("order", move |o| o.field("total").gt(min_total)))
        .load_with_property("customer")?
        .order_by_descending("total")
        .limit(0, args.take);

    println!("filter: {}", spec.combined_predicate().map(|p| p.to_string()).unwrap_or_default());
    println!("matching orders: {}", repo.count(&spec)?);
    for order in repo.get(&spec)? {
        let customer = order
            .customer
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        println!("  #{:<4} {:>8.2}  {:<8} {}", order.id, order.total, order.status, customer);
    }

    let order = Tracked::new(Order {
        status: "open".to_string(),
        total: 42.0,
        customer_id: Some(1),
        ..repo.create::<Order>()?
    });
    repo.add(&order)?;
    repo.save()?;
    order.read(|o| {
        println!(
            "saved order #{} (updated at {})",
            o.id,
            o.updated_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        )
    });

    repo.close()
}
