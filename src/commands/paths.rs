//! Paths command - Eager-load path resolution for the sample model.

use domain::{Entity, EntityShape};

use crate::cli::args::PathsArgs;
use crate::demo::{Customer, Order, PriorityOrder};
use crate::errors::{RepoError, RepoResult};
use crate::query::path;

/// Execute the paths command
pub fn execute(args: PathsArgs) -> RepoResult<()> {
    let roots: [&'static EntityShape; 3] = [Order::shape(), Customer::shape(), PriorityOrder::shape()];
    let members = [
        (Order::shape(), "customer"),
        (Order::shape(), "lines"),
        (Customer::shape(), "address"),
        (Customer::shape(), "orders"),
    ]
    .into_iter()
    .map(|(shape, name)| Ok((format!("{}.{}", shape.name(), name), shape.member(name)?)))
    .collect::<RepoResult<Vec<_>>>()?;

    let selected: Vec<_> = roots
        .into_iter()
        .filter(|root| args.root.as_deref().map_or(true, |name| name == root.name()))
        .collect();
    if selected.is_empty() {
        return Err(RepoError::argument(format!(
            "unknown root shape '{}'",
            args.root.unwrap_or_default()
        )));
    }

    for root in selected {
        println!("{}", root.name());
        for (label, member) in &members {
            println!("  {:<16} -> {}", label, path::resolve(root, member));
        }
    }
    Ok(())
}
