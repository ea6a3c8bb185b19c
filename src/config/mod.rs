//! Repository configuration module
//!
//! Handles environment variables and repository-wide constants.

mod constants;
mod settings;

pub use constants::*;
pub use settings::RepositoryConfig;
