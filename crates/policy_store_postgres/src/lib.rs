//! PostgreSQL implementation of the `policy_store_core` contract.
//!
//! One table holds every rule (`casbin_rule` unless configured otherwise).
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so builds
//! never need a live database.

pub mod config;
pub mod rule;
mod sql;
pub mod store;

pub use config::{StoreConfig, DEFAULT_TABLE};
pub use store::PgPolicyStore;
