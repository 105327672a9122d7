//! Storage contract for policy-engine persistence adapters.
//!
//! The enforcement engine keeps its rules in memory as a [`PolicyModel`] and
//! delegates persistence to anything implementing [`PolicyStore`]. This crate
//! owns the contract only — concrete adapters (one table in a SQL database,
//! for instance) live in sibling crates and depend on these types.

pub mod error;
pub mod filter;
pub mod model;
pub mod ports;

pub use error::{Result, StoreError};
pub use filter::PolicyFilter;
pub use model::PolicyModel;
pub use ports::PolicyStore;
