//! The catalog store (spec §3): a transactional mapping for services,
//! components, zones, nodes, DNSSEC keys, distribution records,
//! confirmations, and service transactions, backed by SQLite via `sqlx`.

pub mod models;
pub mod store;

pub use models::*;
