//! Persistence layer for the meal check-in backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The PostgreSQL-backed ledger store

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::PgLedgerStore;
