//! Database, queries, and backup functionality

pub mod actions;
pub mod backup;
pub mod db;
pub mod messages;
pub mod migrations;
pub mod orders;
pub mod products;
pub mod promo;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use db::{create_pool, get_connection, Client, DbConnection, DbPool};
pub use promo::{NewPromo, PromoStoreError};
