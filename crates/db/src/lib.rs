//! Database layer with `SeaORM` entities and the Postgres ledger store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`SeaLedgerStore`], the store traits of `vaultline-core` over Postgres
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{SeaLedgerStore, SeaUnitOfWork};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
