//! # pinhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement `HouseRepository` and `SwitchRecorder` from `pinhub-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `pinhub-app` (for port traits) and `pinhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod house_store;
pub mod pool;

pub use error::StorageError;
pub use house_store::SqliteHouseStore;
pub use pool::{Config, Database};
