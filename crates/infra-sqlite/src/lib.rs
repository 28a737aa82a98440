// Panelcraft Infrastructure - SQLite Adapter
// Implements: RosterStore, CredentialStore

mod connection;
mod credential_store;
mod error;
mod migration;
mod roster_store;

pub use connection::create_pool;
pub use credential_store::{SqliteCredentialStore, API_KEY_SETTING};
pub use migration::{current_version, run_migrations};
pub use roster_store::SqliteRosterStore;

// Note: sqlx::Error conversion is handled by `error::map_sqlx_error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
