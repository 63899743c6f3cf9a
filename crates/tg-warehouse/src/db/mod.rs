mod config;
mod error;
mod writer;

use sqlx::postgres::PgPoolOptions;

pub(crate) use config::*;
pub(crate) use error::*;
pub(crate) use writer::*;

/// Creates a connection pool. No connection is established until the first
/// query, so the commands that end up having nothing to write never touch
/// the database.
pub(crate) fn init(cfg: &Config) -> sqlx::PgPool {
    tracing::debug!(config = ?cfg, "Initializing the database connection pool");

    PgPoolOptions::new()
        .max_connections(cfg.pool_size)
        .connect_lazy_with(cfg.connect_options())
}
