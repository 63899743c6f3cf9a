use std::time::{SystemTime, UNIX_EPOCH};

/// Environment variable with the URL of a disposable Postgres database.
/// Tests that need a real database are skipped when it isn't set.
pub const TEST_DATABASE_URL: &str = "TEST_DATABASE_URL";

/// Connects to the database from [`TEST_DATABASE_URL`]. Returns [`None`] and
/// prints a notice if the variable isn't set, so the calling test may return early.
pub async fn pg_pool_from_env() -> Option<sqlx::PgPool> {
    let Ok(url) = std::env::var(TEST_DATABASE_URL) else {
        eprintln!("{TEST_DATABASE_URL} is not set, skipping the test that requires Postgres");
        return None;
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap_or_else(|err| panic!("Failed to connect to {TEST_DATABASE_URL}: {err}"));

    Some(pool)
}

/// Generates a table name that doesn't collide between concurrently running tests
pub fn unique_table_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();

    format!("test_{prefix}_{}_{nanos}", std::process::id())
}
