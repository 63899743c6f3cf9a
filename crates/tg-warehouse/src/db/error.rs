/// Most likely unrecoverable errors from database communication layer
#[derive(Debug, thiserror::Error)]
pub(crate) enum DbError {
    #[error("Failed to connect to the database")]
    Connect { source: sqlx::Error },

    #[error("Failed to build an insert statement for table {table}")]
    BuildInsert {
        table: String,
        source: sea_query::error::Error,
    },

    #[error("Failed to write {rows} rows into table {table}, the transaction was rolled back")]
    Write {
        table: String,
        rows: usize,
        source: sqlx::Error,
    },

    #[error(
        "Table {table} has columns that can't be left empty on insert, \
        drop them or give them a default: {}",
        columns.join(", ")
    )]
    RequiredExtraColumns { table: String, columns: Vec<String> },

    #[error("Database query failed")]
    Query {
        #[from]
        source: sqlx::Error,
    },

    #[error(transparent)]
    SqlxBat {
        #[from]
        source: sqlx_bat::Error,
    },
}
