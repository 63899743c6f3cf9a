//! Introspection of the database schema via `information_schema`.
use crate::{Result, TableName};
use sqlx::PgConnection;

pub async fn schema_exists(conn: &mut PgConnection, schema: &str) -> Result<bool> {
    let exists = sqlx::query_scalar(
        "select exists (
            select 1 from information_schema.schemata
            where schema_name = $1
        )",
    )
    .bind(schema)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TableColumn {
    pub name: String,

    /// `true` if an insert may omit the column: it is nullable, has a
    /// default value, or is an identity or generated column
    pub optional: bool,
}

/// Returns the columns of the table in their ordinal order, or [`None`]
/// if there is no such table.
pub async fn table_columns(
    conn: &mut PgConnection,
    table: &TableName,
) -> Result<Option<Vec<TableColumn>>> {
    let exists: bool = sqlx::query_scalar(
        "select exists (
            select 1 from information_schema.tables
            where table_schema = $1 and table_name = $2
        )",
    )
    .bind(table.schema())
    .bind(table.name())
    .fetch_one(&mut *conn)
    .await?;

    if !exists {
        return Ok(None);
    }

    let columns = sqlx::query_as(
        "select
            column_name::text as name,
            (
                is_nullable = 'YES'
                or column_default is not null
                or is_identity = 'YES'
                or is_generated <> 'NEVER'
            ) as optional
        from information_schema.columns
        where table_schema = $1 and table_name = $2
        order by ordinal_position",
    )
    .bind(table.schema())
    .bind(table.name())
    .fetch_all(conn)
    .await?;

    Ok(Some(columns))
}
