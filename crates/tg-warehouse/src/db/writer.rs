//! Full refresh of warehouse tables.
//!
//! Each write replaces the whole contents of the target table inside a single
//! transaction, so readers see either the previous snapshot or the new one,
//! never a partially written table. Two writes into the same table must not
//! run concurrently: the callers are responsible for that.
use super::DbError;
use crate::observability::metrics::{WAREHOUSE_ROWS_WRITTEN_TOTAL, WAREHOUSE_WRITE_DURATION_SECONDS};
use crate::prelude::*;
use crate::{err, err_ctx, Result};
use sea_query::{Alias, Query, SimpleExpr};
use sqlx::PgConnection;
use sqlx_bat::prelude::*;
use sqlx_bat::{pg_catalog, ColumnSpec, SqlxQuery, TableName};

/// Postgres refuses statements with more bind parameters than this
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// A row of a warehouse table with a fixed canonical schema
pub(crate) trait WarehouseRow: Send + 'static {
    /// Columns of the table in the same order as the values returned from
    /// [`WarehouseRow::into_values`]
    const COLUMNS: &'static [ColumnSpec];

    fn into_values(self) -> Vec<SimpleExpr>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    /// There was nothing to write, so the table wasn't touched at all
    Skipped,
    /// The table didn't exist and was created
    Created { rows: usize },
    /// The table existed and its rows were replaced
    Refreshed { rows: usize },
}

impl WriteOutcome {
    pub(crate) fn rows(self) -> usize {
        match self {
            Self::Skipped => 0,
            Self::Created { rows } | Self::Refreshed { rows } => rows,
        }
    }
}

pub(crate) struct WarehouseWriter {
    db: sqlx::PgPool,
    insert_batch_size: usize,
}

impl WarehouseWriter {
    pub(crate) fn new(db: sqlx::PgPool, insert_batch_size: usize) -> Self {
        Self {
            db,
            insert_batch_size: insert_batch_size.max(1),
        }
    }

    /// Replaces all rows of the table with the given ones, creating the table
    /// if it doesn't exist. An empty list of rows is a no-op.
    pub(crate) async fn replace_all<R: WarehouseRow>(
        &self,
        table: &TableName,
        rows: Vec<R>,
    ) -> Result<WriteOutcome> {
        if rows.is_empty() {
            warn!(%table, "No rows to write, leaving the table untouched");
            return Ok(WriteOutcome::Skipped);
        }

        let total = rows.len();

        let (result, duration) = self.replace_all_imp(table, rows).with_duration().await;

        let result_label = if result.is_ok() { "ok" } else { "err" };
        metrics::histogram!(
            WAREHOUSE_WRITE_DURATION_SECONDS,
            duration,
            "table" => table.to_string(),
            "result" => result_label,
        );

        let outcome = result?;

        metrics::counter!(WAREHOUSE_ROWS_WRITTEN_TOTAL, total as u64, "table" => table.to_string());

        info!(
            %table,
            ?outcome,
            duration = tracing_duration(duration),
            "Wrote the table snapshot"
        );

        Ok(outcome)
    }

    async fn replace_all_imp<R: WarehouseRow>(
        &self,
        table: &TableName,
        rows: Vec<R>,
    ) -> Result<WriteOutcome> {
        let total = rows.len();

        // The transaction is rolled back when dropped without a commit,
        // which covers both the errors and the cancellation of this future.
        let mut tx = self.db.begin().await.map_err(err_ctx!(DbError::Connect))?;

        let created = prepare_table(&mut tx, table, R::COLUMNS).await?;

        let batch_size = insert_batch_size(self.insert_batch_size, R::COLUMNS.len());
        if batch_size < self.insert_batch_size {
            debug!(
                %table,
                configured = self.insert_batch_size,
                batch_size,
                "Lowered the insert batch size to fit into the bind parameters limit"
            );
        }

        let mut rows = rows.into_iter().peekable();

        while rows.peek().is_some() {
            let batch: Vec<R> = rows.by_ref().take(batch_size).collect();
            let batch_len = batch.len();

            let mut insert = build_insert(table, batch)?;

            insert.query().execute(&mut *tx).await.map_err(|source| {
                if source.is_constraint_violation(&sqlx_bat::primary_key_name(table)) {
                    warn!(
                        %table,
                        "The rows contain duplicate primary keys, so the whole write is aborted"
                    );
                }
                err!(DbError::Write {
                    table: table.to_string(),
                    rows: total,
                    source,
                })
            })?;

            debug!(%table, batch_len, "Inserted a batch of rows");
        }

        tx.commit().await?;

        Ok(if created {
            WriteOutcome::Created { rows: total }
        } else {
            WriteOutcome::Refreshed { rows: total }
        })
    }
}

/// Number of rows per insert statement, so that it binds no more than
/// [`MAX_BIND_PARAMS`] values
fn insert_batch_size(configured: usize, columns: usize) -> usize {
    configured.min(MAX_BIND_PARAMS / columns.max(1)).max(1)
}

/// Makes sure the table exists and is empty. Returns `true` if it was created.
async fn prepare_table(
    conn: &mut PgConnection,
    table: &TableName,
    columns: &[ColumnSpec],
) -> Result<bool> {
    if !pg_catalog::schema_exists(&mut *conn, table.schema()).await? {
        info!(schema = table.schema(), "Creating the schema");
        execute(&mut *conn, &sqlx_bat::create_schema(table.schema())).await?;
    }

    let Some(existing) = pg_catalog::table_columns(&mut *conn, table).await? else {
        info!(%table, "Creating the table");
        execute(&mut *conn, &sqlx_bat::create_table(table, columns)).await?;
        return Ok(true);
    };

    let (extra, required_extra): (Vec<_>, Vec<_>) = existing
        .iter()
        .filter(|found| !columns.iter().any(|column| column.name == found.name))
        .partition(|found| found.optional);

    if !required_extra.is_empty() {
        return Err(err!(DbError::RequiredExtraColumns {
            table: table.to_string(),
            columns: required_extra.into_iter().map(|column| column.name.clone()).collect::<Vec<_>>(),
        }));
    }

    if !extra.is_empty() {
        let extra = extra.iter().map(|column| &column.name).collect::<Vec<_>>();
        warn!(%table, ?extra, "The table has non-canonical columns, they will get their defaults or nulls");
    }

    execute(&mut *conn, &sqlx_bat::truncate_table(table)).await?;

    let missing = columns
        .iter()
        .filter(|column| !existing.iter().any(|found| found.name == column.name));

    for &column in missing {
        warn!(%table, column = column.name, "Adding a column missing in the existing table");
        execute(&mut *conn, &sqlx_bat::add_column(table, column)).await?;
    }

    Ok(false)
}

async fn execute(conn: &mut PgConnection, sql: &str) -> Result {
    sqlx::query(sql).execute(conn).await?;
    Ok(())
}

fn build_insert<R: WarehouseRow>(table: &TableName, rows: Vec<R>) -> Result<SqlxQuery> {
    let mut insert = Query::insert();

    insert
        .into_table(table)
        .columns(R::COLUMNS.iter().map(|column| Alias::new(column.name)));

    for row in rows {
        let values = row.into_values();
        debug_assert_eq!(values.len(), R::COLUMNS.len());

        insert
            .values(values)
            .map_err(err_ctx!(DbError::BuildInsert {
                table: table.to_string()
            }))?;
    }

    Ok(insert.into_sqlx())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RawMessageRecord;
    use crate::ErrorKind;
    use assert_matches::assert_matches;
    use test_bat::{pg_pool_from_env, unique_table_name};

    fn message(channel: &str, id: i64) -> RawMessageRecord {
        RawMessageRecord {
            message_id: id,
            channel_name: channel.to_owned(),
            message_text: Some(format!("message {id}")),
            views: id * 10,
            ..RawMessageRecord::default()
        }
    }

    async fn count_rows(db: &sqlx::PgPool, table: &TableName) -> i64 {
        sqlx::query_scalar(&format!("select count(*) from {table}"))
            .fetch_one(db)
            .await
            .unwrap()
    }

    async fn drop_table(db: &sqlx::PgPool, table: &TableName) {
        sqlx::query(&format!("drop table if exists {table}"))
            .execute(db)
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn empty_rows_never_touch_the_database() {
        // Nothing listens on this port, so any query would fail
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/nothing")
            .unwrap();

        let writer = WarehouseWriter::new(db, 10);
        let table: TableName = "raw.telegram_messages".parse().unwrap();

        let outcome = writer
            .replace_all(&table, Vec::<RawMessageRecord>::new())
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Skipped);
    }

    #[test_log::test(tokio::test)]
    async fn reloading_the_same_snapshot_keeps_the_row_count() {
        let Some(db) = pg_pool_from_env().await else {
            return;
        };
        let table: TableName = unique_table_name("reload").parse().unwrap();
        let writer = WarehouseWriter::new(db.clone(), 2);

        let rows = || vec![message("a", 1), message("a", 2), message("b", 1)];

        let first = writer.replace_all(&table, rows()).await.unwrap();
        assert_eq!(first, WriteOutcome::Created { rows: 3 });
        assert_eq!(count_rows(&db, &table).await, 3);

        let second = writer.replace_all(&table, rows()).await.unwrap();
        assert_eq!(second, WriteOutcome::Refreshed { rows: 3 });
        assert_eq!(count_rows(&db, &table).await, 3);

        drop_table(&db, &table).await;
    }

    #[test_log::test(tokio::test)]
    async fn failed_write_keeps_the_previous_snapshot() {
        let Some(db) = pg_pool_from_env().await else {
            return;
        };
        let table: TableName = unique_table_name("atomic").parse().unwrap();
        let writer = WarehouseWriter::new(db.clone(), 1);

        writer
            .replace_all(&table, vec![message("a", 1), message("a", 2)])
            .await
            .unwrap();

        // The duplicate key fails the third batch, after the table was
        // already truncated and two batches were inserted
        let err = writer
            .replace_all(
                &table,
                vec![message("b", 1), message("b", 2), message("b", 1)],
            )
            .await
            .unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::Db {
                source: DbError::Write { rows: 3, .. }
            }
        );

        let channels: Vec<String> =
            sqlx::query_scalar(&format!("select channel_name from {table} order by message_id"))
                .fetch_all(&db)
                .await
                .unwrap();

        assert_eq!(channels, ["a", "a"]);

        drop_table(&db, &table).await;
    }

    #[test_log::test(tokio::test)]
    async fn adds_canonical_columns_missing_in_existing_table() {
        let Some(db) = pg_pool_from_env().await else {
            return;
        };
        let table: TableName = unique_table_name("columns").parse().unwrap();

        sqlx::query(&format!(
            "create table {table} (message_id bigint, channel_name text, stale text)"
        ))
        .execute(&db)
        .await
        .unwrap();

        let writer = WarehouseWriter::new(db.clone(), 100);
        let outcome = writer
            .replace_all(&table, vec![message("a", 1)])
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Refreshed { rows: 1 });

        let views: i64 = sqlx::query_scalar(&format!("select views from {table}"))
            .fetch_one(&db)
            .await
            .unwrap();

        assert_eq!(views, 10);

        drop_table(&db, &table).await;
    }

    #[test]
    fn insert_batch_fits_into_bind_params_limit() {
        assert_eq!(insert_batch_size(1000, 9), 1000);
        assert_eq!(insert_batch_size(10_000, 9), 7281);
        assert_eq!(insert_batch_size(100_000, 5), 13107);
        assert_eq!(insert_batch_size(0, 9), 1);

        let rows = insert_batch_size(usize::MAX, RawMessageRecord::COLUMNS.len());
        assert!(rows * RawMessageRecord::COLUMNS.len() <= usize::from(u16::MAX));
    }

    #[test_log::test(tokio::test)]
    async fn writes_more_rows_than_fit_into_one_statement() {
        let Some(db) = pg_pool_from_env().await else {
            return;
        };
        let table: TableName = unique_table_name("large_batch").parse().unwrap();
        let writer = WarehouseWriter::new(db.clone(), 10_000);

        let rows: Vec<_> = (0..8000).map(|id| message("a", id)).collect();

        let outcome = writer.replace_all(&table, rows).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Created { rows: 8000 });
        assert_eq!(count_rows(&db, &table).await, 8000);

        drop_table(&db, &table).await;
    }

    #[test_log::test(tokio::test)]
    async fn required_non_canonical_column_fails_before_truncation() {
        let Some(db) = pg_pool_from_env().await else {
            return;
        };
        let table: TableName = unique_table_name("required_extra").parse().unwrap();

        sqlx::query(&format!(
            "create table {table} (
                message_id bigint,
                channel_name text,
                note text not null,
                tag text not null default 'none'
            )"
        ))
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(&format!(
            "insert into {table} (message_id, channel_name, note) values (1, 'a', 'keep')"
        ))
        .execute(&db)
        .await
        .unwrap();

        let writer = WarehouseWriter::new(db.clone(), 100);
        let err = writer
            .replace_all(&table, vec![message("b", 2)])
            .await
            .unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::Db {
                source: DbError::RequiredExtraColumns { columns, .. }
            } if columns == &["note"]
        );

        assert_eq!(count_rows(&db, &table).await, 1);

        drop_table(&db, &table).await;
    }
}
