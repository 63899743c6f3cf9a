//! Schema statements derived from a static description of table columns.
use crate::TableName;
use sea_query::{Alias, ColumnDef, Index, PostgresQueryBuilder, SchemaStatementBuilder, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Text,
    TimestampTz,
}

/// Static description of a single table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnSpec {
    pub const fn nullable(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            primary_key: false,
        }
    }

    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::nullable(name, ty)
        }
    }

    /// Makes the column a part of the table's (possibly composite) primary key
    pub const fn primary_key(self) -> Self {
        Self {
            nullable: false,
            primary_key: true,
            ..self
        }
    }

    fn to_column_def(self) -> ColumnDef {
        let mut def = ColumnDef::new(Alias::new(self.name));
        match self.ty {
            ColumnType::BigInt => def.big_integer(),
            ColumnType::Double => def.double(),
            ColumnType::Boolean => def.boolean(),
            ColumnType::Text => def.text(),
            ColumnType::TimestampTz => def.timestamp_with_time_zone(),
        };
        if self.nullable {
            def.null();
        } else {
            def.not_null();
        }
        def
    }
}

/// Name of the primary key constraint generated by [`create_table`]
pub fn primary_key_name(table: &TableName) -> String {
    format!("{}_pk", table.name())
}

pub fn create_schema(schema: &str) -> String {
    format!("create schema if not exists \"{schema}\"")
}

pub fn create_table(table: &TableName, columns: &[ColumnSpec]) -> String {
    let mut stmt = Table::create();
    stmt.table(table).if_not_exists();

    for column in columns {
        stmt.col(&mut column.to_column_def());
    }

    let mut primary_key = columns.iter().filter(|column| column.primary_key).peekable();

    if primary_key.peek().is_some() {
        let mut index = Index::create();
        index.name(primary_key_name(table));
        for column in primary_key {
            index.col(Alias::new(column.name));
        }
        stmt.primary_key(&mut index);
    }

    stmt.to_string(PostgresQueryBuilder)
}

/// The column is added without any data in the table, because a non-nullable
/// column can't be added to a table with rows unless it has a default.
pub fn add_column(table: &TableName, column: ColumnSpec) -> String {
    Table::alter()
        .table(table)
        .add_column_if_not_exists(&mut column.to_column_def())
        .to_string(PostgresQueryBuilder)
}

/// Removes all rows from the table and resets the sequences owned by its columns
pub fn truncate_table(table: &TableName) -> String {
    format!("truncate table {table} restart identity")
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    const COLUMNS: &[ColumnSpec] = &[
        ColumnSpec::required("channel_name", ColumnType::Text).primary_key(),
        ColumnSpec::required("message_id", ColumnType::BigInt).primary_key(),
        ColumnSpec::nullable("message_text", ColumnType::Text),
        ColumnSpec::required("views", ColumnType::BigInt),
    ];

    #[test]
    fn primary_key_columns_are_not_null() {
        assert!(COLUMNS.iter().filter(|c| c.primary_key).all(|c| !c.nullable));
        assert!(COLUMNS[2].nullable);
        assert!(!COLUMNS[3].nullable);
    }

    #[test]
    fn create_table_declares_composite_primary_key() {
        let table: TableName = "raw.messages".parse().unwrap();
        let sql = create_table(&table, COLUMNS);

        assert!(sql.starts_with(r#"CREATE TABLE IF NOT EXISTS "raw"."messages""#), "{sql}");
        assert!(sql.contains(r#""messages_pk""#), "{sql}");
        assert!(sql.contains(r#"PRIMARY KEY ("channel_name", "message_id")"#), "{sql}");
        assert!(sql.contains(r#""views" bigint NOT NULL"#), "{sql}");
    }

    #[test]
    fn truncate_resets_identity() {
        let table: TableName = "raw.messages".parse().unwrap();
        expect![[r#"truncate table "raw"."messages" restart identity"#]]
            .assert_eq(&truncate_table(&table));
    }
}
