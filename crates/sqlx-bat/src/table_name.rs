use crate::{Error, Result};
use sea_query::{Alias, IntoTableRef, TableRef};
use std::fmt;
use std::str::FromStr;

const DEFAULT_SCHEMA: &str = "public";

/// Schema-qualified name of a table. Both parts are validated to be plain
/// lowercase identifiers, so they may be safely interpolated into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct TableName {
    schema: String,
    name: String,
}

impl TableName {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn is_valid_ident(ident: &str) -> bool {
    // Postgres truncates identifiers longer than 63 bytes
    ident.len() <= 63 && lazy_regex::regex_is_match!(r"^[a-z_][a-z0-9_]*$", ident)
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let (schema, name) = input.split_once('.').unwrap_or((DEFAULT_SCHEMA, input));

        if !is_valid_ident(schema) || !is_valid_ident(name) {
            return Err(Error::InvalidTableName {
                input: input.to_owned(),
            });
        }

        Ok(Self {
            schema: schema.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl TryFrom<String> for TableName {
    type Error = Error;

    fn try_from(input: String) -> Result<Self> {
        input.parse()
    }
}

/// Formats the name as a quoted SQL identifier, e.g. `"raw"."messages"`
impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\".\"{}\"", self.schema, self.name)
    }
}

impl IntoTableRef for TableName {
    fn into_table_ref(self) -> TableRef {
        (Alias::new(self.schema), Alias::new(self.name)).into_table_ref()
    }
}

impl IntoTableRef for &TableName {
    fn into_table_ref(self) -> TableRef {
        self.clone().into_table_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn parses_qualified_and_bare_names() {
        let qualified: TableName = "raw.telegram_messages".parse().unwrap();
        assert_eq!(qualified.schema(), "raw");
        assert_eq!(qualified.name(), "telegram_messages");

        let bare: TableName = "telegram_messages".parse().unwrap();
        assert_eq!(bare.schema(), "public");
        assert_eq!(bare.to_string(), r#""public"."telegram_messages""#);
    }

    #[test]
    fn rejects_names_unsafe_for_interpolation() {
        for input in [
            "",
            "raw.",
            ".messages",
            "Raw.messages",
            "raw.messages; drop table users",
            "raw.\"messages\"",
            "a.b.c",
            "1messages",
        ] {
            assert!(input.parse::<TableName>().is_err(), "{input}");
        }

        let err = "raw.Messages".parse::<TableName>().unwrap_err();
        expect![[r#"Invalid table name `raw.Messages`. Expected `[schema.]name` where each part matches `[a-z_][a-z0-9_]*` and is at most 63 characters long"#]]
            .assert_eq(&err.to_string());
    }
}
