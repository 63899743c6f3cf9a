pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors from the database communication layer and the identifiers fed into it
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database query failed")]
    Query {
        #[from]
        source: sqlx::Error,
    },

    #[error(
        "Invalid table name `{input}`. Expected `[schema.]name` where each part \
        matches `[a-z_][a-z0-9_]*` and is at most 63 characters long"
    )]
    InvalidTableName { input: String },
}

#[easy_ext::ext(ErrorExt)]
pub impl sqlx::Error {
    /// Checks if the database rejected the statement because of the given constraint
    fn is_constraint_violation(&self, constraint: &str) -> bool {
        let actual = self.as_database_error().and_then(|err| err.constraint());
        actual == Some(constraint)
    }
}
