use easy_ext::ext;
use sqlx::postgres::PgArguments;
use sqlx::{IntoArguments, Postgres};

pub type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Builds a [`Vec`] of [`sea_query::SimpleExpr`] out of values that are
/// convertible into them, e.g. to pass a single row to an insert statement.
#[macro_export]
macro_rules! simple_expr_vec {
    ($($value:expr),* $(,)?) => {
        vec![
            $($crate::imp::sea_query::SimpleExpr::from($value),)*
        ]
    };
}

/// Statement rendered by [`sea_query`] together with its bound values.
///
/// [`sqlx`] queries only borrow the SQL string, so this owns it for them.
/// There are no [`sea_query`] types inside, which makes it fine to keep
/// across `.await` points, unlike the statement builders themselves.
pub struct SqlxQuery {
    sql: String,
    args: Option<PgArguments>,
}

#[ext(SqlxBinderExt)]
pub impl<T: sea_query_binder::SqlxBinder> T {
    fn into_sqlx(&self) -> SqlxQuery {
        let (sql, values) = self.build_sqlx(sea_query::PostgresQueryBuilder);
        let args = <_ as IntoArguments<'_, Postgres>>::into_arguments(values);
        SqlxQuery {
            sql,
            args: Some(args),
        }
    }
}

impl SqlxQuery {
    /// Makes a [`PgQuery`] that borrows the SQL string.
    ///
    /// # Panics
    ///
    /// The arguments are moved into the first query made, so calling this
    /// twice on the same [`SqlxQuery`] panics.
    pub fn query(&mut self) -> PgQuery<'_> {
        let args = self
            .args
            .take()
            .expect("BUG: it is allowed to build sqlx query only once");

        sqlx::query_with(&self.sql, args)
    }
}
