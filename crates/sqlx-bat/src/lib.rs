mod ddl;
mod error;
mod sea_query_ext;
mod table_name;

pub mod pg_catalog;

pub use ddl::*;
pub use error::*;
pub use sea_query_ext::*;
pub use table_name::*;

pub mod prelude {
    pub use crate::{ErrorExt as _, SqlxBinderExt as _};
}

#[doc(hidden)]
pub mod imp {
    pub use sea_query;
}
