//! Loads scraped Telegram channel data and image detections into a Postgres
//! warehouse, and runs canned read-only reports over it.
mod cmd;
mod config;
mod db;
mod detection;
mod error;
mod ingest;
mod observability;
mod pipeline;
mod report;

pub mod util;

pub use crate::error::*;
pub use cmd::Cmd;
pub use config::*;
pub use observability::*;

#[allow(unused_imports)]
mod prelude {
    pub(crate) use crate::error::prelude::*;
    pub(crate) use crate::observability::logging::prelude::*;
    pub(crate) use crate::util::prelude::*;
}

/// Execute the given command against the warehouse
pub async fn run(config: Config, cmd: Cmd) -> Result {
    let db = db::init(&config.db);
    cmd.run(cmd::Context { config, db }).await
}
