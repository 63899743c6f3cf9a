use crate::prelude::*;
use crate::{db, pipeline};
use serde::de::DeserializeOwned;

/// Configuration of the whole application. It is loaded from the environment
/// once at startup and then passed down explicitly.
pub struct Config {
    pub(crate) db: db::Config,
    pub(crate) pipeline: pipeline::Config,
}

impl Config {
    pub fn load_or_panic() -> Config {
        Self {
            db: from_env_or_panic("DB_"),
            pipeline: from_env_or_panic("PIPELINE_"),
        }
    }
}

pub(crate) fn from_env_or_panic<T: DeserializeOwned>(prefix: &str) -> T {
    envy::prefixed(prefix).from_env().unwrap_or_else(|err| {
        panic!(
            "BUG: Couldn't load config from environment for {}: {}",
            std::any::type_name::<T>(),
            err.display_chain(),
        );
    })
}
