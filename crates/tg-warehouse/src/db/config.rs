use derivative::Derivative;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

#[derive(Derivative, Deserialize)]
#[derivative(Debug)]
pub(crate) struct Config {
    #[serde(default = "default_host")]
    pub(crate) host: String,

    #[serde(default = "default_port")]
    pub(crate) port: u16,

    pub(crate) user: String,

    #[derivative(Debug = "ignore")]
    #[serde(default)]
    pub(crate) password: Option<String>,

    /// Name of the database
    pub(crate) name: String,

    #[serde(default = "default_pool_size")]
    pub(crate) pool_size: u32,

    /// Number of rows sent to the database in a single insert statement
    #[serde(default = "default_insert_batch_size")]
    pub(crate) insert_batch_size: usize,
}

impl Config {
    pub(crate) fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name);

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

fn default_host() -> String {
    "localhost".to_owned()
}

fn default_port() -> u16 {
    5432
}

fn default_pool_size() -> u32 {
    // The pipeline is sequential, so it needs a single connection at a time.
    // The rest are spare ones for the reports.
    4
}

fn default_insert_batch_size() -> usize {
    1000
}
