mod load;
mod report;

pub use load::*;
pub use report::*;

use crate::db::WarehouseWriter;
use crate::pipeline::Pipeline;
use crate::{Config, Result};
use clap::Parser;

/// Loads scraped Telegram channel data and image detections into a Postgres
/// warehouse, and runs canned reports over it
#[derive(Parser, Debug)]
#[clap(version)]
pub enum Cmd {
    LoadMessages(LoadMessages),
    Detect(Detect),
    Pipeline(RunPipeline),
    Report(Report),
}

/// Everything the commands need, created once at startup
pub(crate) struct Context {
    pub(crate) config: Config,
    pub(crate) db: sqlx::PgPool,
}

impl Context {
    fn into_pipeline(self) -> Pipeline {
        let writer = WarehouseWriter::new(self.db, self.config.db.insert_batch_size);
        Pipeline::new(self.config.pipeline, writer)
    }
}

impl Cmd {
    pub(crate) async fn run(self, ctx: Context) -> Result {
        match self {
            Cmd::LoadMessages(cmd) => cmd.run(ctx).await,
            Cmd::Detect(cmd) => cmd.run(ctx).await,
            Cmd::Pipeline(cmd) => cmd.run(ctx).await,
            Cmd::Report(cmd) => cmd.run(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cmd::command().debug_assert();
    }

    #[test]
    fn parses_report_args() {
        let cmd = Cmd::try_parse_from([
            "tg-warehouse",
            "report",
            "search",
            "paracetamol",
            "--limit",
            "5",
            "--format",
            "yaml",
        ])
        .unwrap();

        test_bat::assert_debug_eq(
            &cmd,
            &expect_test::expect![[r#"
                Report(
                    Report {
                        format: Yaml,
                        kind: Search {
                            text: "paracetamol",
                            limit: 5,
                        },
                    },
                )"#]],
        );
    }
}
