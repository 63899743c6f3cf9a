use super::Context;
use crate::prelude::*;
use crate::report::ReportRepo;
use crate::Result;
use clap::Parser;
use serde::Serialize;

/// Print one of the canned reports over the warehouse
#[derive(Parser, Debug)]
pub struct Report {
    /// Format of the report printed to stdout
    #[clap(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    format: OutputFormat,

    #[clap(subcommand)]
    kind: ReportKind,
}

#[derive(clap::Subcommand, Debug)]
enum ReportKind {
    /// Most frequently detected objects
    TopObjects {
        #[clap(long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Posts and views per day in the channel
    ChannelActivity { channel_name: String },

    /// Messages that contain the text, case-insensitive
    Search {
        text: String,

        #[clap(long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Images and detection confidence per image category
    VisualContent,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum OutputFormat {
    Json,
    Yaml,
}

impl Report {
    pub(crate) async fn run(self, ctx: Context) -> Result {
        let pipeline = ctx.config.pipeline;
        let repo = ReportRepo::new(ctx.db, pipeline.messages_table, pipeline.detections_table);

        match self.kind {
            ReportKind::TopObjects { limit } => print(self.format, &repo.top_objects(limit).await?),
            ReportKind::ChannelActivity { channel_name } => {
                print(self.format, &repo.channel_activity(&channel_name).await?)
            }
            ReportKind::Search { text, limit } => {
                print(self.format, &repo.search_messages(&text, limit).await?)
            }
            ReportKind::VisualContent => print(self.format, &repo.visual_content_stats().await?),
        }
    }
}

fn print(format: OutputFormat, rows: &impl Serialize) -> Result {
    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(rows)
            .fatal_ctx(|| "Failed to serialize the report to JSON")?,
        OutputFormat::Yaml => serde_yaml::to_string(rows)
            .fatal_ctx(|| "Failed to serialize the report to YAML")?,
    };

    println!("{}", output.trim_end());

    Ok(())
}
