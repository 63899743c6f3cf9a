//! Steps that move the scraped data into the warehouse.
use crate::db::{WarehouseWriter, WriteOutcome};
use crate::detection::{self, CsvDetections};
use crate::ingest;
use crate::prelude::*;
use crate::Result;
use serde::Deserialize;
use sqlx_bat::TableName;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    /// Root of the `<date>/<channel>.json` message dumps
    #[serde(default = "default_messages_dir")]
    pub(crate) messages_dir: PathBuf,

    /// Root of the `<channel>/<date>/<message_id>.jpg` images
    #[serde(default = "default_images_dir")]
    pub(crate) images_dir: PathBuf,

    /// Per-object detections produced by the detection model
    #[serde(default = "default_detections_input")]
    pub(crate) detections_input: PathBuf,

    /// Per-image detection records are also written here for the downstream
    /// consumers that don't read the warehouse
    #[serde(default = "default_detections_output")]
    pub(crate) detections_output: PathBuf,

    #[serde(default = "default_messages_table")]
    pub(crate) messages_table: TableName,

    #[serde(default = "default_detections_table")]
    pub(crate) detections_table: TableName,
}

fn default_messages_dir() -> PathBuf {
    "data/raw/telegram_messages".into()
}

fn default_images_dir() -> PathBuf {
    "data/raw/images".into()
}

fn default_detections_input() -> PathBuf {
    "data/processed/detection_results/yolo_detections.csv".into()
}

fn default_detections_output() -> PathBuf {
    "data/yolo_detections.csv".into()
}

fn default_messages_table() -> TableName {
    default_table("raw.telegram_messages")
}

fn default_detections_table() -> TableName {
    default_table("raw.image_detections")
}

fn default_table(name: &str) -> TableName {
    name.parse()
        .unwrap_or_else(|err| panic!("BUG: invalid default table name: {err}"))
}

/// Outcome of both of the pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PipelineOutcome {
    pub(crate) messages: WriteOutcome,
    pub(crate) detections: WriteOutcome,
}

pub(crate) struct Pipeline {
    config: Config,
    writer: WarehouseWriter,
}

impl Pipeline {
    pub(crate) fn new(config: Config, writer: WarehouseWriter) -> Self {
        Self { config, writer }
    }

    /// Replaces the messages table with the normalized message dumps. Nothing
    /// is written if there are no messages at all.
    #[instrument(skip_all)]
    pub(crate) async fn load_messages(&self) -> Result<WriteOutcome> {
        let messages = ingest::read_messages_dir(&self.config.messages_dir);

        self.writer
            .replace_all(&self.config.messages_table, messages.records)
            .await
    }

    /// Labels the images with the detections, writes the records into the
    /// output CSV file and replaces the detections table with them
    #[instrument(skip_all)]
    pub(crate) async fn load_detections(&self) -> Result<WriteOutcome> {
        let records = {
            let detector = CsvDetections::load(&self.config.detections_input)?;
            detection::label_images(&self.config.images_dir, &detector)
        };

        detection::write_csv(&self.config.detections_output, &records)?;

        self.writer
            .replace_all(&self.config.detections_table, records)
            .await
    }

    /// Runs all steps one after another. A failure of any step stops the run.
    pub(crate) async fn run(&self) -> Result<PipelineOutcome> {
        let messages = self
            .load_messages()
            .with_duration_log("Loaded the messages")
            .await?;

        let detections = self
            .load_detections()
            .with_duration_log("Loaded the detections")
            .await?;

        let outcome = PipelineOutcome {
            messages,
            detections,
        };

        info!(
            messages = outcome.messages.rows(),
            detections = outcome.detections.rows(),
            "Pipeline finished"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use assert_matches::assert_matches;
    use test_bat::FixtureDir;

    /// The database is unreachable, so the tests fail if anything is written
    fn pipeline(dir: &FixtureDir) -> Pipeline {
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/nothing")
            .unwrap();

        let config = Config {
            messages_dir: dir.join("messages"),
            images_dir: dir.join("images"),
            detections_input: dir.join("detections/input.csv"),
            detections_output: dir.join("out/detections.csv"),
            messages_table: default_messages_table(),
            detections_table: default_detections_table(),
        };

        Pipeline::new(config, WarehouseWriter::new(db, 100))
    }

    #[test]
    fn default_config() {
        let config: Config = serde_json::from_value(serde_json::json!({})).unwrap();

        assert_eq!(config.messages_dir, PathBuf::from("data/raw/telegram_messages"));
        assert_eq!(config.messages_table.to_string(), r#""raw"."telegram_messages""#);
        assert_eq!(config.detections_table.to_string(), r#""raw"."image_detections""#);
    }

    #[test]
    fn invalid_table_name_in_config() {
        let result = serde_json::from_value::<Config>(serde_json::json!({
            "messages_table": "Robert'); drop table students;--",
        }));

        assert!(result.is_err());
    }

    #[test_log::test(tokio::test)]
    async fn empty_messages_dir_writes_nothing() {
        let dir = FixtureDir::new();
        dir.write("messages/2024-01-01/readme.txt", "no dumps here");

        let outcome = pipeline(&dir).load_messages().await.unwrap();

        assert_eq!(outcome, WriteOutcome::Skipped);
    }

    #[test_log::test(tokio::test)]
    async fn no_images_still_writes_the_csv_header() {
        let dir = FixtureDir::new();
        dir.write("detections/input.csv", "image_path,confidence,class_name\n");

        let pipeline = pipeline(&dir);
        let outcome = pipeline.load_detections().await.unwrap();

        assert_eq!(outcome, WriteOutcome::Skipped);
        assert!(dir.join("out/detections.csv").is_file());
    }

    #[test_log::test(tokio::test)]
    async fn missing_detections_input_fails() {
        let dir = FixtureDir::new();

        let err = pipeline(&dir).load_detections().await.unwrap_err();

        assert_matches!(err.kind(), ErrorKind::Detection { .. });
        assert!(!dir.join("out/detections.csv").exists());
    }
}
