use super::Context;
use crate::prelude::*;
use crate::Result;
use clap::Parser;

/// Normalize the scraped message dumps and replace the messages table with them
#[derive(Parser, Debug)]
pub struct LoadMessages {}

/// Label the scraped images with the detections of the model, write the
/// results into a CSV file and replace the detections table with them
#[derive(Parser, Debug)]
pub struct Detect {}

/// Run `load-messages` and then `detect`
#[derive(Parser, Debug)]
pub struct RunPipeline {}

impl LoadMessages {
    pub(crate) async fn run(self, ctx: Context) -> Result {
        ctx.into_pipeline()
            .load_messages()
            .with_duration_log("Loaded the messages")
            .await?;
        Ok(())
    }
}

impl Detect {
    pub(crate) async fn run(self, ctx: Context) -> Result {
        ctx.into_pipeline()
            .load_detections()
            .with_duration_log("Loaded the detections")
            .await?;
        Ok(())
    }
}

impl RunPipeline {
    pub(crate) async fn run(self, ctx: Context) -> Result {
        ctx.into_pipeline().run().await?;
        Ok(())
    }
}
