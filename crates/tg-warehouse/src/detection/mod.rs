//! Per-image rollups of the objects detected on the scraped images.
mod category;
mod csv_detections;

pub(crate) use category::*;
pub(crate) use csv_detections::*;

use crate::db::WarehouseRow;
use crate::prelude::*;
use crate::util::fs::discover_files;
use crate::{err_ctx, Result};
use itertools::Itertools;
use sea_query::SimpleExpr;
use serde::Serialize;
use sqlx_bat::{ColumnSpec, ColumnType};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, thiserror::Error)]
pub(crate) enum DetectionError {
    #[error("Failed to read the detections from {}", path.display())]
    ReadDetections { path: PathBuf, source: csv::Error },

    #[error("Failed to write the detection records to {}", path.display())]
    WriteDetections { path: PathBuf, source: csv::Error },
}

/// Single object found on an image
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Detection {
    pub(crate) class_name: String,
    pub(crate) confidence: f64,
}

/// Source of detections for the images
pub(crate) trait ObjectDetector {
    /// `image` is the path relative to the root directory of the images
    fn detect(&self, image: &Path) -> Vec<Detection>;

    /// Detections for every image of the batch, in the same order. Detectors
    /// that need to see all the images at once may override this.
    fn detect_all(&self, images: &[&Path]) -> Vec<Vec<Detection>> {
        images.iter().map(|image| self.detect(image)).collect()
    }
}

/// Summary of all the detections on a single image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RawDetectionRecord {
    pub(crate) channel_name: String,
    pub(crate) image_name: String,
    /// Comma-separated class names in the order of detection
    pub(crate) detected_objects: String,
    /// Mean confidence rounded to 3 decimal places
    pub(crate) avg_confidence: Option<f64>,
    pub(crate) image_category: ImageCategory,
}

impl RawDetectionRecord {
    pub(crate) fn new(channel_name: String, image_name: String, detections: &[Detection]) -> Self {
        let avg_confidence = (!detections.is_empty()).then(|| {
            let sum: f64 = detections.iter().map(|det| det.confidence).sum();
            (sum / detections.len() as f64).round_to(3)
        });

        let labels = detections.iter().map(|det| det.class_name.as_str());

        Self {
            channel_name,
            image_name,
            detected_objects: labels.clone().join(","),
            avg_confidence,
            image_category: ImageCategory::from_labels(labels),
        }
    }
}

impl WarehouseRow for RawDetectionRecord {
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::required("channel_name", ColumnType::Text),
        ColumnSpec::required("image_name", ColumnType::Text),
        ColumnSpec::required("detected_objects", ColumnType::Text),
        ColumnSpec::nullable("avg_confidence", ColumnType::Double),
        ColumnSpec::required("image_category", ColumnType::Text),
    ];

    fn into_values(self) -> Vec<SimpleExpr> {
        let image_category: &'static str = self.image_category.into();
        sqlx_bat::simple_expr_vec![
            self.channel_name,
            self.image_name,
            self.detected_objects,
            self.avg_confidence,
            image_category,
        ]
    }
}

/// Runs the detector over every image under `images_dir`. The images are
/// expected to be laid out as `<channel>/.../<image>`, and the ones lying
/// directly in the root are skipped, because their channel is unknown.
#[instrument(skip_all, fields(images_dir = %images_dir.display()))]
pub(crate) fn label_images(
    images_dir: &Path,
    detector: &dyn ObjectDetector,
) -> Vec<RawDetectionRecord> {
    let images: Vec<_> = discover_files(images_dir, IMAGE_EXTENSIONS)
        .into_iter()
        .filter_map(|path| {
            let relative = path.strip_prefix(images_dir).ok()?.to_owned();

            let mut components = relative.iter();
            let channel = components.next()?.to_string_lossy().into_owned();

            if components.next().is_none() {
                warn!(
                    path = tracing_path(&path),
                    "Skipping an image outside of any channel directory"
                );
                return None;
            }

            Some((channel, relative))
        })
        .collect();

    let paths: Vec<_> = images.iter().map(|(_, relative)| relative.as_path()).collect();
    let detections = detector.detect_all(&paths);

    let records: Vec<_> = images
        .into_iter()
        .zip(detections)
        .map(|((channel, relative), detections)| {
            let image_name = relative
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned();

            RawDetectionRecord::new(channel, image_name, &detections)
        })
        .collect();

    if records.is_empty() {
        warn!("No images were found");
    } else {
        let categories = records.iter().counts_by(|record| record.image_category);
        info!(images = records.len(), ?categories, "Labeled the images");
    }

    records
}

/// Writes the records into a CSV file, creating the parent directories.
/// The header is written even if there are no records.
pub(crate) fn write_csv(path: &Path, records: &[RawDetectionRecord]) -> Result {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }

    let write = || -> Result<(), csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        writer.write_record(RawDetectionRecord::COLUMNS.iter().map(|column| column.name))?;

        for record in records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    };

    write().map_err(err_ctx!(DetectionError::WriteDetections {
        path: path.to_owned()
    }))?;

    info!(
        path = tracing_path(path),
        records = records.len(),
        "Wrote the detection records"
    );

    Ok(())
}
