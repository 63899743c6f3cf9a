use super::{Detection, DetectionError, ObjectDetector};
use crate::prelude::*;
use crate::{err_ctx, Result};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Detections precomputed by an external model and dumped into a CSV file,
/// one row per detected object. Extra columns (e.g. bounding boxes) are ignored.
pub(crate) struct CsvDetections {
    /// Keys are image paths relative to the images root, or bare file names
    /// if that's what the model has written
    by_image: HashMap<String, Vec<Detection>>,
}

#[derive(Deserialize)]
struct DetectionRow {
    #[serde(alias = "image_file")]
    image_path: String,
    class_name: String,
    confidence: f64,
}

impl CsvDetections {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(err_ctx!(
            DetectionError::ReadDetections {
                path: path.to_owned()
            }
        ))?;

        let mut by_image = HashMap::<_, Vec<_>>::new();
        let mut rows = 0;
        let mut skipped = 0;

        for row in reader.deserialize::<DetectionRow>() {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    warn!(err = tracing_err(&err), "Skipping a malformed detection row");
                    skipped += 1;
                    continue;
                }
            };

            if !(0.0..=1.0).contains(&row.confidence) {
                warn!(
                    image_path = %row.image_path,
                    confidence = row.confidence,
                    "Skipping a detection with confidence out of the [0, 1] range"
                );
                skipped += 1;
                continue;
            }

            rows += 1;

            by_image
                .entry(normalize_key(&row.image_path))
                .or_default()
                .push(Detection {
                    class_name: row.class_name.trim().to_owned(),
                    confidence: row.confidence,
                });
        }

        info!(
            path = tracing_path(path),
            rows,
            skipped,
            images = by_image.len(),
            "Loaded the detections"
        );

        Ok(Self { by_image })
    }
}

impl CsvDetections {
    fn by_path(&self, image: &Path) -> Option<&Vec<Detection>> {
        self.by_image.get(&normalize_key(&image.to_string_lossy()))
    }

    fn by_file_name(&self, image: &Path) -> Option<&Vec<Detection>> {
        self.by_image.get(image.file_name()?.to_str()?)
    }
}

impl ObjectDetector for CsvDetections {
    /// Falls back to the bare file name if there are no detections for the
    /// relative path. This assumes the file name identifies the image.
    fn detect(&self, image: &Path) -> Vec<Detection> {
        self.by_path(image)
            .or_else(|| self.by_file_name(image))
            .cloned()
            .unwrap_or_default()
    }

    /// Same as [`CsvDetections::detect`], except that the detections keyed by
    /// a bare file name are ignored for the images sharing that file name,
    /// e.g. `1.jpg` posted in two channels.
    fn detect_all(&self, images: &[&Path]) -> Vec<Vec<Detection>> {
        let file_names = images.iter().filter_map(|image| image.file_name()).counts();

        images
            .iter()
            .map(|image| {
                if let Some(detections) = self.by_path(image) {
                    return detections.clone();
                }

                let shared = image
                    .file_name()
                    .and_then(|name| file_names.get(name))
                    .is_some_and(|&count| count > 1);

                let detections = self.by_file_name(image);

                if shared {
                    if detections.is_some() {
                        warn!(
                            image = tracing_path(image),
                            "Ignoring the detections keyed by a file name shared by several images"
                        );
                    }
                    return vec![];
                }

                detections.cloned().unwrap_or_default()
            })
            .collect()
    }
}

fn normalize_key(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    match path.strip_prefix("./") {
        Some(path) => path.to_owned(),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use assert_matches::assert_matches;
    use test_bat::FixtureDir;

    fn classes(detections: Vec<Detection>) -> Vec<String> {
        detections.into_iter().map(|det| det.class_name).collect()
    }

    #[test]
    fn lookup_by_relative_path_and_file_name() {
        let dir = FixtureDir::new();
        let path = dir.write(
            "detections.csv",
            "image_path,x1,y1,x2,y2,confidence,class_id,class_name\n\
             lobelia/2024-01-01/1.jpg,0,0,10,10,0.9,39,bottle\n\
             ./lobelia/2024-01-01/1.jpg,0,0,10,10,0.7,0,person\n\
             2.jpg,0,0,10,10,0.5,41,cup\n\
             lobelia/3.jpg,0,0,10,10,1.5,41,cup\n\
             lobelia/3.jpg,0,0,10,10,oops,41,cup\n",
        );

        let detections = CsvDetections::load(&path).unwrap();

        assert_eq!(
            classes(detections.detect(Path::new("lobelia/2024-01-01/1.jpg"))),
            ["bottle", "person"]
        );
        assert_eq!(
            classes(detections.detect(Path::new("chemed/2024-01-02/2.jpg"))),
            ["cup"]
        );
        assert!(detections.detect(Path::new("lobelia/3.jpg")).is_empty());
        assert!(detections.detect(Path::new("lobelia/1.jpg")).is_empty());
    }

    #[test]
    fn accepts_image_file_column() {
        let dir = FixtureDir::new();
        let path = dir.write(
            "detections.csv",
            "image_file,confidence,class_name\n1.jpg,0.25,person\n",
        );

        let detections = CsvDetections::load(&path).unwrap();

        assert_eq!(
            detections.detect(Path::new("c/1.jpg")),
            [Detection {
                class_name: "person".to_owned(),
                confidence: 0.25
            }]
        );
    }

    #[test]
    fn file_name_shared_between_channels_is_ambiguous() {
        let dir = FixtureDir::new();
        let path = dir.write(
            "detections.csv",
            "image_file,confidence,class_name\n\
             1.jpg,0.9,person\n\
             2.jpg,0.5,cup\n\
             lobelia/2024-01-01/3.jpg,0.8,bottle\n\
             3.jpg,0.1,person\n",
        );

        let detections = CsvDetections::load(&path).unwrap();

        let images = [
            Path::new("chemed/2024-01-01/1.jpg"),
            Path::new("lobelia/2024-01-01/1.jpg"),
            Path::new("lobelia/2024-01-01/2.jpg"),
            Path::new("chemed/2024-01-01/3.jpg"),
            Path::new("lobelia/2024-01-01/3.jpg"),
        ];

        let actual: Vec<_> = detections
            .detect_all(&images)
            .into_iter()
            .map(classes)
            .collect();

        let expected: [Vec<&str>; 5] = [vec![], vec![], vec!["cup"], vec![], vec!["bottle"]];

        assert_eq!(actual, expected);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = FixtureDir::new();
        let err = CsvDetections::load(&dir.join("nope.csv")).err().unwrap();

        assert_matches!(
            err.kind(),
            ErrorKind::Detection {
                source: DetectionError::ReadDetections { .. }
            }
        );
    }
}
