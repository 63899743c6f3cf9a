//! Normalization of the scraped message dumps into the canonical table.
mod record;
mod repair;

pub(crate) use record::*;

use crate::observability::metrics::{INGEST_FILES_SKIPPED_TOTAL, INGEST_RECORDS_SKIPPED_TOTAL};
use crate::prelude::*;
use crate::util::fs::discover_files;
use std::collections::HashMap;
use std::path::Path;

/// Messages read from all the dump files, deduplicated by their composite key
#[derive(Debug, Default)]
pub(crate) struct NormalizedMessages {
    pub(crate) records: Vec<RawMessageRecord>,
    pub(crate) files_read: usize,
    pub(crate) files_skipped: usize,
    pub(crate) records_skipped: usize,
}

/// Reads all `*.json` files under `dir` recursively. Each of them is expected
/// to contain a list of message objects.
///
/// This never fails. Files and records that can't be decoded are skipped with
/// a warning, and a missing directory produces an empty result.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub(crate) fn read_messages_dir(dir: &Path) -> NormalizedMessages {
    let mut output = NormalizedMessages::default();

    // Value is the index of the record in `output.records`. It's replaced in
    // place, so that the record from the latest file wins.
    let mut seen = HashMap::<(String, i64), usize>::new();

    for path in discover_files(dir, &["json"]) {
        let Some(values) = read_json_list(&path) else {
            output.files_skipped += 1;
            metrics::counter!(INGEST_FILES_SKIPPED_TOTAL, 1);
            continue;
        };

        output.files_read += 1;

        for (index, value) in values.iter().enumerate() {
            let record = match RawMessageRecord::from_json(value) {
                Ok(record) => record,
                Err(rejection) => {
                    warn!(
                        path = tracing_path(&path),
                        index,
                        ?rejection,
                        "Skipping a record that doesn't fit the warehouse table"
                    );
                    output.records_skipped += 1;

                    let reason: &'static str = rejection.into();
                    metrics::counter!(INGEST_RECORDS_SKIPPED_TOTAL, 1, "reason" => reason);
                    continue;
                }
            };

            let key = (record.channel_name.clone(), record.message_id);

            match seen.get(&key).copied() {
                Some(existing) => {
                    debug!(
                        channel_name = %key.0,
                        message_id = key.1,
                        "Replacing a duplicate message with a later one"
                    );
                    output.records[existing] = record;
                }
                None => {
                    seen.insert(key, output.records.len());
                    output.records.push(record);
                }
            }
        }
    }

    if output.records.is_empty() {
        warn!(
            files_read = output.files_read,
            files_skipped = output.files_skipped,
            "No messages were found"
        );
    } else {
        info!(
            records = output.records.len(),
            files_read = output.files_read,
            files_skipped = output.files_skipped,
            records_skipped = output.records_skipped,
            "Normalized the messages"
        );
    }

    output
}

fn read_json_list(path: &Path) -> Option<Vec<serde_json::Value>> {
    let bytes = fs_err::read(path)
        .map_err(|err| warn!(err = tracing_err(&err), "Skipping unreadable file"))
        .ok()?;

    let text = String::from_utf8_lossy(&bytes);
    let text = repair::repair_surrogate_escapes(&text);

    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| {
            warn!(
                path = tracing_path(path),
                err = tracing_err(&err),
                "Skipping a file that isn't valid JSON"
            );
        })
        .ok()?;

    match value {
        serde_json::Value::Array(values) => Some(values),
        _ => {
            warn!(
                path = tracing_path(path),
                "Skipping a file that doesn't contain a list of messages"
            );
            None
        }
    }
}
