use super::repair::{parse_timestamp, replace_nul};
use crate::db::WarehouseRow;
use chrono::{DateTime, Utc};
use sea_query::SimpleExpr;
use serde_json::Value;
use sqlx_bat::{ColumnSpec, ColumnType};

/// A single scraped message in the canonical shape of the warehouse table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawMessageRecord {
    /// Unique only within the channel
    pub(crate) message_id: i64,
    pub(crate) message_date: Option<DateTime<Utc>>,
    pub(crate) message_text: Option<String>,
    pub(crate) channel_name: String,
    pub(crate) sender_id: Option<String>,
    /// Set only when the scraper has downloaded the message's media
    pub(crate) image_path: Option<String>,
    pub(crate) views: i64,
    pub(crate) forwards: i64,
    pub(crate) has_media: Option<bool>,
}

impl WarehouseRow for RawMessageRecord {
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::required("message_id", ColumnType::BigInt).primary_key(),
        ColumnSpec::nullable("message_date", ColumnType::TimestampTz),
        ColumnSpec::nullable("message_text", ColumnType::Text),
        ColumnSpec::required("channel_name", ColumnType::Text).primary_key(),
        ColumnSpec::nullable("sender_id", ColumnType::Text),
        ColumnSpec::nullable("image_path", ColumnType::Text),
        ColumnSpec::required("views", ColumnType::BigInt),
        ColumnSpec::required("forwards", ColumnType::BigInt),
        ColumnSpec::nullable("has_media", ColumnType::Boolean),
    ];

    fn into_values(self) -> Vec<SimpleExpr> {
        sqlx_bat::simple_expr_vec![
            self.message_id,
            self.message_date,
            self.message_text,
            self.channel_name,
            self.sender_id,
            self.image_path,
            self.views,
            self.forwards,
            self.has_media,
        ]
    }
}

/// Reason why a raw JSON value couldn't become a [`RawMessageRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum RecordRejection {
    NotAnObject,
    MissingMessageId,
    MissingChannelName,
}

impl RawMessageRecord {
    /// Maps the fields of the scraper's output to the canonical ones. The
    /// canonical names are accepted too, in which case the scraper's name
    /// takes precedence if both are present.
    pub(crate) fn from_json(value: &Value) -> Result<Self, RecordRejection> {
        let object = value.as_object().ok_or(RecordRejection::NotAnObject)?;

        let field = move |source: &str, canonical: &str| {
            [source, canonical]
                .into_iter()
                .filter_map(move |key| object.get(key))
                .find(|value| !value.is_null())
        };

        let message_id = field("id", "message_id")
            .and_then(to_i64)
            .ok_or(RecordRejection::MissingMessageId)?;

        let channel_name = field("channel", "channel_name")
            .and_then(to_text)
            .filter(|name| !name.trim().is_empty())
            .ok_or(RecordRejection::MissingChannelName)?;

        Ok(Self {
            message_id,
            message_date: field("date", "message_date")
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            message_text: field("content", "message_text").and_then(to_text),
            channel_name,
            sender_id: object.get("sender_id").and_then(to_text),
            image_path: field("media_path", "image_path")
                .and_then(to_text)
                .filter(|path| !path.is_empty()),
            views: counter(object.get("views")),
            forwards: counter(object.get("forwards")),
            has_media: object.get("has_media").and_then(to_bool),
        })
    }
}

fn to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    Some(replace_nul(text))
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            let float = number.as_f64()?;
            (float.fract() == 0.0 && float.abs() < i64::MAX as f64).then_some(float as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Counters are never negative, and a missing counter means nobody saw the
/// message yet
fn counter(value: Option<&Value>) -> i64 {
    value.and_then(to_i64).unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_scraper_fields() {
        let value = json!({
            "id": 5,
            "date": "2024-01-01T00:00:00",
            "content": "x",
            "channel": "c",
        });

        let record = RawMessageRecord::from_json(&value).unwrap();

        assert_eq!(record.message_id, 5);
        assert_eq!(record.message_text.as_deref(), Some("x"));
        assert_eq!(record.channel_name, "c");
        assert_eq!(record.image_path, None);
        assert_eq!(record.sender_id, None);
        assert_eq!(record.views, 0);
        assert_eq!(
            record.message_date.map(|date| date.to_rfc3339()).as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn accepts_canonical_fields_and_loose_types() {
        let value = json!({
            "message_id": "42",
            "channel_name": "@chemed",
            "message_text": "a\u{0}b",
            "sender_id": 1_234_567_890_123_i64,
            "image_path": "",
            "views": "17",
            "forwards": -3,
            "has_media": "true",
            "message_date": "not a date",
        });

        let record = RawMessageRecord::from_json(&value).unwrap();

        assert_eq!(
            record,
            RawMessageRecord {
                message_id: 42,
                message_date: None,
                message_text: Some("a\u{FFFD}b".to_owned()),
                channel_name: "@chemed".to_owned(),
                sender_id: Some("1234567890123".to_owned()),
                image_path: None,
                views: 17,
                forwards: 0,
                has_media: Some(true),
            }
        );
    }

    #[test]
    fn scraper_name_wins_over_canonical_one() {
        let value = json!({ "id": 1, "message_id": 2, "channel": null, "channel_name": "c" });
        let record = RawMessageRecord::from_json(&value).unwrap();

        assert_eq!(record.message_id, 1);
        assert_eq!(record.channel_name, "c");
    }

    #[test]
    fn rejections() {
        let reject = |value: Value| RawMessageRecord::from_json(&value).unwrap_err();

        assert_eq!(reject(json!([1])), RecordRejection::NotAnObject);
        assert_eq!(reject(json!({ "channel": "c" })), RecordRejection::MissingMessageId);
        assert_eq!(reject(json!({ "id": 1.5, "channel": "c" })), RecordRejection::MissingMessageId);
        assert_eq!(reject(json!({ "id": 1, "channel": " " })), RecordRejection::MissingChannelName);
    }

    #[test]
    fn primary_key_is_channel_and_message_id() {
        let primary_key: Vec<_> = RawMessageRecord::COLUMNS
            .iter()
            .filter(|column| column.primary_key)
            .map(|column| column.name)
            .collect();

        assert_eq!(primary_key, ["message_id", "channel_name"]);
        assert_eq!(
            RawMessageRecord::default().into_values().len(),
            RawMessageRecord::COLUMNS.len()
        );
    }
}
