//! Canned read-only reports over the warehouse tables.
use crate::prelude::*;
use crate::{bail, Result};
use serde::Serialize;
use sqlx_bat::TableName;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ReportError {
    #[error("Limit must be a positive number, but got {limit}")]
    InvalidLimit { limit: i64 },

    #[error("Search text must not be empty")]
    EmptySearchText,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub(crate) struct ObjectCount {
    pub(crate) detected_object: String,
    /// Number of distinct images the object was detected on
    pub(crate) images: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub(crate) struct ChannelDay {
    /// Calendar day in UTC
    pub(crate) day: chrono::NaiveDate,
    pub(crate) posts: i64,
    pub(crate) views: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub(crate) struct FoundMessage {
    pub(crate) channel_name: String,
    pub(crate) message_id: i64,
    pub(crate) message_date: Option<chrono::DateTime<chrono::Utc>>,
    pub(crate) message_text: Option<String>,
    pub(crate) views: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub(crate) struct CategoryStats {
    pub(crate) image_category: String,
    pub(crate) images: i64,
    pub(crate) avg_confidence: Option<f64>,
}

pub(crate) struct ReportRepo {
    db: sqlx::PgPool,
    messages_table: TableName,
    detections_table: TableName,
}

impl ReportRepo {
    pub(crate) fn new(db: sqlx::PgPool, messages_table: TableName, detections_table: TableName) -> Self {
        Self {
            db,
            messages_table,
            detections_table,
        }
    }

    /// Most frequently detected objects
    pub(crate) async fn top_objects(&self, limit: i64) -> Result<Vec<ObjectCount>> {
        validate_limit(limit)?;

        let query = format!(
            "select label as detected_object, count(distinct (channel_name, image_name)) as images
            from {}, unnest(string_to_array(detected_objects, ',')) as label
            where label <> ''
            group by label
            order by images desc, label
            limit $1",
            self.detections_table
        );

        sqlx::query_as(&query)
            .bind(limit)
            .fetch_all(&self.db)
            .with_duration_log("Queried the top detected objects")
            .await
            .map_err(Into::into)
    }

    /// Number of posts and their views per day. Messages without a date are
    /// not counted.
    pub(crate) async fn channel_activity(&self, channel_name: &str) -> Result<Vec<ChannelDay>> {
        let query = format!(
            "select
                (message_date at time zone 'UTC')::date as day,
                count(*) as posts,
                coalesce(sum(views), 0)::bigint as views
            from {}
            where channel_name = $1 and message_date is not null
            group by day
            order by day",
            self.messages_table
        );

        sqlx::query_as(&query)
            .bind(channel_name)
            .fetch_all(&self.db)
            .with_duration_log("Queried the channel activity")
            .await
            .map_err(Into::into)
    }

    /// Case-insensitive substring search over the texts of the messages,
    /// the most viewed ones go first
    pub(crate) async fn search_messages(&self, text: &str, limit: i64) -> Result<Vec<FoundMessage>> {
        validate_limit(limit)?;

        if text.trim().is_empty() {
            bail!(ReportError::EmptySearchText);
        }

        let query = format!(
            "select channel_name, message_id, message_date, message_text, views
            from {}
            where message_text ilike $1 escape '\\'
            order by views desc, message_date desc nulls last, channel_name, message_id
            limit $2",
            self.messages_table
        );

        sqlx::query_as(&query)
            .bind(format!("%{}%", escape_like(text)))
            .bind(limit)
            .fetch_all(&self.db)
            .with_duration_log("Searched the messages")
            .await
            .map_err(Into::into)
    }

    /// Number of images and their mean confidence per image category
    pub(crate) async fn visual_content_stats(&self) -> Result<Vec<CategoryStats>> {
        let query = format!(
            "select image_category, count(*) as images, avg(avg_confidence) as avg_confidence
            from {}
            group by image_category
            order by images desc, image_category",
            self.detections_table
        );

        sqlx::query_as(&query)
            .fetch_all(&self.db)
            .with_duration_log("Queried the visual content stats")
            .await
            .map_err(Into::into)
    }
}

fn validate_limit(limit: i64) -> Result {
    if limit <= 0 {
        bail!(ReportError::InvalidLimit { limit });
    }
    Ok(())
}

/// Escapes the wildcards of the `like` pattern, so the text is matched literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
