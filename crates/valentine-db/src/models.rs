//! Database row types. These map directly to SQLite rows and stay
//! string-typed; `into_*` conversions produce the shared domain types.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use valentine_types::models::{PageSettings, SectionContent, SectionItem};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct PageRow {
    pub id: String,
    pub owner_id: String,
    pub username: String,
    pub settings: String,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl PageRow {
    pub fn page_id(&self) -> Result<Uuid> {
        self.id.parse().with_context(|| format!("corrupt page id '{}'", self.id))
    }

    pub fn parsed_settings(&self) -> Result<PageSettings> {
        serde_json::from_str(&self.settings)
            .with_context(|| format!("corrupt settings on page '{}'", self.id))
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        parse_timestamp(&self.updated_at)
    }
}

pub struct SectionItemRow {
    pub id: String,
    pub page_id: String,
    pub kind: String,
    pub content: String,
    pub media_url: Option<String>,
    pub order_index: i64,
    pub created_at: String,
}

impl SectionItemRow {
    pub fn into_item(self) -> Result<SectionItem> {
        let content: SectionContent = serde_json::from_str(&self.content)
            .with_context(|| format!("corrupt content on section item '{}'", self.id))?;
        Ok(SectionItem {
            id: self.id.parse().with_context(|| format!("corrupt item id '{}'", self.id))?,
            page_id: self
                .page_id
                .parse()
                .with_context(|| format!("corrupt page_id on item '{}'", self.id))?,
            order_index: self.order_index,
            content,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AssetRow {
    pub id: String,
    pub page_id: String,
    pub file_name: String,
    pub url: String,
    pub content_type: String,
    pub size: i64,
    pub sha256: String,
    pub created_at: String,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone;
/// RFC 3339 is accepted too. Unparseable values become the epoch.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            tracing::warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let ts = parse_timestamp("2024-02-14 18:30:05");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 2, 14));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (18, 30, 5));

        let ts = parse_timestamp("2024-02-14T18:30:05Z");
        assert_eq!(ts.hour(), 18);

        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
    }
}
