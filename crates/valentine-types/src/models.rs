use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// -- Page settings --

/// Copy for one of the two decline modals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineModalCopy {
    pub title: String,
    pub message: String,
    pub accept_label: String,
    pub decline_label: String,
}

impl DeclineModalCopy {
    pub fn first() -> Self {
        Self {
            title: "Are you sure?".into(),
            message: "Think about it one more time...".into(),
            accept_label: "Okay, yes!".into(),
            decline_label: "Still no".into(),
        }
    }

    pub fn second() -> Self {
        Self {
            title: "Really really sure?".into(),
            message: "This is your last chance to say yes.".into(),
            accept_label: "Fine, yes!".into(),
            decline_label: "Absolutely not".into(),
        }
    }
}

/// A stored modal object may set only some of its strings; the rest keep
/// the stock copy of that modal.
#[derive(Deserialize)]
struct DeclineModalPatch {
    title: Option<String>,
    message: Option<String>,
    accept_label: Option<String>,
    decline_label: Option<String>,
}

impl DeclineModalPatch {
    fn apply(self, base: DeclineModalCopy) -> DeclineModalCopy {
        DeclineModalCopy {
            title: self.title.unwrap_or(base.title),
            message: self.message.unwrap_or(base.message),
            accept_label: self.accept_label.unwrap_or(base.accept_label),
            decline_label: self.decline_label.unwrap_or(base.decline_label),
        }
    }
}

fn first_decline<'de, D: Deserializer<'de>>(d: D) -> Result<DeclineModalCopy, D::Error> {
    DeclineModalPatch::deserialize(d).map(|p| p.apply(DeclineModalCopy::first()))
}

fn second_decline<'de, D: Deserializer<'de>>(d: D) -> Result<DeclineModalCopy, D::Error> {
    DeclineModalPatch::deserialize(d).map(|p| p.apply(DeclineModalCopy::second()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CelebrationCopy {
    pub title: String,
    pub message: String,
}

impl Default for CelebrationCopy {
    fn default() -> Self {
        Self {
            title: "Yay!".into(),
            message: "I knew you would say yes.".into(),
        }
    }
}

/// Every string shown by the accept/decline flow. The flow itself never
/// looks at these; the renderer pairs them with reveal stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealCopy {
    pub question: String,
    pub accept_label: String,
    pub decline_label: String,
    #[serde(deserialize_with = "first_decline")]
    pub first_decline: DeclineModalCopy,
    #[serde(deserialize_with = "second_decline")]
    pub second_decline: DeclineModalCopy,
    pub virus_message: String,
    pub celebration: CelebrationCopy,
}

impl Default for RevealCopy {
    fn default() -> Self {
        Self {
            question: "Will you be my Valentine?".into(),
            accept_label: "Yes!".into(),
            decline_label: "No".into(),
            first_decline: DeclineModalCopy::first(),
            second_decline: DeclineModalCopy::second(),
            virus_message: "Love virus detected. Resistance is futile.".into(),
            celebration: CelebrationCopy::default(),
        }
    }
}

/// Customizable strings and flags of a page. Missing fields deserialize to
/// their defaults so older stored settings keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    pub recipient_name: String,
    pub sender_name: String,
    pub hero_title: String,
    pub hero_subtitle: String,

    pub start_date: Option<NaiveDate>,
    pub show_counter: bool,
    pub music_url: Option<String>,

    pub show_gallery: bool,
    pub show_timeline: bool,
    pub show_reasons: bool,
    pub show_bucket_list: bool,
    pub show_notes: bool,
    pub show_poems: bool,
    pub show_coupons: bool,

    pub gallery_title: String,
    pub timeline_title: String,
    pub reasons_title: String,
    pub bucket_list_title: String,
    pub notes_title: String,
    pub poems_title: String,
    pub coupons_title: String,

    pub reveal: RevealCopy,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            recipient_name: "My Love".into(),
            sender_name: String::new(),
            hero_title: "Happy Valentine's Day".into(),
            hero_subtitle: String::new(),
            start_date: None,
            show_counter: true,
            music_url: None,
            show_gallery: true,
            show_timeline: true,
            show_reasons: true,
            show_bucket_list: true,
            show_notes: true,
            show_poems: true,
            show_coupons: true,
            gallery_title: "Our Moments".into(),
            timeline_title: "Our Story".into(),
            reasons_title: "Reasons I Love You".into(),
            bucket_list_title: "Our Bucket List".into(),
            notes_title: "Little Notes".into(),
            poems_title: "Poems For You".into(),
            coupons_title: "Love Coupons".into(),
            reveal: RevealCopy::default(),
        }
    }
}

impl PageSettings {
    /// Whole days elapsed since `start_date`. A start date in the future
    /// counts as zero.
    pub fn days_together(&self, today: NaiveDate) -> Option<i64> {
        self.start_date
            .map(|start| today.signed_duration_since(start).num_days().max(0))
    }

    pub fn is_visible(&self, kind: SectionKind) -> bool {
        match kind {
            SectionKind::Gallery => self.show_gallery,
            SectionKind::Timeline => self.show_timeline,
            SectionKind::Reason => self.show_reasons,
            SectionKind::BucketList => self.show_bucket_list,
            SectionKind::Note => self.show_notes,
            SectionKind::Poem => self.show_poems,
            SectionKind::Coupon => self.show_coupons,
        }
    }
}

pub fn days_label(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

// -- Sections --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Gallery,
    Timeline,
    Reason,
    BucketList,
    Note,
    Poem,
    Coupon,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Gallery,
        SectionKind::Timeline,
        SectionKind::Reason,
        SectionKind::BucketList,
        SectionKind::Note,
        SectionKind::Poem,
        SectionKind::Coupon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Gallery => "gallery",
            SectionKind::Timeline => "timeline",
            SectionKind::Reason => "reason",
            SectionKind::BucketList => "bucket_list",
            SectionKind::Note => "note",
            SectionKind::Poem => "poem",
            SectionKind::Coupon => "coupon",
        }
    }

    /// Kinds whose records reference an uploaded asset.
    pub fn takes_media(&self) -> bool {
        matches!(self, SectionKind::Gallery | SectionKind::Timeline)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section kind: {0}")]
pub struct UnknownSectionKind(pub String);

impl FromStr for SectionKind {
    type Err = UnknownSectionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownSectionKind(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// Content of one section item. The `kind` tag doubles as the collection
/// the item lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionContent {
    Gallery {
        media_url: String,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        media_type: MediaType,
    },
    Timeline {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        event_date: Option<NaiveDate>,
        #[serde(default)]
        media_url: Option<String>,
    },
    Reason {
        text: String,
    },
    BucketList {
        title: String,
        #[serde(default)]
        completed: bool,
    },
    Note {
        #[serde(default)]
        title: Option<String>,
        content: String,
    },
    Poem {
        title: String,
        content: String,
    },
    Coupon {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        redeemed: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("expected a {expected} item, got {actual}")]
    KindMismatch {
        expected: SectionKind,
        actual: SectionKind,
    },
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

impl SectionContent {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionContent::Gallery { .. } => SectionKind::Gallery,
            SectionContent::Timeline { .. } => SectionKind::Timeline,
            SectionContent::Reason { .. } => SectionKind::Reason,
            SectionContent::BucketList { .. } => SectionKind::BucketList,
            SectionContent::Note { .. } => SectionKind::Note,
            SectionContent::Poem { .. } => SectionKind::Poem,
            SectionContent::Coupon { .. } => SectionKind::Coupon,
        }
    }

    pub fn media_url(&self) -> Option<&str> {
        match self {
            SectionContent::Gallery { media_url, .. } => Some(media_url.as_str()),
            SectionContent::Timeline { media_url, .. } => media_url.as_deref(),
            _ => None,
        }
    }

    /// Checks required fields and that the item belongs to `expected`.
    pub fn validate(&self, expected: SectionKind) -> Result<(), ValidationError> {
        let actual = self.kind();
        if actual != expected {
            return Err(ValidationError::KindMismatch { expected, actual });
        }
        match self {
            SectionContent::Gallery { media_url, .. } => require(media_url, "media_url"),
            SectionContent::Timeline { title, .. } => require(title, "title"),
            SectionContent::Reason { text } => require(text, "text"),
            SectionContent::BucketList { title, .. } => require(title, "title"),
            SectionContent::Note { content, .. } => require(content, "content"),
            SectionContent::Poem { title, content } => {
                require(title, "title")?;
                require(content, "content")
            }
            SectionContent::Coupon { title, .. } => require(title, "title"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionItem {
    pub id: Uuid,
    pub page_id: Uuid,
    pub order_index: i64,
    #[serde(flatten)]
    pub content: SectionContent,
    pub created_at: DateTime<Utc>,
}

/// All items of a page grouped by collection, each already in display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSections {
    pub gallery: Vec<SectionItem>,
    pub timeline: Vec<SectionItem>,
    pub reasons: Vec<SectionItem>,
    pub bucket_list: Vec<SectionItem>,
    pub notes: Vec<SectionItem>,
    pub poems: Vec<SectionItem>,
    pub coupons: Vec<SectionItem>,
}

impl PageSections {
    pub fn collection_mut(&mut self, kind: SectionKind) -> &mut Vec<SectionItem> {
        match kind {
            SectionKind::Gallery => &mut self.gallery,
            SectionKind::Timeline => &mut self.timeline,
            SectionKind::Reason => &mut self.reasons,
            SectionKind::BucketList => &mut self.bucket_list,
            SectionKind::Note => &mut self.notes,
            SectionKind::Poem => &mut self.poems,
            SectionKind::Coupon => &mut self.coupons,
        }
    }

    /// Groups items by kind, preserving the input order within each kind.
    pub fn from_items(items: impl IntoIterator<Item = SectionItem>) -> Self {
        let mut sections = Self::default();
        for item in items {
            sections.collection_mut(item.content.kind()).push(item);
        }
        sections
    }

    /// Drops collections the page has switched off.
    pub fn retain_visible(&mut self, settings: &PageSettings) {
        for kind in SectionKind::ALL {
            if !settings.is_visible(kind) {
                self.collection_mut(kind).clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ten_days_after_new_year() {
        let settings = PageSettings {
            start_date: Some(date(2024, 1, 1)),
            ..Default::default()
        };
        let days = settings.days_together(date(2024, 1, 11)).unwrap();
        assert_eq!(days, 10);
        assert_eq!(days_label(days), "10 days");
    }

    #[test]
    fn counter_absent_without_start_date_and_clamped_for_future() {
        let mut settings = PageSettings::default();
        assert_eq!(settings.days_together(date(2024, 2, 14)), None);

        settings.start_date = Some(date(2025, 1, 1));
        assert_eq!(settings.days_together(date(2024, 2, 14)), Some(0));
        assert_eq!(days_label(1), "1 day");
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: PageSettings =
            serde_json::from_str(r#"{"recipient_name":"Sam","reveal":{"question":"Be mine?"}}"#)
                .unwrap();
        assert_eq!(settings.recipient_name, "Sam");
        assert_eq!(settings.reveal.question, "Be mine?");
        assert_eq!(settings.reveal.accept_label, "Yes!");
        assert!(settings.show_gallery);
    }

    #[test]
    fn partial_modal_copy_keeps_stock_strings() {
        let settings: PageSettings = serde_json::from_str(
            r#"{"reveal":{"first_decline":{"title":"Sure?"},"second_decline":{"decline_label":"Nope"},"celebration":{"title":"Woo"}}}"#,
        )
        .unwrap();
        let reveal = settings.reveal;

        assert_eq!(reveal.first_decline.title, "Sure?");
        assert_eq!(reveal.first_decline.message, DeclineModalCopy::first().message);
        assert_eq!(reveal.first_decline.accept_label, "Okay, yes!");
        assert_eq!(reveal.first_decline.decline_label, "Still no");

        assert_eq!(reveal.second_decline.title, "Really really sure?");
        assert_eq!(reveal.second_decline.accept_label, "Fine, yes!");
        assert_eq!(reveal.second_decline.decline_label, "Nope");

        assert_eq!(reveal.celebration.title, "Woo");
        assert_eq!(reveal.celebration.message, "I knew you would say yes.");
    }

    #[test]
    fn section_content_wire_format() {
        let content: SectionContent =
            serde_json::from_str(r#"{"kind":"bucket_list","title":"See Paris"}"#).unwrap();
        assert_eq!(
            content,
            SectionContent::BucketList {
                title: "See Paris".into(),
                completed: false
            }
        );
        assert_eq!(content.kind(), SectionKind::BucketList);
        assert_eq!("bucket_list".parse::<SectionKind>(), Ok(SectionKind::BucketList));
        assert!("bucket-list".parse::<SectionKind>().is_err());
    }

    #[test]
    fn validation_rejects_blank_required_fields() {
        let poem = SectionContent::Poem {
            title: "Roses".into(),
            content: "   ".into(),
        };
        assert_eq!(
            poem.validate(SectionKind::Poem),
            Err(ValidationError::Required("content"))
        );

        let reason = SectionContent::Reason { text: "Your laugh".into() };
        assert!(reason.validate(SectionKind::Reason).is_ok());
        assert!(matches!(
            reason.validate(SectionKind::Note),
            Err(ValidationError::KindMismatch { .. })
        ));
    }

    #[test]
    fn hidden_sections_are_dropped() {
        let page_id = Uuid::new_v4();
        let item = |content| SectionItem {
            id: Uuid::new_v4(),
            page_id,
            order_index: 0,
            content,
            created_at: Utc::now(),
        };
        let mut sections = PageSections::from_items(vec![
            item(SectionContent::Reason { text: "a".into() }),
            item(SectionContent::Coupon {
                title: "Breakfast in bed".into(),
                description: None,
                redeemed: false,
            }),
        ]);
        assert_eq!(sections.reasons.len(), 1);
        assert_eq!(sections.coupons.len(), 1);

        let settings = PageSettings {
            show_coupons: false,
            ..Default::default()
        };
        sections.retain_visible(&settings);
        assert_eq!(sections.reasons.len(), 1);
        assert!(sections.coupons.is_empty());
    }
}
