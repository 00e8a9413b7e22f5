//! Article records as delivered by a content source and their normalized form.
//!
//! [`RawArticle`] accepts whatever the content source hands over: every field
//! is optional and wrong-typed values deserialize to "absent" instead of
//! failing. [`Normalizer`] is the only place that coerces those values into a
//! complete [`NormalizedArticle`], so nothing downstream re-checks optionality.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::FormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use super::images::{DEFAULT_IMAGE_WIDTH, ImageRef, ImageUrlBuilder};

pub const UNCATEGORIZED: &str = "Uncategorized";

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
const DATE_ONLY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const LOCAL_DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawArticle {
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub published_at: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub excerpt: Option<String>,
    #[serde(deserialize_with = "lenient_image")]
    pub main_image: Option<ImageRef>,
    pub is_featured: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub series: Option<String>,
    pub tags: Option<Value>,
}

/// Identity of a normalized article.
///
/// Positional ids only hold within a single fetch result; they shift whenever
/// the content source returns records in a different order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArticleId {
    Slug(String),
    Positional(usize),
}

impl ArticleId {
    pub fn is_positional(&self) -> bool {
        matches!(self, ArticleId::Positional(_))
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleId::Slug(slug) => f.write_str(slug),
            ArticleId::Positional(index) => write!(f, "post-{index}"),
        }
    }
}

impl Serialize for ArticleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    pub id: ArticleId,
    pub title: String,
    pub slug: String,
    pub published_at: Option<String>,
    pub excerpt: Option<String>,
    pub main_image: Option<ImageRef>,
    pub is_featured: bool,
    pub category: String,
    pub series: Option<String>,
    pub tags: Vec<String>,
    pub display_date: String,
    #[serde(skip)]
    pub sort_timestamp: OffsetDateTime,
    #[serde(skip)]
    pub published_on: Option<OffsetDateTime>,
    pub image_url: Option<String>,
}

/// Converts raw records into [`NormalizedArticle`]s.
///
/// The reference instant used for undated records is captured at
/// construction, so repeated calls on the same input produce identical output.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    images: &'a ImageUrlBuilder,
    image_width: u32,
    now: OffsetDateTime,
}

impl<'a> Normalizer<'a> {
    pub fn new(images: &'a ImageUrlBuilder, now: OffsetDateTime) -> Self {
        Self {
            images,
            image_width: DEFAULT_IMAGE_WIDTH,
            now,
        }
    }

    pub fn with_image_width(mut self, px: u32) -> Self {
        self.image_width = px;
        self
    }

    /// Output is index-aligned with `raw`.
    pub fn normalize(&self, raw: &[RawArticle]) -> Vec<NormalizedArticle> {
        raw.iter()
            .enumerate()
            .map(|(index, record)| self.normalize_one(index, record))
            .collect()
    }

    fn normalize_one(&self, index: usize, raw: &RawArticle) -> NormalizedArticle {
        let slug = raw.slug.clone().unwrap_or_default();
        let id = if slug.is_empty() {
            ArticleId::Positional(index)
        } else {
            ArticleId::Slug(slug.clone())
        };

        let published_on = raw.published_at.as_deref().and_then(parse_published_at);
        let sort_timestamp = published_on.unwrap_or(self.now);

        let image_url = raw
            .main_image
            .as_ref()
            .and_then(|image| self.images.image(image).width(self.image_width).url());

        NormalizedArticle {
            id,
            title: raw.title.clone().unwrap_or_default(),
            slug,
            published_at: raw.published_at.clone(),
            excerpt: raw.excerpt.clone(),
            main_image: raw.main_image.clone(),
            is_featured: matches!(raw.is_featured, Some(Value::Bool(true))),
            category: non_empty(raw.category.as_deref())
                .unwrap_or(UNCATEGORIZED)
                .to_string(),
            series: non_empty(raw.series.as_deref()).map(str::to_string),
            tags: coerce_tags(raw.tags.as_ref()),
            display_date: format_human_date(sort_timestamp.to_offset(UtcOffset::UTC).date()),
            sort_timestamp,
            published_on,
            image_url,
        }
    }
}

/// Accepts RFC 3339 timestamps, bare `YYYY-MM-DD` dates, and offset-less
/// `YYYY-MM-DDTHH:MM:SS` values; the latter two are read as UTC.
pub fn parse_published_at(value: &str) -> Option<OffsetDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(timestamp) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(timestamp);
    }

    if let Ok(local) = PrimitiveDateTime::parse(trimmed, LOCAL_DATETIME_FORMAT) {
        return Some(local.assume_utc());
    }

    Date::parse(trimmed, DATE_ONLY_FORMAT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

fn coerce_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

fn lenient_image<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}
