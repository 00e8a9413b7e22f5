//! Featured-first ordering and single-facet filtering of normalized articles.

use std::cmp::Ordering;

use serde::{Serialize, Serializer, ser::SerializeStruct};

use super::articles::NormalizedArticle;

pub const KIND_CATEGORY: &str = "category";
pub const KIND_SERIES: &str = "series";
pub const KIND_SPECIAL: &str = "special";
pub const FEATURED_SENTINEL: &str = "FEATURED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialFilter {
    Featured,
}

impl SpecialFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialFilter::Featured => FEATURED_SENTINEL,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            FEATURED_SENTINEL => Some(SpecialFilter::Featured),
            _ => None,
        }
    }
}

/// The single active facet selection of a listing.
///
/// Selections are mutually exclusive; there is no way to combine two.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FilterSelection {
    #[default]
    All,
    Category(String),
    Series(String),
    Special(SpecialFilter),
}

impl FilterSelection {
    /// Parse the wire form (`kind`, `value`).
    ///
    /// Unknown kinds, a kind without a value, and unknown special values all
    /// fall back to [`FilterSelection::All`].
    pub fn from_parts(kind: Option<&str>, value: Option<&str>) -> Self {
        let value = value.filter(|value| !value.is_empty());
        match (kind, value) {
            (Some(KIND_CATEGORY), Some(value)) => FilterSelection::Category(value.to_string()),
            (Some(KIND_SERIES), Some(value)) => FilterSelection::Series(value.to_string()),
            (Some(KIND_SPECIAL), Some(value)) => SpecialFilter::parse(value)
                .map(FilterSelection::Special)
                .unwrap_or_default(),
            _ => FilterSelection::All,
        }
    }

    pub fn kind(&self) -> Option<&'static str> {
        match self {
            FilterSelection::All => None,
            FilterSelection::Category(_) => Some(KIND_CATEGORY),
            FilterSelection::Series(_) => Some(KIND_SERIES),
            FilterSelection::Special(_) => Some(KIND_SPECIAL),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            FilterSelection::All => None,
            FilterSelection::Category(value) | FilterSelection::Series(value) => Some(value),
            FilterSelection::Special(special) => Some(special.as_str()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FilterSelection::All)
    }

    pub fn matches(&self, article: &NormalizedArticle) -> bool {
        match self {
            FilterSelection::All => true,
            FilterSelection::Category(category) => article.category == *category,
            FilterSelection::Series(series) => article.series.as_deref() == Some(series.as_str()),
            FilterSelection::Special(SpecialFilter::Featured) => article.is_featured,
        }
    }
}

impl Serialize for FilterSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FilterSelection", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("value", &self.value())?;
        state.end()
    }
}

/// Featured articles first, then newest first; equal keys keep input order.
pub fn listing_order(a: &NormalizedArticle, b: &NormalizedArticle) -> Ordering {
    b.is_featured
        .cmp(&a.is_featured)
        .then_with(|| b.sort_timestamp.cmp(&a.sort_timestamp))
}

pub fn sort_featured_first(articles: &mut [NormalizedArticle]) {
    articles.sort_by(listing_order);
}

/// Order `articles` globally, then keep those matching `selection`.
pub fn apply<'a>(
    articles: &'a [NormalizedArticle],
    selection: &FilterSelection,
) -> Vec<&'a NormalizedArticle> {
    let mut ordered: Vec<&NormalizedArticle> = articles.iter().collect();
    ordered.sort_by(|a, b| listing_order(a, b));
    if !selection.is_all() {
        ordered.retain(|article| selection.matches(article));
    }
    ordered
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;
    use url::Url;

    use super::*;
    use crate::domain::articles::{Normalizer, RawArticle};
    use crate::domain::images::ImageUrlBuilder;

    fn normalize(records: serde_json::Value) -> Vec<NormalizedArticle> {
        let raw: Vec<RawArticle> = serde_json::from_value(records).expect("raw articles");
        let images = ImageUrlBuilder::new(
            Url::parse("https://cdn.example.io").expect("valid url"),
            "proj",
            "production",
        );
        Normalizer::new(&images, datetime!(2025-01-01 0:00 UTC)).normalize(&raw)
    }

    fn scenario() -> Vec<NormalizedArticle> {
        normalize(json!([
            { "slug": "a", "publishedAt": "2024-01-01", "isFeatured": false, "category": "X" },
            { "slug": "b", "publishedAt": "2024-06-01", "isFeatured": true, "category": "Y" },
            { "slug": "c", "publishedAt": "2024-03-01", "isFeatured": false, "category": "X" },
        ]))
    }

    fn slugs(articles: &[&NormalizedArticle]) -> Vec<String> {
        articles.iter().map(|article| article.slug.clone()).collect()
    }

    #[test]
    fn unfiltered_order_is_featured_then_newest() {
        let articles = scenario();
        let ordered = apply(&articles, &FilterSelection::All);
        assert_eq!(slugs(&ordered), vec!["b", "c", "a"]);
    }

    #[test]
    fn category_filter_keeps_relative_order() {
        let articles = scenario();
        let ordered = apply(&articles, &FilterSelection::Category("X".to_string()));
        assert_eq!(slugs(&ordered), vec!["c", "a"]);
        assert!(ordered.iter().all(|article| article.category == "X"));
    }

    #[test]
    fn category_match_is_case_sensitive() {
        let articles = scenario();
        let ordered = apply(&articles, &FilterSelection::Category("x".to_string()));
        assert!(ordered.is_empty());
    }

    #[test]
    fn featured_filter_returns_featured_subset() {
        let articles = normalize(json!([
            { "slug": "old-featured", "publishedAt": "2020-01-01", "isFeatured": true },
            { "slug": "plain", "publishedAt": "2024-01-01" },
            { "slug": "new-featured", "publishedAt": "2023-01-01", "isFeatured": true },
        ]));

        let ordered = apply(&articles, &FilterSelection::Special(SpecialFilter::Featured));
        assert_eq!(slugs(&ordered), vec!["new-featured", "old-featured"]);
    }

    #[test]
    fn series_filter_matches_exact_value() {
        let articles = normalize(json!([
            { "slug": "one", "series": "Systems" },
            { "slug": "two", "series": "Systems " },
            { "slug": "three" },
        ]));

        let ordered = apply(&articles, &FilterSelection::Series("Systems".to_string()));
        assert_eq!(slugs(&ordered), vec!["one"]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let articles = normalize(json!([
            { "slug": "first", "publishedAt": "2024-05-05" },
            { "slug": "second", "publishedAt": "2024-05-05" },
            { "slug": "third", "publishedAt": "2024-05-05", "isFeatured": true },
            { "slug": "fourth", "publishedAt": "2024-05-05" },
        ]));

        let ordered = apply(&articles, &FilterSelection::All);
        assert_eq!(slugs(&ordered), vec!["third", "first", "second", "fourth"]);
    }

    #[test]
    fn undated_articles_sort_as_fresh() {
        let articles = normalize(json!([
            { "slug": "dated", "publishedAt": "2024-12-31" },
            { "slug": "undated" },
        ]));

        let ordered = apply(&articles, &FilterSelection::All);
        assert_eq!(slugs(&ordered), vec!["undated", "dated"]);
    }

    #[test]
    fn adjacent_pairs_respect_tier_and_date_ordering() {
        let articles = normalize(json!([
            { "slug": "a", "publishedAt": "2021-01-01", "isFeatured": true },
            { "slug": "b", "publishedAt": "2024-01-01" },
            { "slug": "c", "publishedAt": "2022-01-01" },
            { "slug": "d", "publishedAt": "2023-01-01", "isFeatured": true },
            { "slug": "e" },
            { "slug": "f", "publishedAt": "2019-07-01" },
        ]));

        let mut sorted = articles.clone();
        sort_featured_first(&mut sorted);

        for pair in sorted.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.is_featured != b.is_featured {
                assert!(a.is_featured);
            } else {
                assert!(a.sort_timestamp >= b.sort_timestamp);
            }
        }

        let via_apply: Vec<NormalizedArticle> = apply(&articles, &FilterSelection::All)
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(via_apply, sorted);
    }

    #[test]
    fn from_parts_defaults_to_all_for_unrecognized_input() {
        assert_eq!(FilterSelection::from_parts(None, None), FilterSelection::All);
        assert_eq!(
            FilterSelection::from_parts(Some("author"), Some("me")),
            FilterSelection::All
        );
        assert_eq!(
            FilterSelection::from_parts(Some(KIND_CATEGORY), None),
            FilterSelection::All
        );
        assert_eq!(
            FilterSelection::from_parts(Some(KIND_CATEGORY), Some("")),
            FilterSelection::All
        );
        assert_eq!(
            FilterSelection::from_parts(Some(KIND_SPECIAL), Some("PINNED")),
            FilterSelection::All
        );
        assert_eq!(
            FilterSelection::from_parts(None, Some("X")),
            FilterSelection::All
        );
        assert_eq!(
            FilterSelection::from_parts(Some(KIND_SPECIAL), Some(FEATURED_SENTINEL)),
            FilterSelection::Special(SpecialFilter::Featured)
        );
    }

    #[test]
    fn unrecognized_selection_is_identity_not_empty() {
        let articles = scenario();
        let selection = FilterSelection::from_parts(Some("bogus"), Some("X"));
        assert_eq!(apply(&articles, &selection).len(), articles.len());
    }

    #[test]
    fn kind_and_value_are_both_present_or_both_absent() {
        for selection in [
            FilterSelection::All,
            FilterSelection::Category("X".to_string()),
            FilterSelection::Series("S".to_string()),
            FilterSelection::Special(SpecialFilter::Featured),
        ] {
            assert_eq!(selection.kind().is_none(), selection.value().is_none());
            let round_trip = FilterSelection::from_parts(selection.kind(), selection.value());
            assert_eq!(round_trip, selection);
        }
    }

    #[test]
    fn serializes_wire_form() {
        let value = serde_json::to_value(FilterSelection::Category("X".to_string()))
            .expect("serialize");
        assert_eq!(value, json!({ "kind": "category", "value": "X" }));

        let value = serde_json::to_value(FilterSelection::All).expect("serialize");
        assert_eq!(value, json!({ "kind": null, "value": null }));
    }
}
