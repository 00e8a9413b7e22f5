//! Category and series facets with per-value counts.
//!
//! Values are kept in ordinal key order and recomputed from the whole
//! collection whenever it changes.

use std::collections::BTreeMap;

use serde::Serialize;

use super::articles::NormalizedArticle;
use super::listing::{FilterSelection, SpecialFilter};

/// Facet values and tallies derived from a normalized collection.
///
/// Always rebuilt from scratch with [`compute_facets`]; never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub categories: Vec<String>,
    pub series: Vec<String>,
    pub category_counts: BTreeMap<String, usize>,
    pub series_counts: BTreeMap<String, usize>,
    pub featured_count: usize,
    pub total_count: usize,
}

impl Facets {
    pub fn count_for(&self, selection: &FilterSelection) -> usize {
        match selection {
            FilterSelection::All => self.total_count,
            FilterSelection::Category(value) => {
                self.category_counts.get(value).copied().unwrap_or(0)
            }
            FilterSelection::Series(value) => self.series_counts.get(value).copied().unwrap_or(0),
            FilterSelection::Special(SpecialFilter::Featured) => self.featured_count,
        }
    }
}

/// Distinct values come back in ascending ordinal order.
pub fn compute_facets(articles: &[NormalizedArticle]) -> Facets {
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut series_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut featured_count = 0;

    for article in articles {
        if !article.category.is_empty() {
            *category_counts.entry(article.category.clone()).or_default() += 1;
        }
        if let Some(series) = article.series.as_ref().filter(|series| !series.is_empty()) {
            *series_counts.entry(series.clone()).or_default() += 1;
        }
        if article.is_featured {
            featured_count += 1;
        }
    }

    Facets {
        categories: category_counts.keys().cloned().collect(),
        series: series_counts.keys().cloned().collect(),
        category_counts,
        series_counts,
        featured_count,
        total_count: articles.len(),
    }
}
