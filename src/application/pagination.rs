//! Offset pagination over an already-ordered listing, and the serializable
//! listing state (filter selection plus page number) that drives it.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::domain::listing::FilterSelection;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(9).unwrap();

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
}

/// Slice page `page` (1-based) out of `items`.
///
/// `total_pages` is never below 1, so an empty listing is "page 1 of 1".
/// Pages past the end yield no items; a `page` of 0 is read as 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: NonZeroUsize) -> PageSlice<T> {
    let size = page_size.get();
    let total_pages = items.len().div_ceil(size).max(1);

    let start = page.max(1).saturating_sub(1).saturating_mul(size);
    let slice = if start >= items.len() {
        &[][..]
    } else {
        let end = start.saturating_add(size).min(items.len());
        &items[start..end]
    };

    PageSlice {
        items: slice.to_vec(),
        total_pages,
    }
}

/// Query-string form of [`ListingState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    pub kind: Option<String>,
    pub value: Option<String>,
    pub page: Option<usize>,
}

/// Filter selection plus current page of a listing.
///
/// Changing the selection always returns to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingState {
    selection: FilterSelection,
    page: usize,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            selection: FilterSelection::All,
            page: 1,
        }
    }
}

impl ListingState {
    pub fn new(selection: FilterSelection, page: usize) -> Self {
        Self {
            selection,
            page: page.max(1),
        }
    }

    pub fn from_query(query: &ListingQuery) -> Self {
        let selection = FilterSelection::from_parts(query.kind.as_deref(), query.value.as_deref());
        Self::new(selection, query.page.unwrap_or(1))
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn with_selection(self, selection: FilterSelection) -> Self {
        Self { selection, page: 1 }
    }

    pub fn with_page(self, page: usize) -> Self {
        Self {
            page: page.max(1),
            ..self
        }
    }

    pub fn to_query(&self) -> ListingQuery {
        ListingQuery {
            kind: self.selection.kind().map(str::to_string),
            value: self.selection.value().map(str::to_string),
            page: (self.page > 1).then_some(self.page),
        }
    }

    /// URL-encoded query string; empty for the default state.
    pub fn query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let (Some(kind), Some(value)) = (self.selection.kind(), self.selection.value()) {
            serializer.append_pair("kind", kind);
            serializer.append_pair("value", value);
        }
        if self.page > 1 {
            serializer.append_pair("page", &self.page.to_string());
        }
        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::listing::SpecialFilter;

    fn size(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).expect("non-zero page size")
    }

    #[test]
    fn default_page_size_is_nine() {
        assert_eq!(DEFAULT_PAGE_SIZE.get(), 9);
    }

    #[test]
    fn empty_list_is_one_empty_page() {
        let page = paginate::<u32>(&[], 1, DEFAULT_PAGE_SIZE);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn total_pages_rounds_up() {
        let items: Vec<u32> = (0..19).collect();
        assert_eq!(paginate(&items, 1, size(9)).total_pages, 3);
        assert_eq!(paginate(&items[..18], 1, size(9)).total_pages, 2);
        assert_eq!(paginate(&items[..1], 1, size(9)).total_pages, 1);
    }

    #[test]
    fn last_page_is_partial() {
        let items: Vec<u32> = (0..19).collect();
        let page = paginate(&items, 3, size(9));
        assert_eq!(page.items, vec![18]);
    }

    #[test]
    fn out_of_range_page_is_empty_not_error() {
        let items: Vec<u32> = (0..5).collect();
        let page = paginate(&items, 4, size(2));
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 3);

        let far = paginate(&items, usize::MAX, size(2));
        assert!(far.items.is_empty());
    }

    #[test]
    fn page_zero_reads_as_first_page() {
        let items: Vec<u32> = (0..5).collect();
        assert_eq!(paginate(&items, 0, size(2)).items, vec![0, 1]);
    }

    #[test]
    fn concatenated_pages_reconstruct_the_list() {
        for len in [0usize, 1, 8, 9, 10, 27, 31] {
            let items: Vec<usize> = (0..len).collect();
            for page_size in [1usize, 2, 9, 50] {
                let first = paginate(&items, 1, size(page_size));
                let rebuilt: Vec<usize> = (1..=first.total_pages)
                    .flat_map(|page| paginate(&items, page, size(page_size)).items)
                    .collect();
                assert_eq!(rebuilt, items, "len={len} size={page_size}");
            }
        }
    }

    #[test]
    fn changing_selection_resets_page() {
        let state = ListingState::default().with_page(4);
        assert_eq!(state.page(), 4);

        let state = state.with_selection(FilterSelection::Category("X".to_string()));
        assert_eq!(state.page(), 1);

        let state = state
            .with_page(2)
            .with_selection(FilterSelection::Special(SpecialFilter::Featured));
        assert_eq!(state.page(), 1);

        let state = state.with_page(3).with_selection(FilterSelection::All);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn query_round_trip() {
        let state = ListingState::new(FilterSelection::Series("Deep Dives & Notes".to_string()), 3);
        let query = state.to_query();
        assert_eq!(ListingState::from_query(&query), state);
        assert_eq!(
            state.query_string(),
            "kind=series&value=Deep+Dives+%26+Notes&page=3"
        );
        assert_eq!(ListingState::default().query_string(), "");
    }

    #[test]
    fn query_with_unknown_kind_is_unfiltered() {
        let query = ListingQuery {
            kind: Some("tag".to_string()),
            value: Some("rust".to_string()),
            page: Some(0),
        };
        let state = ListingState::from_query(&query);
        assert_eq!(state.selection(), &FilterSelection::All);
        assert_eq!(state.page(), 1);
    }
}
