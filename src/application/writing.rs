//! The "Writing" listing pipeline: fetch, normalize, order, facet, paginate.
//!
//! [`WritingService`] talks to the content source once per load and produces
//! an immutable [`WritingCollection`]. Facet and page changes only re-run
//! filtering and pagination on that collection; they never refetch.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use metrics::{counter, gauge};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::application::content::{
    ContentError, ContentSource, DEFAULT_ARTICLES_QUERY, QueryParams,
};
use crate::application::pagination::{DEFAULT_PAGE_SIZE, ListingState, PageSlice, paginate};
use crate::application::retry::{RetryPolicy, retry_with_backoff};
use crate::domain::articles::{NormalizedArticle, Normalizer, RawArticle};
use crate::domain::facets::{Facets, compute_facets};
use crate::domain::images::{DEFAULT_IMAGE_WIDTH, ImageUrlBuilder};
use crate::domain::listing::{FilterSelection, SpecialFilter, apply, sort_featured_first};

const ALL_LABEL: &str = "All";
const FEATURED_LABEL: &str = "Featured";

#[derive(Debug, Clone)]
pub struct WritingOptions {
    pub query: String,
    pub params: QueryParams,
    pub page_size: NonZeroUsize,
    pub image_width: u32,
    pub retry: RetryPolicy,
}

impl Default for WritingOptions {
    fn default() -> Self {
        Self {
            query: DEFAULT_ARTICLES_QUERY.to_string(),
            params: QueryParams::new(),
            page_size: DEFAULT_PAGE_SIZE,
            image_width: DEFAULT_IMAGE_WIDTH,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct WritingService {
    source: Arc<dyn ContentSource>,
    images: ImageUrlBuilder,
    options: WritingOptions,
}

impl WritingService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        images: ImageUrlBuilder,
        options: WritingOptions,
    ) -> Self {
        Self {
            source,
            images,
            options,
        }
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.options.page_size
    }

    /// Fetch through the retry policy and build a collection.
    pub async fn fetch_collection(&self) -> Result<WritingCollection, ContentError> {
        counter!("folio_content_fetch_total").increment(1);

        let raw = retry_with_backoff("content fetch", self.options.retry, || {
            self.source
                .fetch(&self.options.query, &self.options.params)
        })
        .await
        .inspect_err(|_| counter!("folio_content_fetch_failures_total").increment(1))?;

        Ok(self.build(&raw, OffsetDateTime::now_utc()))
    }

    /// Like [`Self::fetch_collection`], but a source that stays unavailable
    /// yields an empty collection instead of an error.
    pub async fn load(&self) -> WritingCollection {
        match self.fetch_collection().await {
            Ok(collection) => collection,
            Err(err) => {
                warn!(
                    target = "folio::writing",
                    error = %err,
                    "content source unavailable; using an empty writing collection"
                );
                WritingCollection::empty(self.options.page_size)
            }
        }
    }

    pub fn build(&self, raw: &[RawArticle], now: OffsetDateTime) -> WritingCollection {
        let articles = Normalizer::new(&self.images, now)
            .with_image_width(self.options.image_width)
            .normalize(raw);

        let positional = articles
            .iter()
            .filter(|article| article.id.is_positional())
            .count();
        if positional > 0 {
            counter!("folio_positional_ids_total")
                .increment(u64::try_from(positional).unwrap_or(u64::MAX));
            warn!(
                target = "folio::writing",
                positional,
                "articles without a slug were given positional ids"
            );
        }

        let collection = WritingCollection::new(articles, self.options.page_size);
        gauge!("folio_writing_articles").set(collection.len() as f64);
        info!(
            target = "folio::writing",
            articles = collection.len(),
            categories = collection.facets().categories.len(),
            series = collection.facets().series.len(),
            featured = collection.facets().featured_count,
            "writing collection built"
        );
        collection
    }
}

/// Normalized articles in listing order, with their facets.
#[derive(Debug, Clone)]
pub struct WritingCollection {
    articles: Vec<NormalizedArticle>,
    facets: Facets,
    page_size: NonZeroUsize,
}

impl WritingCollection {
    pub fn new(mut articles: Vec<NormalizedArticle>, page_size: NonZeroUsize) -> Self {
        sort_featured_first(&mut articles);
        let facets = compute_facets(&articles);
        Self {
            articles,
            facets,
            page_size,
        }
    }

    pub fn empty(page_size: NonZeroUsize) -> Self {
        Self::new(Vec::new(), page_size)
    }

    pub fn articles(&self) -> &[NormalizedArticle] {
        &self.articles
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn index(&self, state: &ListingState) -> WritingIndex {
        let filtered = apply(&self.articles, state.selection());
        let PageSlice { items, total_pages } = paginate(&filtered, state.page(), self.page_size);
        let page = state.page();

        WritingIndex {
            is_empty: items.is_empty(),
            items: items.into_iter().cloned().collect(),
            selection: state.selection().clone(),
            page,
            page_size: self.page_size.get(),
            total_pages,
            total_count: filtered.len(),
            prev_page: (page > 1).then(|| (page - 1).min(total_pages)),
            next_page: (page < total_pages).then_some(page + 1),
            facets: self.facet_view(state),
        }
    }

    /// Look up an article by slug. Positional ids are not addressable.
    pub fn find(&self, slug: &str) -> Option<&NormalizedArticle> {
        if slug.is_empty() {
            return None;
        }
        self.articles
            .iter()
            .find(|article| !article.id.is_positional() && article.slug == slug)
    }

    /// Case-insensitive substring match over title, excerpt, and tags, in
    /// listing order. A blank term matches nothing.
    pub fn search(&self, term: &str) -> Vec<&NormalizedArticle> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.articles
            .iter()
            .filter(|article| matches_term(article, &needle))
            .collect()
    }

    fn facet_view(&self, state: &ListingState) -> FacetView {
        let entry = |label: &str, selection: FilterSelection| {
            let count = self.facets.count_for(&selection);
            let active = *state.selection() == selection;
            let query = state.clone().with_selection(selection.clone()).query_string();
            FacetEntry {
                label: label.to_string(),
                selection,
                count,
                active,
                query,
            }
        };

        FacetView {
            all: entry(ALL_LABEL, FilterSelection::All),
            featured: entry(
                FEATURED_LABEL,
                FilterSelection::Special(SpecialFilter::Featured),
            ),
            categories: self
                .facets
                .categories
                .iter()
                .map(|category| {
                    entry(
                        category.as_str(),
                        FilterSelection::Category(category.clone()),
                    )
                })
                .collect(),
            series: self
                .facets
                .series
                .iter()
                .map(|series| entry(series.as_str(), FilterSelection::Series(series.clone())))
                .collect(),
        }
    }
}

fn matches_term(article: &NormalizedArticle, needle: &str) -> bool {
    article.title.to_lowercase().contains(needle)
        || article
            .excerpt
            .as_deref()
            .is_some_and(|excerpt| excerpt.to_lowercase().contains(needle))
        || article
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

/// One page of the writing listing, ready for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingIndex {
    pub items: Vec<NormalizedArticle>,
    pub selection: FilterSelection,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub prev_page: Option<usize>,
    pub next_page: Option<usize>,
    pub is_empty: bool,
    pub facets: FacetView,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetView {
    pub all: FacetEntry,
    pub featured: FacetEntry,
    pub categories: Vec<FacetEntry>,
    pub series: Vec<FacetEntry>,
}

/// A selectable facet. `query` targets page 1 of that selection.
#[derive(Debug, Clone, Serialize)]
pub struct FacetEntry {
    pub label: String,
    pub selection: FilterSelection,
    pub count: usize,
    pub active: bool,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { articles: usize },
    Stale,
    Failed,
}

struct LiveState {
    generation: u64,
    collection: Arc<WritingCollection>,
}

/// The collection currently served, swapped atomically on refresh.
///
/// Each refresh is stamped with a generation when it starts. A result whose
/// generation is not newer than the installed one arrived late and is
/// dropped. A failed refresh keeps the previous collection.
pub struct LiveWriting {
    service: Arc<WritingService>,
    state: RwLock<LiveState>,
    issued: AtomicU64,
}

impl LiveWriting {
    pub fn new(service: Arc<WritingService>) -> Self {
        let collection = WritingCollection::empty(service.page_size());
        Self::with_collection(service, collection)
    }

    pub fn with_collection(service: Arc<WritingService>, collection: WritingCollection) -> Self {
        Self {
            service,
            state: RwLock::new(LiveState {
                generation: 0,
                collection: Arc::new(collection),
            }),
            issued: AtomicU64::new(0),
        }
    }

    pub async fn current(&self) -> Arc<WritingCollection> {
        Arc::clone(&self.state.read().await.collection)
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        match self.service.fetch_collection().await {
            Ok(collection) => self.install(generation, collection).await,
            Err(err) => {
                warn!(
                    target = "folio::writing",
                    generation,
                    error = %err,
                    "writing refresh failed; keeping previous collection"
                );
                RefreshOutcome::Failed
            }
        }
    }

    async fn install(&self, generation: u64, collection: WritingCollection) -> RefreshOutcome {
        let mut state = self.state.write().await;
        if generation <= state.generation {
            debug!(
                target = "folio::writing",
                generation,
                installed = state.generation,
                "discarding late writing refresh"
            );
            return RefreshOutcome::Stale;
        }

        let articles = collection.len();
        *state = LiveState {
            generation,
            collection: Arc::new(collection),
        };
        RefreshOutcome::Applied { articles }
    }
}
