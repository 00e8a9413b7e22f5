//! Static export of the writing index.
//!
//! Layout under the output directory:
//!
//! ```text
//! writing/page/{n}.json                    unfiltered listing
//! writing/{kind}/{value}/page/{n}.json     one tree per facet value
//! writing/articles/{slug}.json             addressable articles
//! sitemap.xml
//! robots.txt
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::application::pagination::ListingState;
use crate::application::sitemap::{robots_txt, sitemap_xml};
use crate::application::writing::WritingCollection;
use crate::domain::listing::{FilterSelection, SpecialFilter};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize `{path}`: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub listings: usize,
    pub listing_pages: usize,
    pub articles: usize,
    pub files: usize,
}

pub async fn export_site(
    collection: &WritingCollection,
    public_site_url: &str,
    out_dir: &Path,
) -> Result<ExportSummary, ExportError> {
    let mut exporter = Exporter {
        root: out_dir.join("writing"),
        summary: ExportSummary::default(),
    };

    for selection in listing_selections(collection) {
        exporter.listing(collection, selection).await?;
    }

    for article in collection
        .articles()
        .iter()
        .filter(|article| !article.id.is_positional())
    {
        let path = exporter
            .root
            .join("articles")
            .join(format!("{}.json", path_segment(&article.slug)));
        exporter.write_json(&path, article).await?;
        exporter.summary.articles += 1;
    }

    exporter
        .write_text(
            &out_dir.join("sitemap.xml"),
            &sitemap_xml(public_site_url, collection.articles()),
        )
        .await?;
    exporter
        .write_text(&out_dir.join("robots.txt"), &robots_txt(public_site_url))
        .await?;

    let summary = exporter.summary;
    info!(
        target = "folio::export",
        out_dir = %out_dir.display(),
        listings = summary.listings,
        listing_pages = summary.listing_pages,
        articles = summary.articles,
        files = summary.files,
        "static export complete"
    );
    Ok(summary)
}

/// The unfiltered listing followed by every facet value.
fn listing_selections(collection: &WritingCollection) -> Vec<FilterSelection> {
    let facets = collection.facets();
    let mut selections = vec![
        FilterSelection::All,
        FilterSelection::Special(SpecialFilter::Featured),
    ];
    selections.extend(facets.categories.iter().cloned().map(FilterSelection::Category));
    selections.extend(facets.series.iter().cloned().map(FilterSelection::Series));
    selections
}

/// Percent-encodes one path component; dot-only values are escaped so they
/// cannot walk out of the export tree.
fn path_segment(value: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    if encoded.is_empty() || encoded.chars().all(|ch| ch == '.') {
        encoded.replace('.', "%2E") + "_"
    } else {
        encoded
    }
}

struct Exporter {
    root: PathBuf,
    summary: ExportSummary,
}

impl Exporter {
    async fn listing(
        &mut self,
        collection: &WritingCollection,
        selection: FilterSelection,
    ) -> Result<(), ExportError> {
        let dir = match (selection.kind(), selection.value()) {
            (Some(kind), Some(value)) => self.root.join(kind).join(path_segment(value)),
            _ => self.root.clone(),
        };

        let first = ListingState::new(selection, 1);
        let total_pages = collection.index(&first).total_pages;
        for page in 1..=total_pages {
            let index = collection.index(&first.clone().with_page(page));
            let path = dir.join("page").join(format!("{page}.json"));
            self.write_json(&path, &index).await?;
        }

        self.summary.listings += 1;
        self.summary.listing_pages += total_pages;
        Ok(())
    }

    async fn write_json<T: Serialize>(
        &mut self,
        path: &Path,
        value: &T,
    ) -> Result<(), ExportError> {
        let mut body = serde_json::to_vec_pretty(value).map_err(|source| ExportError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        body.push(b'\n');
        self.write_bytes(path, &body).await
    }

    async fn write_text(&mut self, path: &Path, body: &str) -> Result<(), ExportError> {
        self.write_bytes(path, body.as_bytes()).await
    }

    async fn write_bytes(&mut self, path: &Path, body: &[u8]) -> Result<(), ExportError> {
        let io_error = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(path, body).await.map_err(io_error)?;

        debug!(target = "folio::export", path = %path.display(), bytes = body.len(), "wrote file");
        self.summary.files += 1;
        Ok(())
    }
}
