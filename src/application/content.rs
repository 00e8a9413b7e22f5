//! Content source abstraction consumed by the writing pipeline.

use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::articles::RawArticle;
use crate::domain::frontmatter::FrontmatterError;

/// Published articles (or scheduled ones whose time has come), projected onto
/// the fields the writing pipeline reads.
pub const DEFAULT_ARTICLES_QUERY: &str = r#"*[_type == "post" && defined(slug.current) && (!defined(publishedAt) || publishedAt <= now())] | order(publishedAt desc) {
  title,
  "slug": slug.current,
  publishedAt,
  excerpt,
  mainImage,
  isFeatured,
  "category": category->title,
  "series": series->title,
  tags
}"#;

/// Named query parameters, sent as JSON-encoded values.
pub type QueryParams = BTreeMap<String, Value>;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content transport error: {0}")]
    Transport(String),
    #[error("content source responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode content response: {0}")]
    Decode(String),
    #[error("failed to read content from `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid frontmatter in `{path}`: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
}

impl ContentError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Returns raw article records for a query, in whatever order the source
/// chooses.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(
        &self,
        query: &str,
        params: &QueryParams,
    ) -> Result<Vec<RawArticle>, ContentError>;
}
