//! Content source backed by a directory of Markdown files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::content::{ContentError, ContentSource, QueryParams};
use crate::domain::articles::{RawArticle, parse_published_at};
use crate::domain::frontmatter::parse_article;

/// Reads every `*.md` file in `root` (not recursive), ordered by file name.
///
/// The CMS query string does not apply here. Articles dated in the future
/// are held back until their time arrives; a missing slug falls back to the
/// file stem.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    now: Option<OffsetDateTime>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            now: None,
        }
    }

    /// Pin the instant used to hold back scheduled articles.
    pub fn with_now(mut self, now: OffsetDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn markdown_files(&self) -> Result<Vec<PathBuf>, ContentError> {
        let io_error = |source| ContentError::Io {
            path: self.root.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_error)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            let is_markdown = path.extension().is_some_and(|ext| ext == "md");
            if is_markdown && entry.file_type().await.map_err(io_error)?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_article(&self, path: &Path) -> Result<RawArticle, ContentError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ContentError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let (mut article, _body) =
            parse_article(&text).map_err(|source| ContentError::Frontmatter {
                path: path.to_path_buf(),
                source,
            })?;

        let has_slug = article
            .slug
            .as_deref()
            .is_some_and(|slug| !slug.trim().is_empty());
        if !has_slug {
            article.slug = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
        }
        Ok(article)
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    async fn fetch(
        &self,
        _query: &str,
        _params: &QueryParams,
    ) -> Result<Vec<RawArticle>, ContentError> {
        let now = self.now.unwrap_or_else(OffsetDateTime::now_utc);
        let files = self.markdown_files().await?;

        let mut articles = Vec::with_capacity(files.len());
        for path in &files {
            let article = self.read_article(path).await?;
            let scheduled = article
                .published_at
                .as_deref()
                .and_then(parse_published_at)
                .is_some_and(|published| published > now);
            if scheduled {
                debug!(
                    target = "folio::content::directory",
                    path = %path.display(),
                    "holding back scheduled article"
                );
                continue;
            }
            articles.push(article);
        }

        debug!(
            target = "folio::content::directory",
            root = %self.root.display(),
            files = files.len(),
            articles = articles.len(),
            "content directory read"
        );
        Ok(articles)
    }
}
