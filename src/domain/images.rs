//! Deterministic CDN URL construction for CMS image references.
//!
//! References arrive either as an asset id of the form
//! `image-<id>-<width>x<height>-<ext>` or as an already-resolved asset URL.
//! Building a URL is pure string work against a fixed CDN base; nothing here
//! touches the network.

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_IMAGE_WIDTH: u32 = 800;

const ASSET_PREFIX: &str = "image-";

/// Image field as stored on an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetRef>,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ImageRef {
    pub fn from_reference(reference: impl Into<String>) -> Self {
        Self {
            asset: Some(AssetRef {
                reference: Some(reference.into()),
                url: None,
            }),
            alt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrlBuilder {
    cdn_base: Url,
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(cdn_base: Url, project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        let mut cdn_base = cdn_base;
        if !cdn_base.path().ends_with('/') {
            let path = format!("{}/", cdn_base.path());
            cdn_base.set_path(&path);
        }
        Self {
            cdn_base,
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    pub fn image<'a>(&'a self, image: &'a ImageRef) -> ImageUrl<'a> {
        ImageUrl {
            builder: self,
            image,
            width: None,
        }
    }

    fn asset_path(&self, reference: &str) -> Option<String> {
        let rest = reference.strip_prefix(ASSET_PREFIX)?;
        let mut parts = rest.rsplitn(3, '-');
        let extension = parts.next()?;
        let dimensions = parts.next()?;
        let id = parts.next()?;

        if id.is_empty() || extension.is_empty() || !is_dimension_pair(dimensions) {
            return None;
        }

        Some(format!(
            "images/{}/{}/{id}-{dimensions}.{extension}",
            self.project_id, self.dataset
        ))
    }
}

/// A pending image URL; chain [`ImageUrl::width`] then call [`ImageUrl::url`].
#[derive(Debug, Clone, Copy)]
pub struct ImageUrl<'a> {
    builder: &'a ImageUrlBuilder,
    image: &'a ImageRef,
    width: Option<u32>,
}

impl ImageUrl<'_> {
    pub fn width(mut self, px: u32) -> Self {
        self.width = Some(px);
        self
    }

    /// Returns `None` when the reference cannot be resolved to an asset.
    pub fn url(&self) -> Option<String> {
        let asset = self.image.asset.as_ref()?;

        let mut url = match (asset.url.as_deref(), asset.reference.as_deref()) {
            (Some(direct), _) => Url::parse(direct).ok()?,
            (None, Some(reference)) => {
                let path = self.builder.asset_path(reference)?;
                self.builder.cdn_base.join(&path).ok()?
            }
            (None, None) => return None,
        };

        if let Some(width) = self.width {
            url.query_pairs_mut().append_pair("w", &width.to_string());
        }

        Some(url.into())
    }
}

fn is_dimension_pair(value: &str) -> bool {
    match value.split_once('x') {
        Some((width, height)) => {
            !width.is_empty()
                && !height.is_empty()
                && width.bytes().all(|b| b.is_ascii_digit())
                && height.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
