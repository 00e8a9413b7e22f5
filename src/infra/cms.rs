//! HTTP client for the headless CMS query endpoint.
//!
//! Requests take the form `GET {api_base}/data/query/{dataset}?query=...`
//! with every named parameter sent as `$name=<json>`. Responses are wrapped
//! in a `{ "result": [...] }` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::content::{ContentError, ContentSource, QueryParams};
use crate::domain::articles::RawArticle;

use super::error::InfraError;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    result: Option<Vec<Value>>,
}

#[derive(Clone, Debug)]
pub struct CmsClient {
    client: Client,
    base: Url,
    dataset: String,
    token: Option<String>,
}

impl CmsClient {
    pub fn new(
        api_base: Url,
        dataset: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        if api_base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "content api base `{api_base}` cannot carry a path"
            )));
        }

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            base: api_base,
            dataset: dataset.into(),
            token: token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("folio/", env!("CARGO_PKG_VERSION"))
    }

    pub fn query_url(&self, query: &str, params: &QueryParams) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["data", "query", self.dataset.as_str()]);
        }

        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }
        url
    }

    async fn handle(response: Response) -> Result<Vec<RawArticle>, ContentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let envelope: QueryEnvelope = response.json().await.map_err(ContentError::decode)?;
        let records = envelope.result.unwrap_or_default();
        let total = records.len();

        let articles: Vec<RawArticle> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(article) => Some(article),
                Err(err) => {
                    warn!(
                        target = "folio::content::cms",
                        index,
                        error = %err,
                        "skipping content record that is not an article object"
                    );
                    None
                }
            })
            .collect();

        debug!(
            target = "folio::content::cms",
            received = total,
            accepted = articles.len(),
            "content query answered"
        );
        Ok(articles)
    }
}

#[async_trait]
impl ContentSource for CmsClient {
    async fn fetch(
        &self,
        query: &str,
        params: &QueryParams,
    ) -> Result<Vec<RawArticle>, ContentError> {
        let url = self.query_url(query, params);
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ContentError::transport)?;
        Self::handle(response).await
    }
}
