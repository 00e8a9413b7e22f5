use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    application::{
        error::AppError,
        pagination::{ListingQuery, ListingState},
        sitemap,
        writing::{LiveWriting, WritingIndex},
    },
    domain::{articles::NormalizedArticle, error::DomainError},
};

use super::middleware::{log_responses, set_request_context};

pub const MAX_SEARCH_TERM_CHARS: usize = 200;

#[derive(Clone)]
pub struct HttpState {
    pub writing: Arc<LiveWriting>,
    pub public_site_url: Arc<str>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/writing", get(writing_index))
        .route("/api/writing/search", get(writing_search))
        .route("/api/writing/{slug}", get(writing_detail))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/robots.txt", get(robots_txt))
        .route("/_health", get(health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn writing_index(
    State(state): State<HttpState>,
    Query(query): Query<ListingQuery>,
) -> Json<WritingIndex> {
    let collection = state.writing.current().await;
    Json(collection.index(&ListingState::from_query(&query)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResults {
    query: String,
    total_count: usize,
    items: Vec<NormalizedArticle>,
}

async fn writing_search(
    State(state): State<HttpState>,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    if q.chars().count() > MAX_SEARCH_TERM_CHARS {
        return Err(DomainError::validation(format!(
            "search term exceeds {MAX_SEARCH_TERM_CHARS} characters"
        ))
        .into());
    }

    let collection = state.writing.current().await;
    let items: Vec<NormalizedArticle> = collection.search(&q).into_iter().cloned().collect();
    Ok(Json(SearchResults {
        query: q.trim().to_string(),
        total_count: items.len(),
        items,
    }))
}

async fn writing_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<NormalizedArticle>, AppError> {
    let collection = state.writing.current().await;
    collection
        .find(&slug)
        .cloned()
        .map(Json)
        .ok_or_else(|| DomainError::not_found("article").into())
}

async fn sitemap_xml(State(state): State<HttpState>) -> Response {
    let collection = state.writing.current().await;
    text_response(
        sitemap::sitemap_xml(&state.public_site_url, collection.articles()),
        "application/xml",
    )
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    text_response(
        sitemap::robots_txt(&state.public_site_url),
        "text/plain; charset=utf-8",
    )
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback() -> AppError {
    AppError::NotFound
}

fn text_response(body: String, content_type: &'static str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
