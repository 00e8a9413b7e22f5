use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Value, json};
use time::macros::datetime;
use tower::ServiceExt;
use url::Url;

use folio::application::content::{ContentError, ContentSource, QueryParams};
use folio::application::writing::{LiveWriting, WritingOptions, WritingService};
use folio::domain::articles::RawArticle;
use folio::domain::images::ImageUrlBuilder;
use folio::infra::http::{HttpState, MAX_SEARCH_TERM_CHARS, REQUEST_ID_HEADER, build_router};

struct NoContent;

#[async_trait]
impl ContentSource for NoContent {
    async fn fetch(
        &self,
        _query: &str,
        _params: &QueryParams,
    ) -> Result<Vec<RawArticle>, ContentError> {
        Ok(Vec::new())
    }
}

fn router() -> Router {
    let images = ImageUrlBuilder::new(
        Url::parse("https://cdn.example.io/").expect("url"),
        "proj",
        "production",
    );
    let service = Arc::new(WritingService::new(
        Arc::new(NoContent),
        images,
        WritingOptions::default(),
    ));

    let raw: Vec<RawArticle> = serde_json::from_value(json!([
        {
            "title": "Alpha",
            "slug": "a",
            "publishedAt": "2024-01-01",
            "isFeatured": false,
            "category": "X",
            "mainImage": { "asset": { "_ref": "image-abc123-1200x800-jpg" } }
        },
        {
            "title": "Bravo",
            "slug": "b",
            "publishedAt": "2024-06-01",
            "isFeatured": true,
            "category": "Y"
        },
        {
            "title": "Charlie",
            "slug": "c",
            "publishedAt": "2024-03-01",
            "isFeatured": false,
            "category": "X",
            "series": "Deep Dives",
            "excerpt": "On backpressure"
        },
        { "title": "Slugless" }
    ]))
    .expect("raw articles");
    let collection = service.build(&raw, datetime!(2024-02-01 00:00 UTC));

    build_router(HttpState {
        writing: Arc::new(LiveWriting::with_collection(service, collection)),
        public_site_url: Arc::from("https://folio.example/"),
    })
}

async fn get(uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router()
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec();
    (status, headers, body)
}

async fn get_json(uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get(uri).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn slugs(index: &Value) -> Vec<String> {
    index["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|item| item["slug"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn index_lists_featured_first_then_newest() {
    let (status, index) = get_json("/api/writing").await;

    assert_eq!(status, StatusCode::OK);
    // the slugless article is undated, so it sorts at the injected clock
    assert_eq!(slugs(&index), vec!["b", "c", "", "a"]);
    assert_eq!(index["items"][2]["id"], "post-3");
    assert_eq!(index["page"], 1);
    assert_eq!(index["totalPages"], 1);
    assert_eq!(index["totalCount"], 4);
    assert_eq!(index["selection"]["kind"], Value::Null);
    assert_eq!(index["facets"]["featured"]["count"], 1);
}

#[tokio::test]
async fn index_applies_category_filter() {
    let (status, index) = get_json("/api/writing?kind=category&value=X").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(slugs(&index), vec!["c", "a"]);
    assert_eq!(index["selection"]["kind"], "category");
    assert_eq!(index["selection"]["value"], "X");

    let categories = index["facets"]["categories"].as_array().expect("categories");
    let x = categories
        .iter()
        .find(|entry| entry["label"] == "X")
        .expect("X facet");
    assert_eq!(x["active"], true);
    assert_eq!(x["count"], 2);
}

#[tokio::test]
async fn unknown_filter_kind_is_unfiltered() {
    let (_, index) = get_json("/api/writing?kind=tag&value=rust").await;
    assert_eq!(index["totalCount"], 4);
    assert_eq!(index["selection"]["kind"], Value::Null);
}

#[tokio::test]
async fn out_of_range_page_is_empty() {
    let (status, index) = get_json("/api/writing?page=7").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(index["isEmpty"], true);
    assert_eq!(index["totalPages"], 1);
}

#[tokio::test]
async fn featured_filter_uses_sentinel() {
    let (_, index) = get_json("/api/writing?kind=special&value=FEATURED").await;
    assert_eq!(slugs(&index), vec!["b"]);
}

#[tokio::test]
async fn detail_returns_article_with_image_url() {
    let (status, article) = get_json("/api/writing/a").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(article["title"], "Alpha");
    assert_eq!(article["displayDate"], "January 1, 2024");
    assert_eq!(
        article["imageUrl"],
        "https://cdn.example.io/images/proj/production/abc123-1200x800.jpg?w=800"
    );
}

#[tokio::test]
async fn detail_for_unknown_or_positional_slug_is_404() {
    let (status, _) = get_json("/api/writing/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json("/api/writing/post-3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_matches_excerpt() {
    let (status, results) = get_json("/api/writing/search?q=BACKPRESSURE").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["totalCount"], 1);
    assert_eq!(results["items"][0]["slug"], "c");
}

#[tokio::test]
async fn search_rejects_overlong_terms() {
    let term = "a".repeat(MAX_SEARCH_TERM_CHARS + 1);
    let (status, _) = get_json(&format!("/api/writing/search?q={term}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sitemap_and_robots_are_served() {
    let (status, headers, body) = get("/sitemap.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "application/xml");
    let xml = String::from_utf8(body).expect("utf8");
    assert!(xml.contains("<loc>https://folio.example/writing/c</loc>"));
    assert!(xml.contains("<loc>https://folio.example/evidence</loc>"));

    let (status, _, body) = get("/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        String::from_utf8(body)
            .expect("utf8")
            .contains("Sitemap: https://folio.example/sitemap.xml")
    );
}

#[tokio::test]
async fn health_and_request_id() {
    let (status, headers, _) = get("/_health").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(headers.contains_key(REQUEST_ID_HEADER));

    let response = router()
        .oneshot(
            Request::get("/_health")
                .header(REQUEST_ID_HEADER, "trace-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-123");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (status, _) = get_json("/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
