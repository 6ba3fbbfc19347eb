use std::env;

use anyhow::Result;
use async_trait::async_trait;
use html2text::{self, render::text_renderer::TrivialDecorator};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct Hit {
    #[serde(rename = "objectID")]
    pub id: String,
    // Comment and poll-option hits come back with a null title
    pub title: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct Comment {
    pub id: i64,
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct Item {
    pub title: Option<String>,
    pub points: Option<i64>,
    #[serde(default)]
    pub children: Vec<Comment>,
}

/// The two read-only calls the app performs, kept behind a trait so the
/// event loop can be driven by a stub in tests.
#[async_trait]
pub(crate) trait SearchApi: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Hit>>;
    async fn item(&self, id: &str) -> Result<Item>;
}

pub(crate) struct AlgoliaService {
    client: reqwest::Client,
    search_url: String,
    items_url: String,
}

impl AlgoliaService {
    pub(crate) fn new() -> Self {
        let search_url =
            env::var("SPYHOPPER_SEARCH_URL").unwrap_or("https://hn.algolia.com/api/v1/search".to_string());
        let items_url =
            env::var("SPYHOPPER_ITEMS_URL").unwrap_or("https://hn.algolia.com/api/v1/items".to_string());
        return Self {
            client: reqwest::Client::new(),
            search_url,
            items_url,
        };
    }
}

// See: https://hn.algolia.com/api
#[async_trait]
impl SearchApi for AlgoliaService {
    async fn search(&self, query: &str) -> Result<Vec<Hit>> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("query", query)])
            .send()
            .await?
            .error_for_status()?;
        let body = response.json::<SearchResponse>().await?;
        Ok(body.hits)
    }

    async fn item(&self, id: &str) -> Result<Item> {
        let response = self
            .client
            .get(format!("{}/{}", self.items_url, id))
            .send()
            .await?
            .error_for_status()?;
        let item = response.json::<Item>().await?;
        Ok(item)
    }
}

// Comment bodies arrive as HTML fragments
pub(crate) fn flatten_text(text: &str) -> String {
    match std::panic::catch_unwind(|| {
        html2text::from_read_with_decorator(text.as_bytes(), usize::MAX, TrivialDecorator::new())
    }) {
        Ok(flat) => flat.trim().to_string(),
        Err(_) => text.to_string(),
    }
}
