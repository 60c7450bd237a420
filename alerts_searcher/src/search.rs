//! Alert lookups against the search index.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{Error, Result};

/// Field that must be present for a document to count as an alert.
pub const ALERT_SOURCE_FIELD: &str = "alert.source";
/// Epoch-millisecond field the search window applies to.
pub const TIMESTAMP_FIELD: &str = "message.timestamp";

/// Half-open time range `[from, to)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub from: i64,
    pub to: i64,
}

impl SearchWindow {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp < self.to
    }
}

/// A matched document, with its body kept exactly as the index returned it.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub source: Box<RawValue>,
    /// `message.timestamp` read from the body, when present and numeric
    pub timestamp: Option<i64>,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, source: Box<RawValue>) -> Self {
        let timestamp = source_timestamp(source.get());
        Self {
            id: id.into(),
            source,
            timestamp,
        }
    }

    pub fn source_str(&self) -> &str {
        self.source.get()
    }
}

#[async_trait]
pub trait AlertIndex: Send + Sync {
    /// Returns every alert whose timestamp falls inside `window`.
    async fn search(&self, window: SearchWindow) -> Result<Vec<SearchHit>>;
}

/// Elasticsearch over its HTTP search API.
#[derive(Debug, Clone)]
pub struct ElasticsearchIndex {
    client: Client,
    base_url: String,
    index: String,
    doc_type: String,
    page_size: usize,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize, Debug)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<Value>,
    hits: Vec<RawHit>,
}

#[derive(Deserialize, Debug)]
struct RawHit {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(rename = "_source")]
    source: Option<Box<RawValue>>,
}

impl ElasticsearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.base_url(), config))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, config: &SearchConfig) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: config.index.clone(),
            doc_type: config.doc_type.clone(),
            page_size: config.page_size,
        }
    }

    fn search_url(&self) -> String {
        if self.doc_type.is_empty() {
            format!("{}/{}/_search", self.base_url, self.index)
        } else {
            format!("{}/{}/{}/_search", self.base_url, self.index, self.doc_type)
        }
    }

    async fn fetch_page(&self, window: SearchWindow, from: usize) -> Result<SearchResponse> {
        let response = self
            .client
            .post(self.search_url())
            .query(&[("search_type", "dfs_query_then_fetch")])
            .header("Accept", "application/json")
            .json(&query_body(window, from, self.page_size))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SearchStatus { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl AlertIndex for ElasticsearchIndex {
    async fn search(&self, window: SearchWindow) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();
        let mut total = None;
        let mut offset = 0;

        loop {
            let page = self.fetch_page(window, offset).await?;
            if total.is_none() {
                total = page.hits.total.as_ref().and_then(total_hits);
                debug!(total_hits = ?total, "search returned");
            }

            let fetched = page.hits.hits.len();
            offset += fetched;
            hits.extend(page.hits.hits.into_iter().filter_map(|hit| match hit.source {
                Some(source) => Some(SearchHit::new(hit.id, source)),
                None => {
                    debug!(id = %hit.id, "hit has no _source, skipping");
                    None
                }
            }));

            if fetched < self.page_size || total.is_some_and(|t| offset as u64 >= t) {
                break;
            }
        }

        Ok(hits)
    }
}

/// Bool query matching alerts in the window, lower bound inclusive.
pub fn query_body(window: SearchWindow, from: usize, size: usize) -> Value {
    json!({
        "query": {
            "bool": {
                "must": [
                    { "wildcard": { ALERT_SOURCE_FIELD: "*" } },
                    { "range": { TIMESTAMP_FIELD: { "gte": window.from, "lt": window.to } } }
                ]
            }
        },
        "_source": true,
        "from": from,
        "size": size
    })
}

// Accepts both nested `{"message":{"timestamp":..}}` and a literal dotted key
fn source_timestamp(source: &str) -> Option<i64> {
    let doc: Value = serde_json::from_str(source).ok()?;
    let value = doc
        .pointer("/message/timestamp")
        .or_else(|| doc.get(TIMESTAMP_FIELD))?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

// Older clusters report a bare number, 7.x+ an object with "value"
fn total_hits(total: &Value) -> Option<u64> {
    total
        .as_u64()
        .or_else(|| total.get("value").and_then(Value::as_u64))
}
