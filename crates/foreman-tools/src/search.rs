//! `web_search` tool and the Brave-shaped HTTP search client.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use async_trait::async_trait;
use foreman_core::tools::ToolResult;

use crate::errors::ToolError;
use crate::request::WebSearchArgs;
use crate::traits::{SearchClient, WebHit};

/// Queries longer than this are truncated before hitting the API.
const MAX_QUERY_CHARS: usize = 400;
const DEFAULT_COUNT: u32 = 5;
const MAX_COUNT: u32 = 20;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Run `web_search` against the injected client.
pub async fn execute(
    client: &dyn SearchClient,
    args: &WebSearchArgs,
) -> Result<ToolResult, ToolError> {
    let query = foreman_core::text::truncate_chars(&args.query, MAX_QUERY_CHARS);
    let count = args.count.unwrap_or(DEFAULT_COUNT).min(MAX_COUNT);
    let hits = client.search(&query, count).await?;

    let summary = format!("Found {} results for \"{}\"", hits.len(), query);
    Ok(ToolResult::ok(json!({ "results": hits }), summary))
}

/// [`SearchClient`] backed by the Brave web search API.
pub struct BraveSearchClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl BraveSearchClient {
    /// Build a client for the given API key and base URL.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ToolError::internal)?;
        Ok(Self { http, api_key: api_key.into(), base_url: base_url.into() })
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: BraveWeb,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl SearchClient for BraveSearchClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, count: u32) -> Result<Vec<WebHit>, ToolError> {
        let url = format!("{}/res/v1/web/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await
            .map_err(ToolError::internal)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::internal(format!("search api returned {status}")));
        }

        let body: BraveResponse = response.json().await.map_err(ToolError::internal)?;
        debug!(results = body.web.results.len(), "web search completed");
        Ok(body
            .web
            .results
            .into_iter()
            .map(|r| WebHit { title: r.title, url: r.url, description: r.description })
            .collect())
    }
}
