//! Solr-backed search index over its JSON HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{SearchDocument, SearchError, SearchIndex, SearchQuery, TEXT_FIELDS};

const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/', ' ',
];

/// Backslash-escapes Solr query syntax in a user-provided term.
pub fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the `q` parameter for a free-text term.
pub fn build_q(query: &SearchQuery) -> String {
    if query.is_match_all() {
        return "*:*".to_string();
    }
    let text = query.text.trim();
    if text.contains(':') {
        return text.to_string();
    }
    let term = escape_term(&text.to_lowercase());
    TEXT_FIELDS
        .iter()
        .map(|field| format!("{}:*{}*", field, term))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Query-string parameters for `/select`.
pub fn build_params(query: &SearchQuery) -> Result<Vec<(String, String)>, SearchError> {
    query.validate()?;

    let mut params = vec![("q".to_string(), build_q(query))];
    for (field, value) in &query.filters {
        params.push(("fq".to_string(), format!("{}:{}", field, escape_term(value))));
    }
    params.push(("fl".to_string(), "id".to_string()));
    params.push(("rows".to_string(), query.rows.to_string()));
    params.push(("start".to_string(), query.start.to_string()));
    params.push(("wt".to_string(), "json".to_string()));
    Ok(params)
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectBody,
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    docs: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

pub struct SolrIndex {
    client: reqwest::Client,
    base_url: String,
}

impl SolrIndex {
    /// `base_url` is the core URL, e.g. `http://localhost:8983/solr/orders`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn backoff() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(3)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchError::Status {
            code: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }

    async fn post_update(&self, body: &serde_json::Value) -> Result<(), SearchError> {
        let response = self
            .client
            .post(format!("{}/update", self.base_url))
            .query(&[("commit", "true")])
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn select(&self, params: &[(String, String)]) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .get(format!("{}/select", self.base_url))
            .query(params)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        let parsed: SelectResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(parsed.response.docs.into_iter().map(|doc| doc.id).collect())
    }

    async fn update_with_retry(&self, body: serde_json::Value) -> Result<(), SearchError> {
        (|| async { self.post_update(&body).await })
            .retry(Self::backoff())
            .when(SearchError::is_transient)
            .notify(|err: &SearchError, dur: Duration| {
                warn!(error = %err, retry_in_ms = dur.as_millis() as u64, "Solr update failed, retrying");
            })
            .await
    }
}

#[async_trait]
impl SearchIndex for SolrIndex {
    async fn upsert(&self, doc: &SearchDocument) -> Result<(), SearchError> {
        self.update_with_retry(json!({ "add": { "doc": doc } })).await?;
        debug!(id = %doc.id, "Indexed document in Solr");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        self.update_with_retry(json!({ "delete": { "id": id } })).await
    }

    async fn query(&self, query: &SearchQuery) -> Result<Vec<String>, SearchError> {
        let params = build_params(query)?;
        (|| async { self.select(&params).await })
            .retry(Self::backoff())
            .when(SearchError::is_transient)
            .await
    }
}
