//! Secondary search projection of orders.
//!
//! The index stores a denormalized `SearchDocument` per order and answers
//! queries with order ids only. It is eventually consistent with the store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Order;

pub mod memory;
pub mod solr;

pub use memory::MemoryIndex;
pub use solr::SolrIndex;

/// Fields matched by a free-text term.
pub const TEXT_FIELDS: [&str; 5] = ["table", "status", "notes", "item_names", "branch_id"];

/// Fields accepted as equality filters.
pub const FILTER_FIELDS: [&str; 6] = ["business_id", "branch_id", "user_id", "table", "status", "item_ids"];

pub const DEFAULT_ROWS: usize = 100;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SearchError {
    #[error("Search transport error: {0}")]
    Transport(String),
    #[error("Search index returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("Search response could not be decoded: {0}")]
    Decode(String),
    #[error("Invalid search query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Transport(_) => true,
            SearchError::Status { code, .. } => *code >= 500 || *code == 429,
            SearchError::Decode(_) | SearchError::InvalidQuery(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub business_id: String,
    pub branch_id: String,
    pub user_id: String,
    pub table: String,
    pub status: String,
    pub total: f64,
    pub created_at: String,
    pub updated_at: String,
    pub item_ids: Vec<String>,
    pub item_names: Vec<String>,
    pub notes: String,
}

impl SearchDocument {
    /// Values of a field as indexed strings. Unknown fields have none.
    pub fn field_values(&self, field: &str) -> Vec<&str> {
        match field {
            "id" => vec![self.id.as_str()],
            "business_id" => vec![self.business_id.as_str()],
            "branch_id" => vec![self.branch_id.as_str()],
            "user_id" => vec![self.user_id.as_str()],
            "table" => vec![self.table.as_str()],
            "status" => vec![self.status.as_str()],
            "notes" => vec![self.notes.as_str()],
            "item_ids" => self.item_ids.iter().map(String::as_str).collect(),
            "item_names" => self.item_names.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&Order> for SearchDocument {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            business_id: order.business_id.clone(),
            branch_id: order.branch_id.clone(),
            user_id: order.user_id.clone(),
            table: order.table.clone(),
            status: order.status.to_string(),
            total: order.total.to_f64().unwrap_or_default(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            item_ids: order.items.iter().map(|line| line.item_id.clone()).collect(),
            item_names: order.items.iter().map(|line| line.name.clone()).collect(),
            notes: order.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Free-text term. Empty or `*:*` matches everything; `field:value` is
    /// passed through as a raw field query.
    pub text: String,
    pub filters: BTreeMap<String, String>,
    pub rows: usize,
    pub start: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: BTreeMap::new(),
            rows: DEFAULT_ROWS,
            start: 0,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn is_match_all(&self) -> bool {
        let text = self.text.trim();
        text.is_empty() || text == "*:*" || text == "*"
    }

    /// Rejects filters on fields the index does not expose.
    pub fn validate(&self) -> Result<(), SearchError> {
        match self.filters.keys().find(|field| !FILTER_FIELDS.contains(&field.as_str())) {
            Some(field) => Err(SearchError::InvalidQuery(format!("cannot filter on '{}'", field))),
            None => Ok(()),
        }
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Inserts or replaces the document with the same id.
    async fn upsert(&self, doc: &SearchDocument) -> Result<(), SearchError>;

    async fn delete(&self, id: &str) -> Result<(), SearchError>;

    /// Matching order ids, best match first.
    async fn query(&self, query: &SearchQuery) -> Result<Vec<String>, SearchError>;
}
