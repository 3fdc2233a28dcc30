//! In-process inverted index.
//!
//! Every field value is indexed both whole and word by word, lower-cased.
//! Free-text terms match any indexed token of a text field by substring;
//! filters match a whole value exactly.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{SearchDocument, SearchError, SearchIndex, SearchQuery, FILTER_FIELDS, TEXT_FIELDS};

type Posting = (String, String);

#[derive(Default)]
struct Inner {
    docs: HashMap<String, SearchDocument>,
    postings: HashMap<Posting, BTreeSet<String>>,
}

impl Inner {
    fn tokens(doc: &SearchDocument) -> BTreeSet<Posting> {
        let mut tokens = BTreeSet::new();
        for field in TEXT_FIELDS.iter().chain(FILTER_FIELDS.iter()) {
            for value in doc.field_values(field) {
                let value = value.trim().to_lowercase();
                if value.is_empty() {
                    continue;
                }
                for word in value.split_whitespace() {
                    tokens.insert((field.to_string(), word.to_string()));
                }
                tokens.insert((field.to_string(), value));
            }
        }
        tokens
    }

    fn remove(&mut self, id: &str) {
        let Some(old) = self.docs.remove(id) else {
            return;
        };
        for posting in Self::tokens(&old) {
            if let Some(ids) = self.postings.get_mut(&posting) {
                ids.remove(id);
                if ids.is_empty() {
                    self.postings.remove(&posting);
                }
            }
        }
    }

    fn insert(&mut self, doc: SearchDocument) {
        self.remove(&doc.id);
        for posting in Self::tokens(&doc) {
            self.postings.entry(posting).or_default().insert(doc.id.clone());
        }
        self.docs.insert(doc.id.clone(), doc);
    }

    /// Ids with a token in one of `fields` containing `term`.
    fn substring_match(&self, fields: &[&str], term: &str) -> BTreeSet<String> {
        self.postings
            .iter()
            .filter(|((field, token), _)| fields.contains(&field.as_str()) && token.contains(term))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    fn exact_match(&self, field: &str, value: &str) -> BTreeSet<String> {
        self.postings
            .get(&(field.to_string(), value.trim().to_lowercase()))
            .cloned()
            .unwrap_or_default()
    }

    fn text_match(&self, text: &str) -> BTreeSet<String> {
        let text = text.trim().to_lowercase();
        match text.split_once(':') {
            Some((field, value)) => {
                let value = value.trim_matches('*');
                self.substring_match(&[field], value)
            }
            None => self.substring_match(&TEXT_FIELDS, &text),
        }
    }
}

#[derive(Default)]
pub struct MemoryIndex {
    inner: RwLock<Inner>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.docs.len()
    }

    #[cfg(test)]
    pub async fn document(&self, id: &str) -> Option<SearchDocument> {
        self.inner.read().await.docs.get(id).cloned()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn upsert(&self, doc: &SearchDocument) -> Result<(), SearchError> {
        self.inner.write().await.insert(doc.clone());
        debug!(id = %doc.id, "Indexed document");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        self.inner.write().await.remove(id);
        Ok(())
    }

    async fn query(&self, query: &SearchQuery) -> Result<Vec<String>, SearchError> {
        query.validate()?;
        let inner = self.inner.read().await;

        let mut ids: BTreeSet<String> = if query.is_match_all() {
            inner.docs.keys().cloned().collect()
        } else {
            inner.text_match(&query.text)
        };
        for (field, value) in &query.filters {
            let allowed = inner.exact_match(field, value);
            ids.retain(|id| allowed.contains(id));
        }

        let mut docs: Vec<&SearchDocument> = ids.iter().filter_map(|id| inner.docs.get(id)).collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(docs
            .into_iter()
            .skip(query.start)
            .take(query.rows)
            .map(|doc| doc.id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, table: &str, status: &str, items: &[&str], created_at: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            business_id: "biz_1".into(),
            branch_id: "Centro".into(),
            user_id: "user_1".into(),
            table: table.into(),
            status: status.into(),
            total: 10.0,
            created_at: created_at.into(),
            updated_at: created_at.into(),
            item_ids: items.iter().map(|i| format!("id-{}", i)).collect(),
            item_names: items.iter().map(|i| i.to_string()).collect(),
            notes: String::new(),
        }
    }

    async fn seeded() -> MemoryIndex {
        let index = MemoryIndex::new();
        index.upsert(&doc("o1", "Mesa 4", "pending", &["Cheese Burger"], "2026-01-01T10:00:00Z")).await.unwrap();
        index.upsert(&doc("o2", "Patio", "cancelled", &["Lemonade"], "2026-01-02T10:00:00Z")).await.unwrap();
        index.upsert(&doc("o3", "Mesa 7", "accepted", &["Burger"], "2026-01-03T10:00:00Z")).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_free_text_is_case_insensitive_substring() {
        let index = seeded().await;
        let ids = index.query(&SearchQuery::new("BURG")).await.unwrap();
        assert_eq!(ids, vec!["o3", "o1"]);

        let ids = index.query(&SearchQuery::new("mesa 4")).await.unwrap();
        assert_eq!(ids, vec!["o1"]);
    }

    #[tokio::test]
    async fn test_match_all_and_filters() {
        let index = seeded().await;
        assert_eq!(index.query(&SearchQuery::new("*:*")).await.unwrap().len(), 3);

        let query = SearchQuery::new("").filter("status", "cancelled");
        assert_eq!(index.query(&query).await.unwrap(), vec!["o2"]);

        let bad = SearchQuery::new("").filter("notes", "x");
        assert!(matches!(index.query(&bad).await, Err(SearchError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_raw_field_query() {
        let index = seeded().await;
        assert_eq!(index.query(&SearchQuery::new("status:acc*")).await.unwrap(), vec!["o3"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_old_tokens() {
        let index = seeded().await;
        index.upsert(&doc("o1", "Mesa 4", "delivered", &["Salad"], "2026-01-01T10:00:00Z")).await.unwrap();

        assert_eq!(index.len().await, 3);
        assert!(index.query(&SearchQuery::new("pending")).await.unwrap().is_empty());
        assert_eq!(index.query(&SearchQuery::new("salad")).await.unwrap(), vec!["o1"]);

        index.delete("o1").await.unwrap();
        assert!(index.query(&SearchQuery::new("salad")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paging() {
        let index = seeded().await;
        let mut query = SearchQuery::new("");
        query.rows = 2;
        query.start = 1;
        assert_eq!(index.query(&query).await.unwrap(), vec!["o2", "o1"]);
    }
}
