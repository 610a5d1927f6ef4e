//! In-memory substring search over every catalog collection.
//!
//! The index maps `type:id` keys to flattened elements. It is rebuilt
//! wholesale from a [`DocumentStore`] and kept in step with single-element
//! mutations in between. All state sits behind one `RwLock`: searches share
//! it, mutations and rebuilds take it exclusively.

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    collections::{self, COLLECTIONS, CollectionSpec},
    error::{Error, Result},
    extract::{self, Element},
    key::DocumentKey,
    store::DocumentStore,
    text_util,
};

/// One flattened element as held by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document_type: String,
    pub document_id: String,
    pub searchable_text: String,
    /// The source element, untouched.
    pub fields: Element,
}

impl IndexedDocument {
    /// Flatten `element` under an explicit id.
    ///
    /// Fails with [`Error::EmptyText`] when nothing in the element is
    /// searchable.
    pub fn new(
        document_type: &str,
        document_id: &str,
        element: Element,
    ) -> Result<Self> {
        let searchable_text = extract::searchable_text(&element);
        if searchable_text.is_empty() {
            return Err(Error::EmptyText(
                DocumentKey::new(document_type, document_id).to_string(),
            ));
        }
        Ok(Self {
            document_type: document_type.to_string(),
            document_id: document_id.to_string(),
            searchable_text,
            fields: element,
        })
    }

    /// Flatten `element`, deriving its id from the element itself.
    pub fn from_element(document_type: &str, element: Element) -> Option<Self> {
        let document_id = extract::document_id(&element)?;
        Self::new(document_type, &document_id, element).ok()
    }

    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(&self.document_type, &self.document_id)
    }

    pub fn token_count(&self) -> usize {
        text_util::token_count(&self.searchable_text)
    }
}

/// Derived counters over the live entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_tokens: usize,
    pub documents_by_type: BTreeMap<String, usize>,
    /// Unix seconds of the last rebuild, `None` before the first one.
    pub last_updated: Option<u64>,
}

/// A search result: the source element plus scoring metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub fields: Element,
    #[serde(rename = "_search_type")]
    pub document_type: String,
    #[serde(rename = "_search_id")]
    pub document_id: String,
    #[serde(rename = "_search_score")]
    pub score: f64,
    #[serde(rename = "_matched_terms")]
    pub matched_terms: Vec<String>,
}

/// Keys a hit adds on serialization. Element fields of the same name are
/// dropped so the emitted object has no duplicates.
const HIT_METADATA_FIELDS: &[&str] =
    &["_search_type", "_search_id", "_search_score", "_matched_terms"];

fn hit_fields(fields: &Element) -> Element {
    fields
        .iter()
        .filter(|(key, _)| !HIT_METADATA_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[derive(Debug, Default)]
struct IndexState {
    entries: BTreeMap<String, IndexedDocument>,
    stats: IndexStats,
}

impl IndexState {
    /// Insert or replace, adjusting stats by the difference.
    fn upsert(&mut self, doc: IndexedDocument) -> Option<IndexedDocument> {
        let tokens = doc.token_count();
        let document_type = doc.document_type.clone();
        let previous = self.entries.insert(doc.key().encoded(), doc);

        match &previous {
            Some(old) => {
                self.stats.total_tokens =
                    self.stats.total_tokens - old.token_count() + tokens;
            }
            None => {
                self.stats.total_documents += 1;
                self.stats.total_tokens += tokens;
                let by_type = &mut self.stats.documents_by_type;
                *by_type.entry(document_type).or_insert(0) += 1;
            }
        }
        previous
    }

    fn remove(&mut self, key: &str) -> Option<IndexedDocument> {
        let old = self.entries.remove(key)?;
        self.stats.total_documents -= 1;
        self.stats.total_tokens -= old.token_count();
        if let Some(count) =
            self.stats.documents_by_type.get_mut(&old.document_type)
        {
            *count -= 1;
            if *count == 0 {
                self.stats.documents_by_type.remove(&old.document_type);
            }
        }
        Some(old)
    }

    fn remove_type(&mut self, document_type: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, doc)| doc.document_type == document_type)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.remove(key);
        }
        keys.len()
    }

    /// Index every element of one collection. Returns how many were kept.
    fn insert_elements(
        &mut self,
        spec: &CollectionSpec,
        elements: Vec<Element>,
    ) -> usize {
        let mut indexed = 0;
        for element in elements {
            match IndexedDocument::from_element(spec.document_type, element) {
                Some(doc) => {
                    self.upsert(doc);
                    indexed += 1;
                }
                None => debug!(
                    collection = spec.document_type,
                    "skipping element without id or searchable text"
                ),
            }
        }
        indexed
    }
}

#[derive(Debug, Default)]
pub struct SearchIndex {
    state: RwLock<IndexState>,
}

impl SearchIndex {
    /// An empty index. Call [`SearchIndex::rebuild`] to populate it.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Rebuild --

    /// Replace the whole index with the current store contents.
    ///
    /// Missing, unreadable or malformed collections are skipped. Any other
    /// failure aborts and leaves the live index as it was.
    pub fn rebuild(&self, store: &dyn DocumentStore) -> Result<IndexStats> {
        info!(collections = COLLECTIONS.len(), "rebuilding search index");

        let loaded: Vec<(&CollectionSpec, Result<Vec<Element>>)> = COLLECTIONS
            .par_iter()
            .map(|spec| (spec, load_collection(store, spec)))
            .collect();

        let mut fresh = IndexState::default();
        for (spec, elements) in loaded {
            match elements {
                Ok(elements) => {
                    let indexed = fresh.insert_elements(spec, elements);
                    debug!(collection = spec.document_type, indexed, "indexed");
                }
                Err(e) if e.is_recoverable() => {
                    warn!(
                        collection = spec.document_type,
                        error = %e,
                        "skipping collection"
                    );
                }
                Err(e) => {
                    warn!(
                        collection = spec.document_type,
                        error = %e,
                        "rebuild aborted, keeping previous index"
                    );
                    return Err(e);
                }
            }
        }

        fresh.stats.last_updated = Some(unix_now());
        let stats = fresh.stats.clone();
        *self.write() = fresh;

        info!(
            documents = stats.total_documents,
            tokens = stats.total_tokens,
            "search index rebuilt"
        );
        Ok(stats)
    }

    /// Reload a single collection, replacing only its entries.
    ///
    /// An absent blob empties the collection. Read or shape failures leave
    /// the existing entries in place.
    pub fn reindex_collection(
        &self,
        store: &dyn DocumentStore,
        document_type: &str,
    ) -> Result<usize> {
        let spec = collections::lookup(document_type)?;
        let elements = match load_collection(store, spec) {
            Ok(elements) => elements,
            Err(Error::NotFound { .. }) => Vec::new(),
            Err(e) => {
                warn!(collection = document_type, error = %e, "reindex failed");
                return Err(e);
            }
        };

        let mut state = self.write();
        let removed = state.remove_type(document_type);
        let indexed = state.insert_elements(spec, elements);
        state.stats.last_updated = Some(unix_now());

        info!(collection = document_type, removed, indexed, "collection reindexed");
        Ok(indexed)
    }

    // -- Incremental mutation --

    /// Index one element. An existing entry at the same key is replaced.
    ///
    /// Returns `false` when the element has no searchable text.
    pub fn add(
        &self,
        document_type: &str,
        document_id: &str,
        element: &Element,
    ) -> bool {
        self.upsert("add", document_type, document_id, element)
    }

    /// Re-index one element. On failure the prior entry stays as it was.
    pub fn update(
        &self,
        document_type: &str,
        document_id: &str,
        element: &Element,
    ) -> bool {
        self.upsert("update", document_type, document_id, element)
    }

    fn upsert(
        &self,
        verb: &'static str,
        document_type: &str,
        document_id: &str,
        element: &Element,
    ) -> bool {
        let doc = match IndexedDocument::new(
            document_type,
            document_id,
            element.clone(),
        ) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(op = verb, error = %e, "index mutation skipped");
                return false;
            }
        };

        let replaced = self.write().upsert(doc).is_some();
        debug!(
            op = verb,
            document_type,
            document_id,
            replaced,
            "index entry written"
        );
        true
    }

    /// Drop one entry. Returns `false` if there was nothing to drop.
    pub fn remove(&self, document_type: &str, document_id: &str) -> bool {
        let key = DocumentKey::new(document_type, document_id);
        let removed = self.write().remove(&key.encoded()).is_some();
        if removed {
            debug!(key = %key, "index entry removed");
        } else {
            warn!(key = %key, "remove of unknown index entry");
        }
        removed
    }

    // -- Queries --

    /// Rank documents containing `query` as a substring.
    ///
    /// `types` restricts the scan to those document types. An empty slice
    /// means no restriction. Blank queries match nothing.
    pub fn search(
        &self,
        query: &str,
        types: Option<&[String]>,
        limit: usize,
    ) -> Vec<SearchHit> {
        let Some(query) = text_util::normalize_query(query) else {
            return Vec::new();
        };
        let filter = types.filter(|t| !t.is_empty());

        let state = self.read();
        let mut hits: Vec<SearchHit> = state
            .entries
            .values()
            .filter(|doc| {
                filter.is_none_or(|t| t.iter().any(|t| *t == doc.document_type))
            })
            .filter_map(|doc| {
                let occurrences =
                    text_util::count_occurrences(&doc.searchable_text, &query);
                if occurrences == 0 {
                    return None;
                }
                let score = occurrences as f64 / doc.token_count().max(1) as f64;
                Some(SearchHit {
                    fields: hit_fields(&doc.fields),
                    document_type: doc.document_type.clone(),
                    document_id: doc.document_id.clone(),
                    score,
                    matched_terms: text_util::matched_terms(
                        &query,
                        &doc.searchable_text,
                    ),
                })
            })
            .collect();
        drop(state);

        // Stable: ties stay in key order.
        hits.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
        });
        hits.truncate(limit);

        debug!(query = %query, hits = hits.len(), "search");
        hits
    }

    pub fn get(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> Option<IndexedDocument> {
        let key = DocumentKey::new(document_type, document_id);
        self.read().entries.get(&key.encoded()).cloned()
    }

    pub fn stats(&self) -> IndexStats {
        self.read().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }
}

fn load_collection(
    store: &dyn DocumentStore,
    spec: &CollectionSpec,
) -> Result<Vec<Element>> {
    let blob = store.read(spec.file_name)?.ok_or_else(|| Error::NotFound {
        kind: "collection",
        name: spec.file_name.to_string(),
    })?;
    spec.elements(&blob)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
