//! The catalog service: whole-blob collection edits kept in step with the
//! search index.
//!
//! Every mutation is a read-modify-write of one collection blob followed by
//! a single incremental index call. The store write decides success; index
//! trouble is logged and left for the next rebuild to repair.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    collections::{self, COLLECTIONS, CollectionSpec},
    error::{Error, Result},
    extract::{self, Element},
    index::{IndexStats, SearchIndex},
    key::DocumentKey,
    search::{
        self,
        MAX_SUGGEST_LIMIT,
        RebuildResponse,
        SearchParams,
        SearchResponse,
        SuggestResponse,
        TypesSearched,
    },
    store::DocumentStore,
};

/// Presence summary for one registered collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub document_type: &'static str,
    pub file_name: &'static str,
    pub present: bool,
    /// `None` when the blob is absent or has an unrecognized shape.
    pub elements: Option<usize>,
}

pub struct Catalog {
    store: Arc<dyn DocumentStore>,
    index: SearchIndex,
}

impl Catalog {
    /// A catalog with an empty index.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            index: SearchIndex::new(),
        }
    }

    /// A catalog whose index has been built from the store.
    ///
    /// A failed initial build is logged and leaves the index empty; a later
    /// [`Catalog::rebuild`] can recover.
    pub fn open(store: Arc<dyn DocumentStore>) -> Self {
        let catalog = Self::new(store);
        if let Err(e) = catalog.index.rebuild(catalog.store.as_ref()) {
            warn!(error = %e, "initial index build failed, starting empty");
        }
        catalog
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    // -- Search --

    pub fn search(&self, params: &SearchParams) -> Result<SearchResponse> {
        params.validate()?;
        let filter = params.type_filter();
        let results = self.index.search(
            &params.query,
            Some(filter.as_slice()),
            params.limit,
        );

        Ok(SearchResponse {
            query: params.query.clone(),
            total: results.len(),
            results,
            types_searched: TypesSearched::from_filter(filter),
        })
    }

    pub fn suggest(&self, query: &str, limit: usize) -> Result<SuggestResponse> {
        search::check_limit("suggest", limit, MAX_SUGGEST_LIMIT)?;
        let hits = self.index.search(query, None, limit);
        Ok(SuggestResponse {
            query: query.to_string(),
            suggestions: search::suggestions(&hits, limit),
        })
    }

    pub fn rebuild(&self) -> Result<RebuildResponse> {
        let stats = self.index.rebuild(self.store.as_ref())?;
        Ok(RebuildResponse {
            message: "Search index rebuilt successfully".to_string(),
            stats,
        })
    }

    /// Reindex one collection without touching the others.
    pub fn rebuild_collection(
        &self,
        document_type: &str,
    ) -> Result<RebuildResponse> {
        let indexed = self
            .index
            .reindex_collection(self.store.as_ref(), document_type)?;
        Ok(RebuildResponse {
            message: format!(
                "Collection '{document_type}' reindexed ({indexed} documents)"
            ),
            stats: self.index.stats(),
        })
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    // -- Collections --

    pub fn collections(&self) -> Result<Vec<CollectionInfo>> {
        COLLECTIONS
            .iter()
            .map(|spec| {
                let (present, elements) = match self.store.read(spec.file_name)
                {
                    Ok(None) => (false, None),
                    Ok(Some(blob)) => {
                        (true, spec.elements(&blob).ok().map(|e| e.len()))
                    }
                    Err(e) if e.is_recoverable() => (true, None),
                    Err(e) => return Err(e),
                };
                Ok(CollectionInfo {
                    document_type: spec.document_type,
                    file_name: spec.file_name,
                    present,
                    elements,
                })
            })
            .collect()
    }

    /// Every element of a collection. An absent blob is an empty list.
    pub fn list(&self, document_type: &str) -> Result<Vec<Element>> {
        let spec = collections::lookup(document_type)?;
        match self.store.read(spec.file_name)? {
            Some(blob) => spec.elements(&blob),
            None => Ok(Vec::new()),
        }
    }

    pub fn get(&self, document_type: &str, document_id: &str) -> Result<Element> {
        let spec = collections::lookup(document_type)?;
        let mut blob = self.load_blob(spec)?;
        let location = spec
            .locate(&blob, document_id)
            .ok_or_else(|| not_found(document_type, document_id))?;

        let mut element = spec
            .array_mut(&mut blob, location.section)?
            .get(location.index)
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| not_found(document_type, document_id))?;
        collections::tag_section(&mut element, location.section);
        Ok(element)
    }

    // -- Mutations --

    /// Append a new element, assigning an `id` when it has none.
    pub fn create(
        &self,
        document_type: &str,
        mut element: Element,
    ) -> Result<Element> {
        let spec = collections::lookup(document_type)?;
        let mut blob = self.load_blob(spec)?;

        let section = spec.section_for(&element)?;
        if let Some(name) = section {
            element
                .entry(collections::TOOLKIT_SECTION_FIELD)
                .or_insert_with(|| Value::String(name.to_string()));
        }

        let has_id = match element.get("id") {
            Some(Value::String(id)) => !id.trim().is_empty(),
            Some(Value::Number(_)) => true,
            _ => false,
        };
        if !has_id {
            element.insert("id".to_string(), spec.next_id(&blob, section));
        }

        let document_id = extract::document_id(&element).ok_or_else(|| {
            Error::InvalidArgument("element has no usable id".into())
        })?;
        if spec.locate(&blob, &document_id).is_some() {
            return Err(Error::AlreadyExists {
                kind: "element",
                name: DocumentKey::new(document_type, &document_id).to_string(),
            });
        }

        spec.array_mut(&mut blob, section)?
            .push(Value::Object(element.clone()));
        self.store.write(spec.file_name, &blob)?;

        let mut indexed = element.clone();
        collections::tag_section(&mut indexed, section);
        if !self.index.add(document_type, &document_id, &indexed) {
            warn!(
                document_type,
                document_id = %document_id,
                "created element not indexed"
            );
        }

        info!(document_type, document_id = %document_id, "element created");
        Ok(element)
    }

    /// Shallow-merge `patch` into an existing element. Its `id` is kept.
    pub fn update(
        &self,
        document_type: &str,
        document_id: &str,
        patch: Element,
    ) -> Result<Element> {
        let spec = collections::lookup(document_type)?;
        let mut blob = self.load_blob(spec)?;
        let location = spec
            .locate(&blob, document_id)
            .ok_or_else(|| not_found(document_type, document_id))?;

        let array = spec.array_mut(&mut blob, location.section)?;
        let target = array
            .get_mut(location.index)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| not_found(document_type, document_id))?;

        let original_id = target.get("id").cloned();
        target.extend(patch);
        if let Some(id) = original_id {
            target.insert("id".to_string(), id);
        }
        let updated = target.clone();

        self.store.write(spec.file_name, &blob)?;

        let mut indexed = updated.clone();
        collections::tag_section(&mut indexed, location.section);
        match extract::document_id(&updated) {
            Some(new_id) => {
                if new_id != document_id {
                    self.index.remove(document_type, document_id);
                }
                if !self.index.update(document_type, &new_id, &indexed) {
                    warn!(
                        document_type,
                        document_id,
                        "updated element not indexed"
                    );
                }
            }
            None => {
                self.index.remove(document_type, document_id);
                warn!(
                    document_type,
                    document_id,
                    "updated element lost its id"
                );
            }
        }

        info!(document_type, document_id, "element updated");
        Ok(updated)
    }

    /// Remove an element and return it.
    pub fn delete(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> Result<Element> {
        let spec = collections::lookup(document_type)?;
        let mut blob = self.load_blob(spec)?;
        let location = spec
            .locate(&blob, document_id)
            .ok_or_else(|| not_found(document_type, document_id))?;

        let removed = spec
            .array_mut(&mut blob, location.section)?
            .remove(location.index);
        self.store.write(spec.file_name, &blob)?;

        if !self.index.remove(document_type, document_id) {
            warn!(
                document_type,
                document_id,
                "deleted element was not indexed"
            );
        }

        info!(document_type, document_id, "element deleted");
        match removed {
            Value::Object(element) => Ok(element),
            _ => Err(not_found(document_type, document_id)),
        }
    }

    fn load_blob(&self, spec: &CollectionSpec) -> Result<Value> {
        Ok(self
            .store
            .read(spec.file_name)?
            .unwrap_or_else(|| spec.empty_blob()))
    }
}

fn not_found(document_type: &str, document_id: &str) -> Error {
    Error::NotFound {
        kind: "element",
        name: DocumentKey::new(document_type, document_id).to_string(),
    }
}
