//! Request validation and response shapes for the search operations.

use std::collections::HashSet;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    index::{IndexStats, SearchHit},
};

pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const MAX_SEARCH_LIMIT: usize = 200;
pub const DEFAULT_SUGGEST_LIMIT: usize = 10;
pub const MAX_SUGGEST_LIMIT: usize = 50;

/// String fields offered as suggestions, in this order.
const SUGGESTION_FIELDS: &[&str] = &["name", "shortName", "title"];
const SUGGESTION_LIST_FIELD: &str = "domain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    /// Comma-separated document types. `None` searches everything.
    pub types: Option<String>,
    pub limit: usize,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            types: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_types(mut self, types: impl Into<String>) -> Self {
        self.types = Some(types.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_limit("search", self.limit, MAX_SEARCH_LIMIT)
    }

    /// The parsed type filter. Empty when no usable type was given.
    pub fn type_filter(&self) -> Vec<String> {
        self.types
            .as_deref()
            .map(|types| {
                types
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub fn check_limit(what: &str, limit: usize, max: usize) -> Result<()> {
    if (1..=max).contains(&limit) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{what} limit must be between 1 and {max}, got {limit}"
        )))
    }
}

/// Which types a search covered: `"all"` or the explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypesSearched {
    All,
    Only(Vec<String>),
}

impl TypesSearched {
    pub fn from_filter(filter: Vec<String>) -> Self {
        if filter.is_empty() {
            Self::All
        } else {
            Self::Only(filter)
        }
    }
}

impl Serialize for TypesSearched {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::Only(types) => types.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub types_searched: TypesSearched,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebuildResponse {
    pub message: String,
    pub stats: IndexStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    pub query: String,
    pub suggestions: Vec<String>,
}

/// Distinct name-like values from `hits`, first seen first, at most `limit`.
pub fn suggestions(hits: &[SearchHit], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for hit in hits {
        let scalars = SUGGESTION_FIELDS
            .iter()
            .filter_map(|field| hit.fields.get(*field));
        let domains = hit
            .fields
            .get(SUGGESTION_LIST_FIELD)
            .and_then(Value::as_array)
            .into_iter()
            .flatten();

        for value in scalars.chain(domains) {
            let Some(s) = value.as_str().filter(|s| !s.is_empty()) else {
                continue;
            };
            if seen.insert(s.to_string()) {
                out.push(s.to_string());
                if out.len() == limit {
                    return out;
                }
            }
        }
    }
    out
}

// -- Rendering --

/// Print a search response for a terminal.
pub fn format_human(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, hit) in response.results.iter().enumerate() {
        println!(
            "{:>3}. [{:.3}] {}:{}",
            i + 1,
            hit.score,
            hit.document_type,
            hit.document_id
        );
        if let Some(label) = display_label(hit) {
            println!("     {label}");
        }
        if !hit.matched_terms.is_empty() {
            println!("     matched: {}", hit.matched_terms.join(", "));
        }
    }
    println!("\n{} result(s)", response.total);
}

fn display_label(hit: &SearchHit) -> Option<&str> {
    ["displayName", "name", "title", "term"]
        .iter()
        .find_map(|field| hit.fields.get(*field)?.as_str())
        .filter(|s| !s.is_empty())
}

pub fn format_stats_human(stats: &IndexStats) {
    println!("Documents: {}", stats.total_documents);
    println!("Tokens:    {}", stats.total_tokens);
    match stats.last_updated {
        Some(ts) => println!("Rebuilt:   {ts} (unix seconds)"),
        None => println!("Rebuilt:   never"),
    }
    for (document_type, count) in &stats.documents_by_type {
        println!("  {document_type:<16} {count}");
    }
}

/// Print any response as pretty JSON.
pub fn format_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hit(fields: Value) -> SearchHit {
        let Value::Object(fields) = fields else {
            panic!("test hit must be an object");
        };
        SearchHit {
            fields,
            document_type: "models".into(),
            document_id: "x".into(),
            score: 1.0,
            matched_terms: vec![],
        }
    }

    #[test]
    fn default_params_are_valid() {
        let params = SearchParams::new("customer");
        assert_eq!(params.limit, DEFAULT_SEARCH_LIMIT);
        params.validate().unwrap();
    }

    #[test]
    fn limit_bounds() {
        assert!(SearchParams::new("q").with_limit(0).validate().is_err());
        assert!(SearchParams::new("q").with_limit(200).validate().is_ok());
        assert!(SearchParams::new("q").with_limit(201).validate().is_err());
        assert!(check_limit("suggest", 51, MAX_SUGGEST_LIMIT).is_err());
    }

    #[test]
    fn type_filter_parsing() {
        let params = SearchParams::new("q").with_types(" models, ,policies ");
        assert_eq!(params.type_filter(), vec!["models", "policies"]);
        assert!(SearchParams::new("q").type_filter().is_empty());
        assert!(SearchParams::new("q").with_types(",").type_filter().is_empty());
    }

    #[test]
    fn types_searched_serialization() {
        assert_eq!(
            serde_json::to_value(TypesSearched::All).unwrap(),
            json!("all")
        );
        let only = TypesSearched::from_filter(vec!["models".into()]);
        assert_eq!(serde_json::to_value(only).unwrap(), json!(["models"]));
        assert_eq!(TypesSearched::from_filter(vec![]), TypesSearched::All);
    }

    #[test]
    fn suggestions_dedupe_in_order() {
        let hits = vec![
            hit(json!({"name": "Customer", "shortName": "CUST",
                       "domain": ["Sales", "Customer"]})),
            hit(json!({"title": "Customer", "domain": ["Finance"]})),
        ];
        assert_eq!(
            suggestions(&hits, 10),
            vec!["Customer", "CUST", "Sales", "Finance"]
        );
    }

    #[test]
    fn suggestions_are_capped() {
        let hits = vec![hit(json!({"name": "a", "shortName": "b", "title": "c"}))];
        assert_eq!(suggestions(&hits, 2), vec!["a", "b"]);
    }

    #[test]
    fn suggestions_skip_non_strings() {
        let hits = vec![hit(json!({"name": 4, "domain": "Sales", "title": ""}))];
        assert!(suggestions(&hits, 10).is_empty());
    }
}
