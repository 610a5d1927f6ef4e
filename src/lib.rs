//! datacat - search and edit a data catalog kept as JSON collection files.
//!
//! Each collection (data models, agreements, domains, toolkit components,
//! policies, glossary terms, ...) is one JSON blob in a [`DocumentStore`].
//! A [`SearchIndex`] flattens every element into lowercase text and answers
//! substring queries ranked by match density. The [`Catalog`] service ties
//! the two together: element edits rewrite the whole blob, then update the
//! index for just that element.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use datacat::{Catalog, DataDir, LocalStore};
//! use datacat::search::SearchParams;
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = Arc::new(LocalStore::from_data_dir(&data_dir).unwrap());
//! let catalog = Catalog::open(store);
//!
//! let params = SearchParams::new("customer").with_types("models,policies");
//! let response = catalog.search(&params).unwrap();
//! for hit in &response.results {
//!     println!("{}:{} ({:.3})", hit.document_type, hit.document_id, hit.score);
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod collections;
pub mod data_dir;
pub mod error;
pub mod extract;
pub mod index;
pub mod key;
pub mod mcp;
pub mod search;
pub mod store;
pub mod text_util;

pub use catalog::Catalog;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use extract::Element;
pub use index::{IndexStats, IndexedDocument, SearchHit, SearchIndex};
pub use key::DocumentKey;
pub use store::{DocumentStore, LocalStore, MemoryStore};
