//! Document store adapter for record codecs.
//!
//! The codec itself never performs I/O. This crate is the boundary around
//! it: a raw [`DocumentStore`], a [`TypedCollection`] that decodes on read
//! and encodes on write, YAML [`CodecConfig`], and [`FixtureSet`] loading
//! for seeding stores.
//!
//! # Quick start
//!
//! ```
//! use record_codec_core::{SchemaConverter, string};
//! use record_codec_db::{MemoryStore, QueryFilter, TypedCollection};
//!
//! let store = MemoryStore::new();
//! let labels = TypedCollection::new(&store, "labels", SchemaConverter::from_node(string()));
//! labels.put("l1", &"urgent".to_string()).unwrap();
//!
//! assert_eq!(labels.get("l1").unwrap().as_deref(), Some("urgent"));
//! assert_eq!(labels.query(QueryFilter::all()).unwrap().len(), 1);
//! ```

mod adapter;
mod config;
mod error;
mod loader;
mod store;

pub use adapter::TypedCollection;
pub use config::{CodecConfig, DecodeConfig, SqliteConfig, StoreConfig};
pub use error::{PersistenceError, Result};
pub use loader::{FixtureSet, FixtureSource};
pub use store::{Document, DocumentStore, MemoryStore, QueryFilter, validate_key};
