//! Lexistore Storage Layer
//!
//! Locale-partitioned storage for lexical nodes and grammar rules:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          CACHE DISPATCHER                            │
//! │   read / write / exists / pseudo / generate, first backend wins      │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │   ┌──────────────┐      ┌──────────────┐      ┌──────────────┐       │
//! │   │  Backend A   │      │  Backend B   │ ...  │ TreeStorage  │       │
//! │   │ (registered) │      │ (registered) │      │  (fallback)  │       │
//! │   └──────────────┘      └──────────────┘      └──────┬───────┘       │
//! │                                                      │               │
//! │              ┌───────────────────────────────────────┤               │
//! │              ▼                                       ▼               │
//! │   <root>/<locale>/node/<id>.xml        <root>/<locale>/grammar.xml   │
//! │   (one file per node, by hash)         (fuzzy rule resolution)       │
//! │                                                                      │
//! │   <root>/<locale>/locale.xml ── generate ──► node files              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Content addressed nodes**: a node's file name is the hash of its symbol.
//! - **Fuzzy rules**: rule lookups walk the grammar tree with a decaying
//!   acceptance threshold (see [`resolver`]).
//! - **Pluggable backends**: anything implementing the capability traits in
//!   [`backend`] can be registered with a [`Cache`].
//! - **Quiet failures**: missing or malformed storage is logged and reported
//!   as "not found"; nothing panics or errors across the backend interface.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod resolver;
pub mod tree;
pub mod tree_storage;


pub use backend::{
    BulkGenerator, Existence, GenerateSummary, Loader, NodeBackend, PseudoSource, RuleBackend,
    Saver, StorageKind, SuffixLookup,
};
pub use cache::{Cache, CacheEvent, NodeCache, RuleCache};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult, TreeError};
pub use resolver::{matches, Resolution, RuleResolver};
pub use tree::{Document, NodeId};
pub use tree_storage::{NodeStorage, RuleStorage, TreeLayout, TreeStorage};

/// A node cache with the tree-backed node store registered.
pub fn default_node_cache(config: StoreConfig) -> NodeCache {
    let mut cache = NodeCache::new(config.clone());
    cache.add_storage(Box::new(NodeStorage::new(config)));
    cache
}

/// A rule cache with the tree-backed rule store registered.
pub fn default_rule_cache(config: StoreConfig) -> RuleCache {
    let mut cache = RuleCache::new(config.clone());
    cache.add_storage(Box::new(RuleStorage::new(config)));
    cache
}
