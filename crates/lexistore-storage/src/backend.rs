//! Backend capability traits.
//!
//! A backend is anything that can answer some of these questions about a
//! record kind. Each concern is its own trait; [`NodeBackend`] and
//! [`RuleBackend`] bundle the set a cache needs for nodes and rules.
//!
//! None of these methods return errors. Absence is the ordinary "not found"
//! answer, and storage problems are logged by the backend and reported the
//! same way.

use lexistore_model::{Chain, NodeRecord};
use serde::Serialize;

/// Stable identifier used to de-duplicate backends in a cache.
pub trait StorageKind {
    fn kind(&self) -> &'static str;
}

pub trait Existence<R> {
    /// True when this backend holds `record`'s key.
    fn exists(&self, record: &R) -> bool;
}

pub trait Loader<R> {
    /// Fill `record` from storage. Returns false (leaving `record` untouched)
    /// when nothing was loaded.
    fn load_to(&self, record: &mut R) -> bool;
}

pub trait Saver<R> {
    /// Persist `record`, creating storage as needed. Returns false when the
    /// write was abandoned.
    fn save_from(&self, record: &R) -> bool;
}

/// Outcome of one backend's bulk rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateSummary {
    pub kind: String,
    /// Locales that were processed successfully.
    pub locales: Vec<String>,
    /// Files written (nodes) or elements verified (rules).
    pub written: usize,
    /// Entries deliberately skipped.
    pub skipped: usize,
    /// Locales abandoned because of a parse or I/O failure.
    pub failed_locales: Vec<String>,
}

pub trait BulkGenerator {
    /// Rebuild this backend's on-disk representation from its master source.
    fn generate(&self) -> GenerateSummary;
}

/// Fallback template for symbols with no exact record.
pub trait PseudoSource {
    fn has_pseudo(&self, record: &NodeRecord) -> bool;

    /// Copy the template's flags onto `record`; the symbol is never touched.
    fn load_pseudo(&self, record: &mut NodeRecord) -> bool;
}

pub trait SuffixLookup {
    /// Expanded form of a morphological suffix, or an empty string.
    fn obtain_full_suffix(&self, locale: &str, suffix: &str) -> String;
}

/// Everything a node cache asks of a backend.
pub trait NodeBackend:
    StorageKind
    + Existence<NodeRecord>
    + Loader<NodeRecord>
    + Saver<NodeRecord>
    + BulkGenerator
    + PseudoSource
    + SuffixLookup
{
}

impl<T> NodeBackend for T where
    T: StorageKind
        + Existence<NodeRecord>
        + Loader<NodeRecord>
        + Saver<NodeRecord>
        + BulkGenerator
        + PseudoSource
        + SuffixLookup
{
}

/// Everything a rule cache asks of a backend.
pub trait RuleBackend:
    StorageKind + Existence<Chain> + Loader<Chain> + Saver<Chain> + BulkGenerator + SuffixLookup
{
}

impl<T> RuleBackend for T where
    T: StorageKind + Existence<Chain> + Loader<Chain> + Saver<Chain> + BulkGenerator + SuffixLookup
{
}
