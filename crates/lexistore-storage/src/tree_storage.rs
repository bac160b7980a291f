//! Tree-backed storage: records persisted as XML documents under a root directory.
//!
//! One engine serves both record kinds. [`TreeLayout`] says where a record's
//! document lives and how the record maps onto it; [`TreeStorage`] does the
//! I/O, the error handling and the logging:
//!
//! - nodes live in their own file, named by content hash, and are always
//!   rewritten whole;
//! - rules live in the locale's shared grammar document and are located with
//!   the fuzzy resolver.
//!
//! Writes go to a temporary file next to the target and are renamed into
//! place, so a reader sees either the old document or the new one.

use crate::backend::{
    BulkGenerator, Existence, GenerateSummary, Loader, PseudoSource, Saver, StorageKind,
    SuffixLookup,
};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::format::{self, MasterDocument, LOCALE_ATTRIBUTE};
use crate::resolver::{
    inherited_bonds, resolve_chain, RuleResolver, BIND_ELEMENT, TYPE_ATTRIBUTE,
};
use crate::tree::Document;
use lexistore_model::{Chain, NodeRecord};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Element name for rules appended by a save.
pub const RULE_ELEMENT: &str = "Rule";
/// Root element of a freshly created grammar document.
pub const GRAMMAR_ROOT: &str = "Grammar";

// ============================================================================
// Document I/O
// ============================================================================

pub(crate) fn read_document(path: &Path) -> StoreResult<Document> {
    let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    Document::parse(&text).map_err(|e| StoreError::tree(path, e))
}

/// Replace `path` with `doc`, creating parent directories as needed.
pub(crate) fn write_document(path: &Path, doc: &Document) -> StoreResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::malformed(path, "document path has no parent directory"))?;
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let text = doc.to_xml().map_err(|e| StoreError::tree(path, e))?;
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    staged
        .write_all(text.as_bytes())
        .map_err(|e| StoreError::io(path, e))?;
    staged
        .persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

fn read_master(config: &StoreConfig, locale: &str) -> StoreResult<MasterDocument> {
    let path = config.master_path(locale);
    let doc = read_document(&path)?;
    MasterDocument::from_document(&doc, &path)
}

// ============================================================================
// Layout
// ============================================================================

/// How a record kind maps onto tree-backed documents.
pub trait TreeLayout: Sized {
    /// Backend identifier reported through [`StorageKind`].
    const KIND: &'static str;

    /// Document holding `record`, or `None` when the record carries no key.
    fn document_path(config: &StoreConfig, record: &Self) -> Option<PathBuf>;

    /// True when `doc` holds `record`.
    fn contains(doc: &Document, record: &Self) -> bool;

    /// Fill `record` from `doc`; `Ok(false)` when the document does not hold it.
    fn read(doc: &Document, record: &mut Self, path: &Path) -> StoreResult<bool>;

    /// The document to persist after writing `record` into `existing`.
    fn write(config: &StoreConfig, existing: Option<Document>, record: &Self) -> Document;

    /// Bulk rebuild for every locale under the root.
    fn generate(config: &StoreConfig) -> GenerateSummary;
}

impl TreeLayout for NodeRecord {
    const KIND: &'static str = "tree-node";

    fn document_path(config: &StoreConfig, record: &Self) -> Option<PathBuf> {
        if record.id().is_empty() {
            return None;
        }
        Some(config.node_path(record.locale(), record.id()))
    }

    fn contains(doc: &Document, _record: &Self) -> bool {
        doc.name(doc.root()) == format::DATA_ELEMENT
    }

    fn read(doc: &Document, record: &mut Self, path: &Path) -> StoreResult<bool> {
        // Parse into a scratch copy so a malformed file leaves `record` untouched.
        let mut loaded = record.clone();
        format::read_node_document(doc, &mut loaded, path)?;
        *record = loaded;
        Ok(true)
    }

    fn write(config: &StoreConfig, _existing: Option<Document>, record: &Self) -> Document {
        format::node_document(record, config.effective_locale(record.locale()))
    }

    fn generate(config: &StoreConfig) -> GenerateSummary {
        let mut summary = GenerateSummary {
            kind: Self::KIND.to_string(),
            ..GenerateSummary::default()
        };

        for locale in locales_or_warn(config) {
            let path = config.master_path(&locale);
            if !path.is_file() {
                continue;
            }
            match spawn_nodes(config, &locale) {
                Ok((written, skipped)) => {
                    summary.written += written;
                    summary.skipped += skipped;
                    summary.locales.push(locale);
                }
                Err(err) => {
                    tracing::warn!(locale = %locale, error = %err, "node generation failed for locale");
                    summary.failed_locales.push(locale);
                }
            }
        }

        tracing::info!(
            locales = summary.locales.len(),
            written = summary.written,
            skipped = summary.skipped,
            failed = summary.failed_locales.len(),
            "generated node files"
        );
        summary
    }
}

/// Expand one locale's master document into node files.
fn spawn_nodes(config: &StoreConfig, locale: &str) -> StoreResult<(usize, usize)> {
    let master = read_master(config, locale)?;
    let mut written = 0;
    let mut skipped = 0;

    for entry in &master.entries {
        if entry.flags.is_empty() {
            skipped += 1;
            continue;
        }
        let mut record = NodeRecord::new(entry.symbol.as_str(), locale);
        record.set_flags(entry.flags.clone());
        let doc = format::node_document(&record, locale);
        write_document(&config.node_path(locale, record.id()), &doc)?;
        written += 1;
    }

    Ok((written, skipped))
}

fn locales_or_warn(config: &StoreConfig) -> Vec<String> {
    match config.locales() {
        Ok(locales) => locales,
        Err(err) => {
            tracing::warn!(
                path = %config.root_dir.display(),
                error = %err,
                "failed to list locales"
            );
            Vec::new()
        }
    }
}

impl TreeLayout for Chain {
    const KIND: &'static str = "tree-rule";

    fn document_path(config: &StoreConfig, record: &Self) -> Option<PathBuf> {
        // An empty type path never resolves, so it cannot address an element.
        if record.kind.is_empty() {
            return None;
        }
        Some(config.grammar_path(&record.locale))
    }

    fn contains(doc: &Document, record: &Self) -> bool {
        RuleResolver::new(doc).resolve(&record.kind).is_some()
    }

    fn read(doc: &Document, record: &mut Self, _path: &Path) -> StoreResult<bool> {
        Ok(resolve_chain(doc, record).is_some())
    }

    /// Only the element's `Bind` children are rewritten. A chain carries no
    /// element attributes besides its type path, and the element's `type`
    /// holds one segment of that path, so it is left as it is.
    fn write(config: &StoreConfig, existing: Option<Document>, record: &Self) -> Document {
        let mut doc = existing.unwrap_or_else(|| {
            let mut doc = Document::new(GRAMMAR_ROOT);
            let root = doc.root();
            doc.set_attribute(root, LOCALE_ATTRIBUTE, config.effective_locale(&record.locale));
            doc
        });

        let resolved = RuleResolver::new(&doc).resolve(&record.kind);
        let node = match resolved {
            Some(resolution) => resolution.node,
            None => {
                let root = doc.root();
                let node = doc.append_child(root, RULE_ELEMENT);
                doc.set_attribute(node, TYPE_ATTRIBUTE, record.kind.as_str());
                node
            }
        };

        // Bonds the element would inherit anyway are not repeated on it.
        let inherited = match doc.parent(node) {
            Some(parent) => inherited_bonds(&doc, parent),
            None => Vec::new(),
        };
        doc.remove_children_named(node, BIND_ELEMENT);
        for bond in record
            .bonds
            .iter()
            .filter(|bond| !bond.is_empty() && !inherited.contains(bond))
        {
            let bind = doc.append_child(node, BIND_ELEMENT);
            for (key, value) in bond.attributes() {
                doc.set_attribute(bind, key.as_str(), value.as_str());
            }
        }
        doc
    }

    fn generate(config: &StoreConfig) -> GenerateSummary {
        let mut summary = GenerateSummary {
            kind: Self::KIND.to_string(),
            ..GenerateSummary::default()
        };

        for locale in locales_or_warn(config) {
            let path = config.grammar_path(&locale);
            if !path.is_file() {
                continue;
            }
            match read_document(&path) {
                Ok(doc) => {
                    summary.written += count_rules(&doc);
                    summary.locales.push(locale);
                }
                Err(err) => {
                    tracing::warn!(locale = %locale, error = %err, "grammar document is unreadable");
                    summary.failed_locales.push(locale);
                }
            }
        }

        tracing::info!(
            locales = summary.locales.len(),
            rules = summary.written,
            failed = summary.failed_locales.len(),
            "verified grammar documents"
        );
        summary
    }
}

/// Elements carrying a `type`, below the document root.
fn count_rules(doc: &Document) -> usize {
    let mut count = 0;
    let mut stack: Vec<_> = doc.children(doc.root()).to_vec();
    while let Some(node) = stack.pop() {
        if doc.name(node) == BIND_ELEMENT {
            continue;
        }
        if doc.attribute(node, TYPE_ATTRIBUTE).is_some() {
            count += 1;
        }
        stack.extend(doc.children(node).iter().copied());
    }
    count
}

// ============================================================================
// Engine
// ============================================================================

/// Tree-backed backend for one record kind.
pub struct TreeStorage<R> {
    config: StoreConfig,
    _record: PhantomData<fn() -> R>,
}

/// Tree-backed node storage.
pub type NodeStorage = TreeStorage<NodeRecord>;
/// Tree-backed rule storage.
pub type RuleStorage = TreeStorage<Chain>;

impl<R> TreeStorage<R> {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            _record: PhantomData,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn master_or_warn(&self, locale: &str) -> Option<MasterDocument> {
        match read_master(&self.config, locale) {
            Ok(master) => Some(master),
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                tracing::warn!(locale = %locale, error = %err, "unusable master document");
                None
            }
        }
    }
}

impl<R> Clone for TreeStorage<R> {
    fn clone(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl<R> std::fmt::Debug for TreeStorage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeStorage")
            .field("config", &self.config)
            .finish()
    }
}

impl<R: TreeLayout> TreeStorage<R> {
    /// Parsed document at `path`; `None` when absent or malformed (logged).
    fn open(&self, path: &Path) -> Option<Document> {
        match read_document(path) {
            Ok(doc) => Some(doc),
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                tracing::warn!(kind = R::KIND, error = %err, "skipping malformed document");
                None
            }
        }
    }
}

impl<R: TreeLayout> StorageKind for TreeStorage<R> {
    fn kind(&self) -> &'static str {
        R::KIND
    }
}

impl<R: TreeLayout> Existence<R> for TreeStorage<R> {
    fn exists(&self, record: &R) -> bool {
        let Some(path) = R::document_path(&self.config, record) else {
            return false;
        };
        if !path.is_file() {
            return false;
        }
        self.open(&path)
            .is_some_and(|doc| R::contains(&doc, record))
    }
}

impl<R: TreeLayout> Loader<R> for TreeStorage<R> {
    fn load_to(&self, record: &mut R) -> bool {
        let Some(path) = R::document_path(&self.config, record) else {
            return false;
        };
        let Some(doc) = self.open(&path) else {
            return false;
        };
        match R::read(&doc, record, &path) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(kind = R::KIND, error = %err, "failed to load record");
                false
            }
        }
    }
}

impl<R: TreeLayout> Saver<R> for TreeStorage<R> {
    fn save_from(&self, record: &R) -> bool {
        let Some(path) = R::document_path(&self.config, record) else {
            tracing::warn!(kind = R::KIND, "refusing to save a record without a key");
            return false;
        };
        let existing = if path.is_file() {
            match read_document(&path) {
                Ok(doc) => Some(doc),
                Err(err) => {
                    tracing::warn!(kind = R::KIND, error = %err, "not overwriting malformed document");
                    return false;
                }
            }
        } else {
            None
        };

        let doc = R::write(&self.config, existing, record);
        match write_document(&path, &doc) {
            Ok(()) => {
                tracing::debug!(kind = R::KIND, path = %path.display(), "saved record");
                true
            }
            Err(err) => {
                tracing::warn!(kind = R::KIND, error = %err, "failed to save record");
                false
            }
        }
    }
}

impl<R: TreeLayout> BulkGenerator for TreeStorage<R> {
    fn generate(&self) -> GenerateSummary {
        R::generate(&self.config)
    }
}

impl<R> SuffixLookup for TreeStorage<R> {
    fn obtain_full_suffix(&self, locale: &str, suffix: &str) -> String {
        self.master_or_warn(locale)
            .and_then(|master| master.full_suffix(suffix).map(str::to_string))
            .unwrap_or_default()
    }
}

impl PseudoSource for TreeStorage<NodeRecord> {
    fn has_pseudo(&self, record: &NodeRecord) -> bool {
        self.master_or_warn(record.locale())
            .is_some_and(|master| master.pseudo.is_some())
    }

    fn load_pseudo(&self, record: &mut NodeRecord) -> bool {
        let Some(flags) = self
            .master_or_warn(record.locale())
            .and_then(|master| master.pseudo)
        else {
            return false;
        };
        record.set_flags(flags);
        true
    }
}
