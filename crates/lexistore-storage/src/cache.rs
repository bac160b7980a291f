//! Backend registry and dispatch.
//!
//! A [`Cache`] owns an ordered, de-duplicated list of backends and routes
//! record operations to them:
//!
//! - `read` / `pseudo`: the first backend (in registration order) that holds
//!   the record answers;
//! - `write`: the first backend that already holds the record is overwritten;
//!   when none does, a default tree-backed store takes the write;
//! - `generate`: every backend runs its bulk pass, independently.
//!
//! Backends are queried one after another. They are independent and
//! read-only during lookups, so this could fan out, but nothing does yet.

use crate::backend::{
    BulkGenerator, Existence, GenerateSummary, Loader, NodeBackend, PseudoSource, RuleBackend,
    Saver, StorageKind, SuffixLookup,
};
use crate::config::StoreConfig;
use crate::tree_storage::{TreeLayout, TreeStorage};
use lexistore_model::NodeRecord;

/// Notification emitted after a cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Loaded { backend: &'static str },
    PseudoLoaded { backend: &'static str },
    Saved { backend: &'static str },
    /// No backend could serve the request.
    Missed,
}

type Observer = Box<dyn Fn(&CacheEvent) + Send + Sync>;

/// Registry of backends of one capability set (`dyn NodeBackend` or `dyn RuleBackend`).
pub struct Cache<B: ?Sized> {
    config: StoreConfig,
    stores: Vec<Box<B>>,
    observer: Option<Observer>,
}

/// Cache over node backends.
pub type NodeCache = Cache<dyn NodeBackend>;
/// Cache over rule backends.
pub type RuleCache = Cache<dyn RuleBackend>;

impl<B: ?Sized + StorageKind> Cache<B> {
    /// An empty registry. `config` is also used to build the fallback writer.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            stores: Vec::new(),
            observer: None,
        }
    }

    /// Notify `observer` after every load, save and miss.
    pub fn with_observer(mut self, observer: impl Fn(&CacheEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Register `backend` unless one of the same kind is already present.
    pub fn add_storage(&mut self, backend: Box<B>) -> bool {
        let kind = backend.kind();
        if self.stores.iter().any(|store| store.kind() == kind) {
            tracing::debug!(kind, "backend already registered");
            return false;
        }
        self.stores.push(backend);
        true
    }

    pub fn clear_storage(&mut self) {
        self.stores.clear();
    }

    /// Registered backend kinds, in registration order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.stores.iter().map(|store| store.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    fn notify(&self, event: CacheEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }

    /// True when any registered backend holds `record`.
    pub fn exists<R>(&self, record: &R) -> bool
    where
        B: Existence<R>,
    {
        self.stores.iter().any(|store| store.exists(record))
    }

    /// Load `record` from the first backend holding it.
    ///
    /// Returns false, leaving `record` unchanged, when no backend has it.
    pub fn read<R>(&self, record: &mut R) -> bool
    where
        B: Existence<R> + Loader<R>,
    {
        for store in &self.stores {
            if !store.exists(record) {
                continue;
            }
            if store.load_to(record) {
                tracing::debug!(backend = store.kind(), "cache read served");
                self.notify(CacheEvent::Loaded {
                    backend: store.kind(),
                });
                return true;
            }
        }
        self.notify(CacheEvent::Missed);
        false
    }

    /// Save `record` to the backend already holding it, or to a default
    /// tree-backed store when none does.
    pub fn write<R>(&self, record: &R) -> bool
    where
        B: Existence<R> + Saver<R>,
        R: TreeLayout,
    {
        if let Some(store) = self.stores.iter().find(|store| store.exists(record)) {
            let saved = store.save_from(record);
            if saved {
                self.notify(CacheEvent::Saved {
                    backend: store.kind(),
                });
            }
            return saved;
        }

        let fallback = TreeStorage::<R>::new(self.config.clone());
        tracing::debug!(backend = fallback.kind(), "cache write falling back to default store");
        let saved = fallback.save_from(record);
        if saved {
            self.notify(CacheEvent::Saved {
                backend: fallback.kind(),
            });
        }
        saved
    }

    /// Run every backend's bulk pass, in registration order.
    pub fn generate(&self) -> Vec<GenerateSummary>
    where
        B: BulkGenerator,
    {
        self.stores.iter().map(|store| store.generate()).collect()
    }

    /// First non-empty suffix expansion across backends.
    pub fn obtain_full_suffix(&self, locale: &str, suffix: &str) -> String
    where
        B: SuffixLookup,
    {
        let locale = self.config.effective_locale(locale);
        self.stores
            .iter()
            .map(|store| store.obtain_full_suffix(locale, suffix))
            .find(|full| !full.is_empty())
            .unwrap_or_default()
    }
}

impl<B: ?Sized + StorageKind + PseudoSource> Cache<B> {
    /// True when any backend can supply a pseudo record for `record`'s locale.
    pub fn is_pseudo(&self, record: &NodeRecord) -> bool {
        self.stores.iter().any(|store| store.has_pseudo(record))
    }

    /// Copy the first available pseudo template's flags onto `record`.
    pub fn pseudo(&self, record: &mut NodeRecord) -> bool {
        for store in &self.stores {
            if !store.has_pseudo(record) {
                continue;
            }
            if store.load_pseudo(record) {
                self.notify(CacheEvent::PseudoLoaded {
                    backend: store.kind(),
                });
                return true;
            }
        }
        self.notify(CacheEvent::Missed);
        false
    }
}

impl<B: ?Sized> std::fmt::Debug for Cache<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("stores", &self.stores.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_storage::NodeStorage;
    use lexistore_model::{Chain, Flags};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// In-memory node backend holding a fixed set of symbols.
    struct Fixed {
        kind: &'static str,
        symbols: Vec<String>,
        flag: &'static str,
        loads: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(kind: &'static str, symbols: &[&str], flag: &'static str) -> Self {
            Self {
                kind,
                symbols: symbols.iter().map(|s| s.to_string()).collect(),
                flag,
                loads: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl StorageKind for Fixed {
        fn kind(&self) -> &'static str {
            self.kind
        }
    }

    impl Existence<NodeRecord> for Fixed {
        fn exists(&self, record: &NodeRecord) -> bool {
            self.symbols
                .iter()
                .any(|s| lexistore_model::id_from_string(s) == record.id())
        }
    }

    impl Loader<NodeRecord> for Fixed {
        fn load_to(&self, record: &mut NodeRecord) -> bool {
            self.loads.fetch_add(1, Ordering::SeqCst);
            record.flags_mut().insert("source", self.flag);
            true
        }
    }

    impl Saver<NodeRecord> for Fixed {
        fn save_from(&self, _record: &NodeRecord) -> bool {
            true
        }
    }

    impl BulkGenerator for Fixed {
        fn generate(&self) -> GenerateSummary {
            GenerateSummary {
                kind: self.kind.to_string(),
                ..GenerateSummary::default()
            }
        }
    }

    impl PseudoSource for Fixed {
        fn has_pseudo(&self, _record: &NodeRecord) -> bool {
            self.kind == "pseudo"
        }

        fn load_pseudo(&self, record: &mut NodeRecord) -> bool {
            record.set_flags([("pos", "guess")].into_iter().collect::<Flags>());
            true
        }
    }

    impl SuffixLookup for Fixed {
        fn obtain_full_suffix(&self, _locale: &str, suffix: &str) -> String {
            if self.kind == "suffix" && suffix == "s" {
                "plural".to_string()
            } else {
                String::new()
            }
        }
    }

    fn cache() -> NodeCache {
        NodeCache::new(StoreConfig::new("/nonexistent/lexistore", "en"))
    }

    #[test]
    fn registration_is_idempotent_per_kind() {
        let mut cache = cache();
        assert!(cache.add_storage(Box::new(Fixed::new("a", &[], "a"))));
        assert!(!cache.add_storage(Box::new(Fixed::new("a", &["x"], "a2"))));
        assert!(cache.add_storage(Box::new(Fixed::new("b", &[], "b"))));
        assert_eq!(cache.kinds(), vec!["a", "b"]);

        cache.clear_storage();
        assert!(cache.is_empty());
    }

    #[test]
    fn read_falls_through_to_later_backend() {
        let mut cache = cache();
        let first = Fixed::new("first", &[], "first");
        let second = Fixed::new("second", &["run"], "second");
        let first_loads = first.loads.clone();
        cache.add_storage(Box::new(first));
        cache.add_storage(Box::new(second));

        let mut record = NodeRecord::new("run", "en");
        assert!(cache.exists(&record));
        assert!(cache.read(&mut record));
        assert_eq!(record.flags().get_all("source").collect::<Vec<_>>(), vec!["second"]);
        assert_eq!(first_loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_registered_holder_wins() {
        let mut cache = cache();
        cache.add_storage(Box::new(Fixed::new("first", &["run"], "first")));
        cache.add_storage(Box::new(Fixed::new("second", &["run"], "second")));

        let mut record = NodeRecord::new("run", "en");
        assert!(cache.read(&mut record));
        assert_eq!(record.flags().get_all("source").collect::<Vec<_>>(), vec!["first"]);
    }

    #[test]
    fn read_miss_leaves_record_untouched() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut cache = cache().with_observer(move |event| sink.lock().unwrap().push(*event));
        cache.add_storage(Box::new(Fixed::new("a", &["walk"], "a")));

        let mut record = NodeRecord::new("run", "en");
        let before = record.clone();
        assert!(!cache.read(&mut record));
        assert_eq!(record, before);
        assert_eq!(*events.lock().unwrap(), vec![CacheEvent::Missed]);
    }

    #[test]
    fn write_miss_uses_default_tree_store() {
        let dir = tempdir().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut cache = NodeCache::new(StoreConfig::new(dir.path(), "en"))
            .with_observer(move |event| sink.lock().unwrap().push(*event));
        cache.add_storage(Box::new(Fixed::new("memory", &["walk"], "m")));

        let mut record = NodeRecord::new("run", "en");
        record.flags_mut().insert("pos", "verb");
        assert!(cache.write(&record));

        let store = NodeStorage::new(StoreConfig::new(dir.path(), "en"));
        assert!(store.exists(&record));
        assert_eq!(
            *events.lock().unwrap(),
            vec![CacheEvent::Saved {
                backend: "tree-node"
            }]
        );
    }

    #[test]
    fn write_hit_goes_to_holder() {
        let dir = tempdir().unwrap();
        let mut cache = NodeCache::new(StoreConfig::new(dir.path(), "en"));
        cache.add_storage(Box::new(Fixed::new("memory", &["run"], "m")));

        assert!(cache.write(&NodeRecord::new("run", "en")));
        // The in-memory holder took the write; nothing reached the disk.
        assert!(!dir.path().join("en").exists());
    }

    #[test]
    fn pseudo_and_suffix_use_first_capable_backend() {
        let mut cache = cache();
        cache.add_storage(Box::new(Fixed::new("plain", &[], "p")));
        cache.add_storage(Box::new(Fixed::new("pseudo", &[], "p")));
        cache.add_storage(Box::new(Fixed::new("suffix", &[], "s")));

        let mut record = NodeRecord::new("zyzzyva", "en");
        assert!(cache.is_pseudo(&record));
        assert!(cache.pseudo(&mut record));
        assert_eq!(record.symbol(), "zyzzyva");
        assert_eq!(record.flags().get_all("pos").collect::<Vec<_>>(), vec!["guess"]);

        assert_eq!(cache.obtain_full_suffix("", "s"), "plural");
        assert_eq!(cache.obtain_full_suffix("en", "ed"), "");
    }

    #[test]
    fn generate_runs_every_backend() {
        let mut cache = cache();
        cache.add_storage(Box::new(Fixed::new("a", &[], "a")));
        cache.add_storage(Box::new(Fixed::new("b", &[], "b")));

        let kinds: Vec<_> = cache.generate().into_iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec!["a", "b"]);
    }

    #[test]
    fn rule_cache_writes_through_default_store() {
        let dir = tempdir().unwrap();
        let cache = RuleCache::new(StoreConfig::new(dir.path(), "en"));

        let mut chain = Chain::new("en", "NV");
        chain.bonds.push(lexistore_model::Bond::with_target("D"));
        assert!(cache.write(&chain));
        assert!(dir.path().join("en").join("grammar.xml").is_file());
    }
}
