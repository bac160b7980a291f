//! Lexical node records.

use crate::digest::id_from_string;
use serde::{Deserialize, Serialize};

// ============================================================================
// Flags
// ============================================================================

/// Multi-valued flag mapping carried by a node.
///
/// A key may appear several times and insertion order carries no meaning:
/// two `Flags` are equal when they hold the same multiset of pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags {
    pairs: Vec<(String, String)>,
}

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one `key → value` pair (duplicates are kept).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// All values recorded under `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn sorted(&self) -> Vec<&(String, String)> {
        let mut pairs: Vec<_> = self.pairs.iter().collect();
        pairs.sort();
        pairs
    }
}

impl PartialEq for Flags {
    fn eq(&self, other: &Self) -> bool {
        self.pairs.len() == other.pairs.len() && self.sorted() == other.sorted()
    }
}

impl Eq for Flags {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Flags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// Node record
// ============================================================================

/// Persisted metadata for one lexical symbol.
///
/// `id` cannot be set on its own: it is recomputed from the symbol every time
/// the symbol changes. The only other way to obtain an id is [`NodeRecord::from_id`],
/// which builds a lookup key for a record whose symbol is not known yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    id: String,
    locale: String,
    symbol: String,
    flags: Flags,
}

impl NodeRecord {
    /// The distinguished "no data" record.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn new(symbol: impl Into<String>, locale: impl Into<String>) -> Self {
        let mut record = Self {
            locale: locale.into(),
            ..Self::default()
        };
        record.set_symbol(symbol);
        record
    }

    /// Lookup key for a record known only by id.
    pub fn from_id(id: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locale: locale.into(),
            ..Self::default()
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn set_symbol(&mut self, symbol: impl Into<String>) {
        self.symbol = symbol.into();
        self.id = id_from_string(&self.symbol);
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_follows_symbol() {
        let mut record = NodeRecord::new("Run", "en");
        assert_eq!(record.id(), id_from_string("run"));

        record.set_symbol("walk");
        assert_eq!(record.id(), id_from_string("WALK"));
    }

    #[test]
    fn null_record_is_null() {
        assert!(NodeRecord::null().is_null());
        assert!(!NodeRecord::new("a", "en").is_null());
        assert!(!NodeRecord::from_id("abc", "").is_null());
    }

    #[test]
    fn flags_compare_as_multiset() {
        let a: Flags = [("pos", "verb"), ("pos", "noun"), ("tense", "present")]
            .into_iter()
            .collect();
        let b: Flags = [("tense", "present"), ("pos", "noun"), ("pos", "verb")]
            .into_iter()
            .collect();
        let c: Flags = [("pos", "verb"), ("tense", "present")].into_iter().collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn flags_keep_duplicate_keys() {
        let mut flags = Flags::new();
        flags.insert("pos", "verb");
        flags.insert("pos", "noun");

        let values: Vec<_> = flags.get_all("pos").collect();
        assert_eq!(values, vec!["verb", "noun"]);
        assert!(flags.contains_key("pos"));
        assert!(!flags.contains_key("tense"));
    }
}
