//! Node file and locale master document formats.
//!
//! Node file (one per record, named by the record id):
//!
//! ```xml
//! <Data symbol="run" locale="en">
//!   <Flag guid="pos" link="verb"/>
//! </Data>
//! ```
//!
//! Locale master document (the compact seed `generate` expands):
//!
//! ```xml
//! <Storage locale="en">
//!   <Data symbol="run"><Flag guid="pos" link="verb"/></Data>
//!   <Data symbol="the"/>
//!   <Pseudo><Flag guid="pos" link="noun"/></Pseudo>
//!   <Mapping>
//!     <Suffix from="s" to="plural"/>
//!   </Mapping>
//! </Storage>
//! ```

use crate::error::{StoreError, StoreResult};
use crate::tree::{Document, NodeId};
use lexistore_model::{Flags, NodeRecord};
use std::path::Path;

pub const DATA_ELEMENT: &str = "Data";
pub const FLAG_ELEMENT: &str = "Flag";
pub const PSEUDO_ELEMENT: &str = "Pseudo";
pub const MAPPING_ELEMENT: &str = "Mapping";
pub const SUFFIX_ELEMENT: &str = "Suffix";
pub const MASTER_ROOT: &str = "Storage";

pub const SYMBOL_ATTRIBUTE: &str = "symbol";
pub const LOCALE_ATTRIBUTE: &str = "locale";
pub const FLAG_KEY_ATTRIBUTE: &str = "guid";
pub const FLAG_VALUE_ATTRIBUTE: &str = "link";
pub const SUFFIX_FROM_ATTRIBUTE: &str = "from";
pub const SUFFIX_TO_ATTRIBUTE: &str = "to";

// ============================================================================
// Flags
// ============================================================================

/// Flags listed as `Flag` children of `node`.
pub fn read_flags(doc: &Document, node: NodeId, path: &Path) -> StoreResult<Flags> {
    let mut flags = Flags::new();
    for flag in doc.children_named(node, FLAG_ELEMENT) {
        let key = doc.attribute(flag, FLAG_KEY_ATTRIBUTE);
        let value = doc.attribute(flag, FLAG_VALUE_ATTRIBUTE);
        match (key, value) {
            (Some(key), Some(value)) => flags.insert(key, value),
            _ => {
                return Err(StoreError::malformed(
                    path,
                    format!("`{FLAG_ELEMENT}` needs `{FLAG_KEY_ATTRIBUTE}` and `{FLAG_VALUE_ATTRIBUTE}`"),
                ))
            }
        }
    }
    Ok(flags)
}

fn write_flags(doc: &mut Document, node: NodeId, flags: &Flags) {
    for (key, value) in flags.iter() {
        let flag = doc.append_child(node, FLAG_ELEMENT);
        doc.set_attribute(flag, FLAG_KEY_ATTRIBUTE, key);
        doc.set_attribute(flag, FLAG_VALUE_ATTRIBUTE, value);
    }
}

// ============================================================================
// Node files
// ============================================================================

/// The full document for `record`'s node file.
pub fn node_document(record: &NodeRecord, locale: &str) -> Document {
    let mut doc = Document::new(DATA_ELEMENT);
    let root = doc.root();
    doc.set_attribute(root, SYMBOL_ATTRIBUTE, record.symbol());
    doc.set_attribute(root, LOCALE_ATTRIBUTE, locale);
    write_flags(&mut doc, root, record.flags());
    doc
}

/// Fill `record` from a node file document.
pub fn read_node_document(doc: &Document, record: &mut NodeRecord, path: &Path) -> StoreResult<()> {
    let root = doc.root();
    if doc.name(root) != DATA_ELEMENT {
        return Err(StoreError::malformed(
            path,
            format!("expected `{DATA_ELEMENT}` root, found `{}`", doc.name(root)),
        ));
    }
    let symbol = doc
        .attribute(root, SYMBOL_ATTRIBUTE)
        .ok_or_else(|| StoreError::malformed(path, "node has no symbol"))?;
    let flags = read_flags(doc, root, path)?;

    record.set_symbol(symbol);
    if let Some(locale) = doc.attribute(root, LOCALE_ATTRIBUTE) {
        record.set_locale(locale);
    }
    record.set_flags(flags);
    Ok(())
}

// ============================================================================
// Master documents
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEntry {
    pub symbol: String,
    pub flags: Flags,
}

/// Parsed locale master document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterDocument {
    pub locale: String,
    pub entries: Vec<MasterEntry>,
    pub pseudo: Option<Flags>,
    /// `(from, to)` suffix mappings in document order.
    pub suffixes: Vec<(String, String)>,
}

impl MasterDocument {
    pub fn from_document(doc: &Document, path: &Path) -> StoreResult<Self> {
        let root = doc.root();
        if doc.name(root) != MASTER_ROOT {
            return Err(StoreError::malformed(
                path,
                format!("expected `{MASTER_ROOT}` root, found `{}`", doc.name(root)),
            ));
        }

        let mut master = Self {
            locale: doc.attribute(root, LOCALE_ATTRIBUTE).unwrap_or_default().to_string(),
            ..Self::default()
        };

        for &child in doc.children(root) {
            match doc.name(child) {
                DATA_ELEMENT => {
                    let symbol = doc.attribute(child, SYMBOL_ATTRIBUTE).ok_or_else(|| {
                        StoreError::malformed(path, format!("`{DATA_ELEMENT}` entry has no symbol"))
                    })?;
                    master.entries.push(MasterEntry {
                        symbol: symbol.to_string(),
                        flags: read_flags(doc, child, path)?,
                    });
                }
                PSEUDO_ELEMENT => {
                    master.pseudo = Some(read_flags(doc, child, path)?);
                }
                MAPPING_ELEMENT => {
                    for suffix in doc.children_named(child, SUFFIX_ELEMENT) {
                        let from = doc.attribute(suffix, SUFFIX_FROM_ATTRIBUTE);
                        let to = doc.attribute(suffix, SUFFIX_TO_ATTRIBUTE);
                        if let (Some(from), Some(to)) = (from, to) {
                            master.suffixes.push((from.to_string(), to.to_string()));
                        } else {
                            tracing::warn!(
                                path = %path.display(),
                                "ignoring suffix mapping without from/to"
                            );
                        }
                    }
                }
                other => {
                    tracing::debug!(path = %path.display(), element = other, "ignoring unknown master element");
                }
            }
        }

        Ok(master)
    }

    /// Expanded form of `suffix`, if the mapping lists it.
    pub fn full_suffix(&self, suffix: &str) -> Option<&str> {
        self.suffixes
            .iter()
            .find(|(from, _)| from == suffix)
            .map(|(_, to)| to.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"
<Storage locale="en">
  <Data symbol="run">
    <Flag guid="pos" link="verb"/>
    <Flag guid="pos" link="noun"/>
  </Data>
  <Data symbol="the"/>
  <Pseudo>
    <Flag guid="pos" link="unknown"/>
  </Pseudo>
  <Mapping>
    <Suffix from="s" to="plural"/>
    <Suffix from="ing" to="progressive"/>
  </Mapping>
</Storage>"#;

    fn path() -> &'static Path {
        Path::new("locale.xml")
    }

    #[test]
    fn parses_master_sections() {
        let doc = Document::parse(MASTER).unwrap();
        let master = MasterDocument::from_document(&doc, path()).unwrap();

        assert_eq!(master.locale, "en");
        assert_eq!(master.entries.len(), 2);
        assert_eq!(master.entries[0].symbol, "run");
        assert_eq!(master.entries[0].flags.len(), 2);
        assert!(master.entries[1].flags.is_empty());
        assert_eq!(
            master.pseudo.as_ref().map(|f| f.get_all("pos").collect::<Vec<_>>()),
            Some(vec!["unknown"])
        );
        assert_eq!(master.full_suffix("ing"), Some("progressive"));
        assert_eq!(master.full_suffix("ed"), None);
    }

    #[test]
    fn rejects_entries_without_symbol() {
        let doc = Document::parse(r#"<Storage><Data><Flag guid="a" link="b"/></Data></Storage>"#)
            .unwrap();
        assert!(MasterDocument::from_document(&doc, path()).is_err());
    }

    #[test]
    fn rejects_wrong_root() {
        let doc = Document::parse("<Grammar/>").unwrap();
        assert!(MasterDocument::from_document(&doc, path()).is_err());
    }

    #[test]
    fn node_document_roundtrips_record() {
        let mut record = NodeRecord::new("Run", "en");
        record.flags_mut().insert("pos", "verb");
        record.flags_mut().insert("pos", "noun");

        let doc = Document::parse(&node_document(&record, "en").to_xml().unwrap()).unwrap();
        let mut loaded = NodeRecord::from_id(record.id(), "en");
        read_node_document(&doc, &mut loaded, path()).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn flag_without_link_is_malformed() {
        let doc = Document::parse(r#"<Data symbol="x"><Flag guid="a"/></Data>"#).unwrap();
        let mut record = NodeRecord::null();
        assert!(read_node_document(&doc, &mut record, path()).is_err());
        assert!(record.is_null());
    }
}
