//! Grammar rule values: bonds and chains.
//!
//! Both types double as the wire representation used when marshaling rules
//! across a process boundary:
//!
//! ```text
//! Chain: { "Locale": "en", "Type": "NVsb", "Bonds": [ { "with": "N", ... }, ... ] }
//! Bond:  { "with": "N", "<key>": "<value>", ... }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute key naming the element a bond links to.
pub const BOND_WITH: &str = "with";

// ============================================================================
// Bond
// ============================================================================

/// One candidate syntactic link: an ordered bag of attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bond {
    attributes: BTreeMap<String, String>,
}

impl Bond {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bond linking to `with`.
    pub fn with_target(with: impl Into<String>) -> Self {
        let mut bond = Self::new();
        bond.set_attribute(BOND_WITH, with);
        bond
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// The bonded element, if the bond names one.
    pub fn with(&self) -> Option<&str> {
        self.attribute(BOND_WITH)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_wire(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bond {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// Chain
// ============================================================================

/// A grammar rule instance: a type path plus its resolved (and inherited) bonds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Chain {
    pub locale: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default)]
    pub bonds: Vec<Bond>,
}

impl Chain {
    pub fn new(locale: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            kind: kind.into(),
            bonds: Vec::new(),
        }
    }

    /// Append `bond` unless an attribute-identical bond is already present.
    pub fn push_bond(&mut self, bond: Bond) -> bool {
        if self.bonds.contains(&bond) {
            return false;
        }
        self.bonds.push(bond);
        true
    }

    /// Collapse attribute-identical bonds, keeping the first occurrence.
    pub fn dedup_bonds(&mut self) {
        let mut kept: Vec<Bond> = Vec::with_capacity(self.bonds.len());
        for bond in self.bonds.drain(..) {
            if !kept.contains(&bond) {
                kept.push(bond);
            }
        }
        self.bonds = kept;
    }

    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_wire(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
