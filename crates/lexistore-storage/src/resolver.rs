//! Fuzzy rule resolution over a grammar tree.
//!
//! A grammar document is a tree of rule elements. Each element may carry a
//! `type` attribute; walking down the tree concatenates those attributes into
//! a type path (`N` → `NV` → `NVsb`). A query path is resolved to the first
//! element, depth-first in document order, whose accumulated path scores at
//! least the current acceptance minimum.
//!
//! The minimum starts at a perfect score. When a full walk finds nothing it is
//! lowered by one hundredth and the whole tree is walked again, until a match
//! is accepted or the next step would reach the floor `1 / len(query)`.
//! Every retry restarts from the root, so ties at a relaxed threshold are
//! still broken by document order.
//!
//! A resolved path is kept verbatim, so it can carry an ancestor's
//! alternatives (`Q,B` + `c` → `Q,Bc`). Such a path is not a fuzzy query: the
//! separator would be scored as a character. A query containing the separator
//! is first looked up as an exact element path, so loading a rule and saving
//! it back always lands on the same element.

use crate::tree::{Document, NodeId};
use lexistore_model::{Bond, Chain};

/// Element name of a bond inside a grammar document.
pub const BIND_ELEMENT: &str = "Bind";
/// Attribute holding an element's type segment.
pub const TYPE_ATTRIBUTE: &str = "type";
/// Separator between alternative types in a candidate.
pub const ALTERNATIVE_SEPARATOR: char = ',';

// ============================================================================
// Similarity
// ============================================================================

/// Number of query characters an alternative accounts for: every character
/// after the first that occurs in `token`, plus one if the first characters agree.
fn matched_characters(query: &[char], token: &str) -> usize {
    let Some((first, rest)) = query.split_first() else {
        return 0;
    };
    let contained = rest.iter().filter(|c| token.contains(**c)).count();
    let leading = usize::from(token.chars().next() == Some(*first));
    contained + leading
}

/// Best match count across the comma-separated alternatives of `candidate`.
fn best_match(query: &[char], candidate: &str) -> usize {
    candidate
        .split(ALTERNATIVE_SEPARATOR)
        .map(|token| matched_characters(query, token))
        .max()
        .unwrap_or(0)
}

/// Similarity of `query` to `candidate`, in `[0, 1]`.
///
/// `1.0` means the candidate shares the query's first character and contains
/// every other character of the query (case-sensitive).
pub fn matches(query: &str, candidate: &str) -> f64 {
    let query: Vec<char> = query.chars().collect();
    if query.is_empty() {
        return 0.0;
    }
    best_match(&query, candidate) as f64 / query.len() as f64
}

// ============================================================================
// Resolver
// ============================================================================

/// An accepted grammar element.
///
/// An element found by its exact path reports a score and threshold of `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub node: NodeId,
    /// Accumulated type path of the element.
    pub path: String,
    pub score: f64,
    /// Acceptance minimum the element was found at.
    pub threshold: f64,
}

/// Walks one grammar document.
pub struct RuleResolver<'d> {
    doc: &'d Document,
    walks: usize,
}

impl<'d> RuleResolver<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self { doc, walks: 0 }
    }

    /// Threshold walks performed so far (exact path lookups are not counted).
    pub fn walks(&self) -> usize {
        self.walks
    }

    pub fn resolve(&mut self, query_text: &str) -> Option<Resolution> {
        let query: Vec<char> = query_text.chars().collect();
        let len = query.len();
        if len == 0 {
            return None;
        }

        if query_text.contains(ALTERNATIVE_SEPARATOR) {
            if let Some(node) = self.find_path(self.doc.root(), "", query_text) {
                return Some(Resolution {
                    node,
                    path: query_text.to_string(),
                    score: 1.0,
                    threshold: 1.0,
                });
            }
        }

        let mut hundredths = 100usize;
        loop {
            self.walks += 1;
            if let Some(found) = self.walk(self.doc.root(), "", &query, hundredths) {
                return Some(found);
            }

            hundredths -= 1;
            // Stop once the following step would reach 1/len.
            if (hundredths - 1) * len < 100 {
                tracing::debug!(
                    query = %query_text,
                    walks = self.walks,
                    "rule resolution exhausted threshold"
                );
                return None;
            }
        }
    }

    /// First element, in document order, whose accumulated path is exactly `path`.
    fn find_path(&self, node: NodeId, prefix: &str, path: &str) -> Option<NodeId> {
        for &child in self.doc.children(node) {
            if self.doc.name(child) == BIND_ELEMENT {
                continue;
            }

            let Some(kind) = self.doc.attribute(child, TYPE_ATTRIBUTE) else {
                if let Some(found) = self.find_path(child, prefix, path) {
                    return Some(found);
                }
                continue;
            };

            let candidate = format!("{prefix}{kind}");
            if candidate == path {
                return Some(child);
            }
            if path.starts_with(candidate.as_str()) {
                if let Some(found) = self.find_path(child, &candidate, path) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn walk(
        &self,
        node: NodeId,
        prefix: &str,
        query: &[char],
        hundredths: usize,
    ) -> Option<Resolution> {
        for &child in self.doc.children(node) {
            if self.doc.name(child) == BIND_ELEMENT {
                continue;
            }

            let Some(kind) = self.doc.attribute(child, TYPE_ATTRIBUTE) else {
                if let Some(found) = self.walk(child, prefix, query, hundredths) {
                    return Some(found);
                }
                continue;
            };

            let path = format!("{prefix}{kind}");
            let matched = best_match(query, &path);
            if matched * 100 >= hundredths * query.len() {
                return Some(Resolution {
                    node: child,
                    score: matched as f64 / query.len() as f64,
                    threshold: hundredths as f64 / 100.0,
                    path,
                });
            }

            if let Some(found) = self.walk(child, &path, query, hundredths) {
                return Some(found);
            }
        }
        None
    }
}

// ============================================================================
// Bonds
// ============================================================================

pub(crate) fn bond_from_element(doc: &Document, node: NodeId) -> Bond {
    doc.attributes(node).collect()
}

/// Bonds declared directly on `node`.
pub fn own_bonds(doc: &Document, node: NodeId) -> Vec<Bond> {
    doc.children_named(node, BIND_ELEMENT)
        .map(|bind| bond_from_element(doc, bind))
        .collect()
}

/// Bonds of `node` followed by those of each ancestor up to the root, without
/// attribute-identical duplicates.
pub fn inherited_bonds(doc: &Document, node: NodeId) -> Vec<Bond> {
    let mut bonds: Vec<Bond> = Vec::new();
    for step in doc.path_to_root(node) {
        for bond in own_bonds(doc, step) {
            if !bonds.contains(&bond) {
                bonds.push(bond);
            }
        }
    }
    bonds
}

/// Resolve `chain.kind` against `doc` and fill the chain from the match.
///
/// On failure the chain is left exactly as it was.
pub fn resolve_chain(doc: &Document, chain: &mut Chain) -> Option<Resolution> {
    let mut resolver = RuleResolver::new(doc);
    let resolution = resolver.resolve(&chain.kind)?;
    chain.kind = resolution.path.clone();
    chain.bonds = inherited_bonds(doc, resolution.node);
    Some(resolution)
}
