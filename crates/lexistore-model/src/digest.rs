//! Content addressing for node records.
//!
//! A node's id is derived from its symbol and nothing else, so the same word
//! always lands in the same node file no matter who wrote it:
//!
//! - input: the symbol, lowercased (Unicode-aware)
//! - algorithm: SHA-256, truncated to the first 128 bits
//! - output: 32 lowercase hex digits
//!
//! Notes:
//! - The digest is an identity tool, not a security primitive. Collisions are
//!   tolerated by the store (the later writer simply owns the file).
//! - The encoding must stay stable across releases: persisted node files are
//!   named after it.

use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a node id.
pub const NODE_ID_BYTES: usize = 16;

/// Derive the content-addressed id for `symbol`.
///
/// Case-insensitive: `"Run"`, `"RUN"` and `"run"` share an id.
pub fn id_from_string(symbol: &str) -> String {
    let lowered = symbol.to_lowercase();
    let digest = Sha256::digest(lowered.as_bytes());

    let mut out = String::with_capacity(NODE_ID_BYTES * 2);
    for byte in &digest[..NODE_ID_BYTES] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn id_has_expected_width() {
        let id = id_from_string("wintermute");
        assert_eq!(id.len(), NODE_ID_BYTES * 2);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn id_is_case_insensitive() {
        assert_eq!(id_from_string("Run"), id_from_string("rUN"));
        assert_ne!(id_from_string("run"), id_from_string("ran"));
    }

    #[test]
    fn id_is_stable_for_known_input() {
        // First 16 bytes of SHA-256("abc").
        assert_eq!(id_from_string("ABC"), "ba7816bf8f01cfea414140de5dae2223");
    }

    proptest! {
        #[test]
        fn ids_agree_iff_lowercased_symbols_agree(a in "[A-Za-z]{0,6}", b in "[A-Za-z]{0,6}") {
            let same_symbol = a.to_lowercase() == b.to_lowercase();
            prop_assert_eq!(id_from_string(&a) == id_from_string(&b), same_symbol);
        }
    }
}
