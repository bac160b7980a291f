//! Lexistore record model
//!
//! Value types shared by every storage backend:
//!
//! - [`NodeRecord`]: a lexical symbol with its content-addressed id and flags.
//! - [`Bond`] / [`Chain`]: grammar rules (a type path plus the bonds it carries).
//! - [`id_from_string`]: the content addressing scheme node files are named by.
//!
//! Records are plain data. Backends fill them in place on load and read them
//! without retaining references on save.

pub mod digest;
pub mod node;
pub mod rule;

pub use digest::id_from_string;
pub use node::{Flags, NodeRecord};
pub use rule::{Bond, Chain, BOND_WITH};
