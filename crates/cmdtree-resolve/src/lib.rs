//! Command name resolution.
//!
//! Two structures cover the same set of command strings:
//! - [`CommandTree`]: the command hierarchy (names, aliases, locators, subcommands)
//! - [`CharacterTrie`]: one per tree node, indexing its children's names and aliases
//!   character by character for abbreviation lookup
//!
//! Both are built once and only read afterwards.

mod error;
pub mod trie;
pub mod tree;

pub use error::{ConfigError, ResolveError};
pub use trie::{CharacterTrie, Lookup};
pub use tree::{CommandModule, CommandNode, CommandTree, Resolved};

/// Index of a [`CommandNode`] inside its owning [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Canonical form of a command name or typed token: trimmed and lower-cased.
///
/// Used for both registration and lookup.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
