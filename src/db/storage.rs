//! Storage trait for trie nodes

use crate::{error::TrieError, node::Node, path::Path};

/// Persistent storage for trie nodes, keyed by their full path from the
/// root.
///
/// The trie owns a storage view but not its transactional boundaries: all
/// calls run inside whatever transaction the caller supplies, and a failed
/// mutation is undone by the caller discarding that transaction.
pub trait Storage {
    /// The error type for backend failures
    type Error;

    /// Get the node stored under `key`. An absent key is
    /// [`TrieError::NotFound`], distinct from a backend failure.
    fn get(&self, key: &Path) -> Result<Node, TrieError<Self::Error>>;

    /// Insert or overwrite the node under `key`.
    fn put(&mut self, key: &Path, node: &Node) -> Result<(), TrieError<Self::Error>>;

    /// Remove the node under `key`. Missing keys are tolerated.
    fn delete(&mut self, key: &Path) -> Result<(), TrieError<Self::Error>>;
}
