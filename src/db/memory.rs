use std::collections::HashMap;

use crate::{db::Storage, error::TrieError, node::Node, path::Path};

/// A simple in-memory storage implementation for tests and scratch
/// commitment computations.
///
/// Nodes are held in their canonical byte encoding, so every access also
/// exercises the codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    nodes: HashMap<Path, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes, orphans included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Storage for MemoryStorage {
    type Error = ();

    fn get(&self, key: &Path) -> Result<Node, TrieError<Self::Error>> {
        let bytes = self.nodes.get(key).ok_or(TrieError::NotFound)?;
        Ok(Node::from_bytes(bytes)?)
    }

    fn put(&mut self, key: &Path, node: &Node) -> Result<(), TrieError<Self::Error>> {
        self.nodes.insert(key.clone(), node.to_bytes());
        Ok(())
    }

    fn delete(&mut self, key: &Path) -> Result<(), TrieError<Self::Error>> {
        self.nodes.remove(key);
        Ok(())
    }
}
