//! Dense Merkle-Patricia trie engine.

use std::fmt::Write;
use std::marker::PhantomData;

use log::trace;
use starknet_types_core::felt::Felt;
use starknet_types_core::hash::StarkHash;

use crate::{
    db::{MemoryStorage, Storage},
    error::TrieError,
    node::Node,
    path::Path,
};

/// Maximum supported trie height. Keys are felts, whose canonical form
/// fits in 251 bits.
pub const MAX_HEIGHT: usize = 251;

/// A node together with its storage key, as it appears on the spine from
/// the root to the point of mutation.
struct StorageNode {
    key: Path,
    node: Node,
}

/// A dense Merkle-Patricia trie: every stored internal node has exactly
/// two children, and zero-valued leaves are not stored at all.
///
/// Nodes are keyed on their path from the root rather than on their hash,
/// so a value lookup is a single storage access. The commitment folds each
/// node's relative path into its hash, which makes the root equal to the
/// root of the abstract sparse trie of the same height holding the same
/// entries.
///
/// The engine is synchronous and single-threaded; independent tries over
/// separate storage views may run in parallel. `root_key` is only updated
/// once every dependent storage write has succeeded, so a caller that
/// discards its transaction after an error keeps an in-memory root
/// consistent with storage.
pub struct Trie<S: Storage, H: StarkHash> {
    height: usize,
    root_key: Option<Path>,
    storage: S,
    _hasher: PhantomData<H>,
}

impl<S: Storage, H: StarkHash> Trie<S, H> {
    /// Creates a trie of the given height over `storage`, resuming from
    /// `root_key` when the store already holds a trie.
    ///
    /// `height` must be in `1..=MAX_HEIGHT` and must match the height used
    /// for every previous write to the same store; all node keys are
    /// relative to it.
    pub fn new(storage: S, height: usize, root_key: Option<Path>) -> Self {
        assert!(
            (1..=MAX_HEIGHT).contains(&height),
            "trie height must be in 1..={MAX_HEIGHT}"
        );
        Self {
            height,
            root_key,
            storage,
            _hasher: PhantomData,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Storage key of the root node, for external checkpointing. `None`
    /// iff the trie is empty.
    pub fn root_key(&self) -> Option<&Path> {
        self.root_key.as_ref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The storage key of the leaf holding `key`'s value.
    pub fn key_path(&self, key: &Felt) -> Path {
        Path::from_felt(key, self.height)
    }

    /// The value stored under `key`. Absence surfaces as
    /// [`TrieError::NotFound`]; callers may treat it as zero.
    pub fn get(&self, key: &Felt) -> Result<Felt, TrieError<S::Error>> {
        let node = self.storage.get(&self.key_path(key))?;
        Ok(node.value)
    }

    /// Writes `value` under `key`, updating the commitment of every
    /// affected ancestor. Writing zero deletes the leaf and collapses its
    /// parent into the surviving sibling.
    pub fn put(&mut self, key: &Felt, value: &Felt) -> Result<(), TrieError<S::Error>> {
        let node_key = self.key_path(key);

        // empty trie, the new leaf is the root
        if self.root_key.is_none() {
            if *value == Felt::ZERO {
                return Ok(());
            }
            trace!("put: new root leaf at \"{node_key}\"");
            let mut spine = vec![StorageNode {
                key: node_key.clone(),
                node: Node::leaf(*value),
            }];
            self.propagate(&mut spine)?;
            self.root_key = Some(node_key);
            return Ok(());
        }

        let mut spine = self.nodes_from_root(&node_key)?;
        let last_key = match spine.last() {
            Some(last) => last.key.clone(),
            None => return Err(TrieError::Invariant("descent returned no nodes")),
        };

        // the key already holds a leaf: overwrite or delete
        if last_key == node_key {
            if *value == Felt::ZERO {
                trace!("put: delete leaf at \"{node_key}\"");
                self.root_key = self.delete_last(spine)?;
            } else {
                trace!("put: replace leaf at \"{node_key}\"");
                if let Some(last) = spine.last_mut() {
                    last.node.value = *value;
                }
                self.propagate(&mut spine)?;
            }
            return Ok(());
        }

        // writing zero to an absent key leaves the trie untouched
        if *value == Felt::ZERO {
            return Ok(());
        }

        // Split at the divergent bit: a fresh internal node at the common
        // prefix adopts the old sibling and the new leaf. Its value is a
        // placeholder until propagate recomputes the spine.
        let (common_key, _) = Path::common_prefix(&node_key, &last_key);
        trace!("put: insert leaf at \"{node_key}\", split at \"{common_key}\"");
        let mut parent = Node {
            value: Felt::ZERO,
            left: None,
            right: None,
        };
        if node_key.bit(common_key.len()) {
            parent.left = Some(last_key.clone());
            parent.right = Some(node_key.clone());
        } else {
            parent.left = Some(node_key.clone());
            parent.right = Some(last_key.clone());
        }

        let make_root = spine.len() == 1;
        if !make_root {
            // replace the grandparent's link to the sibling with the new parent
            let grandparent_idx = spine.len() - 2;
            let grandparent = &mut spine[grandparent_idx];
            if grandparent.node.left.as_ref() == Some(&last_key) {
                grandparent.node.left = Some(common_key.clone());
            } else {
                grandparent.node.right = Some(common_key.clone());
            }
        }

        let last_idx = spine.len() - 1;
        spine[last_idx] = StorageNode {
            key: common_key.clone(),
            node: parent,
        };
        spine.push(StorageNode {
            key: node_key,
            node: Node::leaf(*value),
        });

        self.propagate(&mut spine)?;
        if make_root {
            self.root_key = Some(common_key);
        }
        Ok(())
    }

    /// The commitment of the whole trie. An empty trie commits to zero.
    pub fn root(&self) -> Result<Felt, TrieError<S::Error>> {
        let Some(root_key) = &self.root_key else {
            return Ok(Felt::ZERO);
        };
        let root = self.storage.get(root_key)?;
        // the root has no parent, its relative path is its whole key
        Ok(root.hash::<H>(root_key))
    }

    /// Enumerates the nodes traversed from the root toward `target`,
    /// root first. The last entry is the leaf at `target`, or the node
    /// where the descent diverged (the future sibling of an insert).
    fn nodes_from_root(&self, target: &Path) -> Result<Vec<StorageNode>, TrieError<S::Error>> {
        let mut nodes = Vec::new();
        let mut cur = self.root_key.clone();
        while let Some(key) = cur {
            let node = self.storage.get(&key)?;
            let (_, subset) = Path::common_prefix(target, &key);
            cur = if key.len() >= target.len() || !subset {
                None
            } else {
                let next = if target.bit(key.len()) {
                    node.right.clone()
                } else {
                    node.left.clone()
                };
                if next.is_none() {
                    return Err(TrieError::Invariant("descent passed through a childless node"));
                }
                next
            };
            nodes.push(StorageNode { key, node });
        }
        Ok(nodes)
    }

    /// Recomputes the commitment of every internal node on the spine,
    /// deepest first, and writes the spine back to storage. Ancestors off
    /// the spine keep their values: their subtrees are untouched.
    fn propagate(&mut self, spine: &mut [StorageNode]) -> Result<(), TrieError<S::Error>> {
        for idx in (0..spine.len()).rev() {
            let children = (spine[idx].node.left.clone(), spine[idx].node.right.clone());
            match children {
                (Some(left_key), Some(right_key)) => {
                    let parent_len = spine[idx].key.len();
                    if left_key.len() <= parent_len || right_key.len() <= parent_len {
                        return Err(TrieError::Invariant("child key no longer than its parent"));
                    }
                    let left = self.storage.get(&left_key)?;
                    let right = self.storage.get(&right_key)?;
                    let left_hash = left.hash::<H>(&left_key.suffix(parent_len));
                    let right_hash = right.hash::<H>(&right_key.suffix(parent_len));
                    spine[idx].node.value = H::hash(&left_hash, &right_hash);
                }
                (None, None) => {}
                _ => return Err(TrieError::Invariant("node has exactly one child")),
            }
            let entry = &spine[idx];
            self.storage.put(&entry.key, &entry.node)?;
        }
        Ok(())
    }

    /// Deletes the leaf at the end of the spine and collapses its parent,
    /// now unary, into the surviving sibling. Returns the root key the
    /// trie should adopt on success.
    fn delete_last(
        &mut self,
        mut spine: Vec<StorageNode>,
    ) -> Result<Option<Path>, TrieError<S::Error>> {
        let Some(last) = spine.pop() else {
            return Err(TrieError::Invariant("delete on an empty spine"));
        };
        self.storage.delete(&last.key)?;

        // the deleted leaf was the root
        if spine.is_empty() {
            return Ok(None);
        }

        let Some(parent) = spine.pop() else {
            return Err(TrieError::Invariant("spine lost the parent node"));
        };
        self.storage.delete(&parent.key)?;

        let sibling_key = if parent.node.left.as_ref() == Some(&last.key) {
            parent.node.right
        } else {
            parent.node.left
        };
        let Some(sibling_key) = sibling_key else {
            return Err(TrieError::Invariant("collapsed node has no sibling"));
        };
        trace!("collapse: \"{}\" absorbs \"{}\"", sibling_key, parent.key);

        // No grandparent: the sibling becomes the root. Its stored value is
        // already the commitment of its subtree, so nothing is re-hashed.
        if spine.is_empty() {
            return Ok(Some(sibling_key));
        }

        // replace the grandparent's link to the parent with the sibling
        let grandparent_idx = spine.len() - 1;
        let grandparent = &mut spine[grandparent_idx];
        if grandparent.node.left.as_ref() == Some(&parent.key) {
            grandparent.node.left = Some(sibling_key.clone());
        } else {
            grandparent.node.right = Some(sibling_key.clone());
        }

        let sibling = self.storage.get(&sibling_key)?;
        spine.push(StorageNode {
            key: sibling_key,
            node: sibling,
        });
        self.propagate(&mut spine)?;
        Ok(self.root_key.clone())
    }

    /// Renders the reachable tree in a human-readable indented form, one
    /// node per line with its storage key, relative path and value.
    pub fn dump(&self) -> Result<String, TrieError<S::Error>> {
        let mut out = String::new();
        self.dump_node(&mut out, self.root_key.as_ref(), None, 0)?;
        Ok(out)
    }

    fn dump_node(
        &self,
        out: &mut String,
        key: Option<&Path>,
        parent: Option<&Path>,
        depth: usize,
    ) -> Result<(), TrieError<S::Error>> {
        let indent = "  ".repeat(depth);
        let Some(key) = key else {
            let _ = writeln!(out, "{indent}EMPTY");
            return Ok(());
        };
        let node = self.storage.get(key)?;
        let path = match parent {
            Some(parent) => key.suffix(parent.len()),
            None => key.clone(),
        };
        let _ = writeln!(
            out,
            "{indent}key: \"{key}\" ({}) path: \"{path}\" ({}) value: {:#x}",
            key.len(),
            path.len(),
            node.value
        );
        if node.is_leaf() {
            return Ok(());
        }
        self.dump_node(out, node.left.as_ref(), Some(key), depth + 1)?;
        self.dump_node(out, node.right.as_ref(), Some(key), depth + 1)
    }
}

impl<H: StarkHash> Trie<MemoryStorage, H> {
    /// An empty trie over fresh in-memory storage, for tests and scratch
    /// commitment computations.
    pub fn in_memory(height: usize) -> Self {
        Self::new(MemoryStorage::new(), height, None)
    }
}

#[cfg(test)]
mod test {
    use starknet_types_core::hash::Pedersen;

    use super::{Felt, MemoryStorage, Node, Path, Storage, Trie, TrieError};

    #[test]
    fn test_get_on_empty_trie() {
        let trie = Trie::<MemoryStorage, Pedersen>::in_memory(8);
        assert_eq!(trie.get(&Felt::ONE), Err(TrieError::NotFound));
    }

    #[test]
    fn test_dump_renders_empty_marker() {
        let trie = Trie::<MemoryStorage, Pedersen>::in_memory(8);
        assert_eq!(trie.dump().unwrap(), "EMPTY\n");
    }

    #[test]
    fn test_dump_indents_children() {
        let mut trie = Trie::<MemoryStorage, Pedersen>::in_memory(3);
        trie.put(&Felt::from(0b101u64), &Felt::from(7u64)).unwrap();
        trie.put(&Felt::from(0b100u64), &Felt::from(9u64)).unwrap();

        let dump = trie.dump().unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("key: \"10\" (2) path: \"10\" (2)"));
        assert!(lines[1].starts_with("  key: \"100\" (3) path: \"\" (0)"));
        assert!(lines[2].starts_with("  key: \"101\" (3) path: \"\" (0)"));
    }

    /// Storage that refuses every operation, standing in for a broken
    /// backend.
    struct FailingStorage;

    impl Storage for FailingStorage {
        type Error = &'static str;

        fn get(&self, _key: &Path) -> Result<Node, TrieError<Self::Error>> {
            Err(TrieError::Storage("backend down"))
        }

        fn put(&mut self, _key: &Path, _node: &Node) -> Result<(), TrieError<Self::Error>> {
            Err(TrieError::Storage("backend down"))
        }

        fn delete(&mut self, _key: &Path) -> Result<(), TrieError<Self::Error>> {
            Err(TrieError::Storage("backend down"))
        }
    }

    #[test]
    fn test_failed_put_leaves_root_key_unchanged() {
        let mut trie = Trie::<FailingStorage, Pedersen>::new(FailingStorage, 8, None);
        assert_eq!(
            trie.put(&Felt::ONE, &Felt::ONE),
            Err(TrieError::Storage("backend down"))
        );
        assert!(trie.root_key().is_none());
    }
}
