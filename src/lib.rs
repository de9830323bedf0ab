//! Dense binary Merkle-Patricia trie committing to Starknet state.
//!
//! The Starknet state [specification] describes a *sparse* Merkle trie of
//! height 251 mapping field-element keys to field-element values. This crate
//! stores only the non-empty subtree, keying nodes on their path from the
//! root rather than on their hash. Lookups are a single storage access and
//! inserts touch O(log n) nodes, while the computed root commitment is
//! identical to the sparse trie's.
//!
//! The trie supports:
//! - O(1) value lookup by full key
//! - Insert, overwrite and delete (writing zero deletes the leaf and
//!   collapses its parent)
//! - A Pedersen-based root commitment recomputed incrementally on mutation
//! - Flexible storage backend through the [`Storage`] trait
//!
//! [specification]: https://docs.starknet.io/documentation/develop/State/starknet-state/

mod db;
mod error;
mod node;
mod path;
mod trie;

pub use db::{MemoryStorage, Storage};
pub use error::{DecodeError, TrieError};
pub use node::Node;
pub use path::Path;
pub use trie::{Trie, MAX_HEIGHT};

pub use starknet_types_core::felt::Felt;
pub use starknet_types_core::hash::{Pedersen, StarkHash};

#[cfg(test)]
mod tests;
