//! Error types for the dense Merkle-Patricia trie

use thiserror::Error;

/// Error type for trie operations, generic over the storage backend's
/// own error type.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum TrieError<E> {
    /// The requested node is absent from storage
    #[error("node not found in storage")]
    NotFound,
    /// The storage backend failed
    #[error("storage backend failure")]
    Storage(E),
    /// Stored node bytes failed structural decode, indicating corruption
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A structural invariant of the trie does not hold; the current
    /// mutation is aborted and the caller should abandon its transaction
    #[error("trie invariant violated: {0}")]
    Invariant(&'static str),
}

/// Structural failure while decoding a [`Node`](crate::Node) from bytes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum DecodeError {
    /// The encoding ends before all fields are read
    #[error("node encoding ends prematurely")]
    UnexpectedEnd,
    /// Bytes remain after the last field
    #[error("node encoding has trailing bytes")]
    TrailingBytes,
    /// Unused bits in a packed path's final byte are not zero
    #[error("child path padding bits are not zero")]
    DirtyPadding,
    /// Exactly one child pointer is present
    #[error("node has exactly one child")]
    LoneChild,
}
