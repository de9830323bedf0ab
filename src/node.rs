//! Trie node record and its on-disk codec.

use std::fmt;

use starknet_types_core::felt::Felt;
use starknet_types_core::hash::StarkHash;

use crate::{error::DecodeError, path::Path};

/// A single trie record.
///
/// A node is either a leaf (both children absent, `value` is the
/// user-written felt) or an internal node (both children present, `value`
/// is the commitment of the subtree). Children are referenced by their
/// storage keys, never by in-memory pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub value: Felt,
    pub left: Option<Path>,
    pub right: Option<Path>,
}

impl Node {
    /// A leaf holding `value`.
    pub fn leaf(value: Felt) -> Self {
        Self {
            value,
            left: None,
            right: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none()
    }

    /// The node's contribution to its parent's commitment, given its path
    /// relative to that parent.
    ///
    /// An empty relative path contributes the stored `value` directly.
    /// A non-empty path folds the skipped levels in by hashing the value
    /// with the path bits and adding the path length, per the Starknet
    /// state specification. Collapsing this to a plain two-child hash
    /// changes the commitment.
    pub fn hash<H: StarkHash>(&self, path: &Path) -> Felt {
        if path.is_empty() {
            return self.value;
        }
        H::hash(&self.value, &path.to_felt()) + Felt::from(path.len() as u64)
    }

    /// Canonical byte encoding: the 32-byte big-endian `value` followed by
    /// the two optional child paths, each a 1-byte bit-length tag (0 when
    /// absent) and the packed path bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 2 * (1 + 32));
        out.extend_from_slice(&self.value.to_bytes_be());
        encode_child(&mut out, self.left.as_ref());
        encode_child(&mut out, self.right.as_ref());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 32 {
            return Err(DecodeError::UnexpectedEnd);
        }
        let (value_bytes, rest) = bytes.split_at(32);
        let mut value = [0u8; 32];
        value.copy_from_slice(value_bytes);

        let (left, rest) = decode_child(rest)?;
        let (right, rest) = decode_child(rest)?;
        if !rest.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }
        if left.is_some() != right.is_some() {
            return Err(DecodeError::LoneChild);
        }
        Ok(Self {
            value: Felt::from_bytes_be(&value),
            left,
            right,
        })
    }
}

fn encode_child(out: &mut Vec<u8>, child: Option<&Path>) {
    match child {
        None => out.push(0),
        Some(path) => {
            out.push(path.len() as u8);
            out.extend_from_slice(&path.to_packed_bytes());
        }
    }
}

fn decode_child(bytes: &[u8]) -> Result<(Option<Path>, &[u8]), DecodeError> {
    let (&tag, rest) = bytes.split_first().ok_or(DecodeError::UnexpectedEnd)?;
    if tag == 0 {
        return Ok((None, rest));
    }
    let bit_len = tag as usize;
    let byte_len = (bit_len + 7) / 8;
    if rest.len() < byte_len {
        return Err(DecodeError::UnexpectedEnd);
    }
    let (packed, rest) = rest.split_at(byte_len);
    let path = Path::from_packed_bytes(bit_len, packed).ok_or(DecodeError::DirtyPadding)?;
    Ok((Some(path), rest))
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => write!(
                f,
                "Internal {{ value: {:#x}, left: \"{left}\", right: \"{right}\" }}",
                self.value
            ),
            _ => write!(f, "Leaf {{ value: {:#x} }}", self.value),
        }
    }
}
