//! Merkle trees over fixed-size leaf blocks.
//!
//! Leaves digest `0x00 ‖ block`, inner nodes `0x01 ‖ left ‖ right`. An odd
//! node at any level is promoted unchanged: a wrapper node reuses its
//! digest instead of pairing it with itself. The empty input is a single
//! leaf over the empty block.

use std::{
    collections::VecDeque,
    io::{self, Read},
};

use thiserror::Error;

use super::HashMethod;

/// Leaf block size in bytes.
pub const SEGMENT: usize = 1024;

const LEAF_PREFIX: &[u8] = &[0x00];
const INNER_PREFIX: &[u8] = &[0x01];

#[derive(Clone, Debug, Eq, PartialEq)]
struct Node {
    digest: Vec<u8>,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(digest: Vec<u8>) -> Self {
        Self {
            digest,
            left: None,
            right: None,
        }
    }
}

/// A Merkle tree built with one of the registered hash methods.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    method: &'static HashMethod,
    root: Node,
}

impl MerkleTree {
    /// Hashes a complete in-memory buffer.
    pub fn from_bytes(method: &'static HashMethod, data: &[u8]) -> Self {
        let leaves = data
            .chunks(SEGMENT)
            .map(|block| Node::leaf(method.digest(&[LEAF_PREFIX, block])))
            .collect();

        Self {
            method,
            root: build(method, leaves),
        }
    }

    /// Hashes a reader in streaming fashion, holding only the leaf digests.
    pub fn from_reader(method: &'static HashMethod, mut reader: impl Read) -> io::Result<Self> {
        let mut leaves = Vec::new();
        let mut block = [0u8; SEGMENT];
        let mut filled = 0;

        loop {
            match reader.read(&mut block[filled..])? {
                0 => {
                    if filled > 0 {
                        leaves.push(Node::leaf(method.digest(&[LEAF_PREFIX, &block[..filled]])));
                    }
                    break;
                }
                n => {
                    filled += n;

                    if filled == SEGMENT {
                        leaves.push(Node::leaf(method.digest(&[LEAF_PREFIX, &block])));
                        filled = 0;
                    }
                }
            }
        }

        Ok(Self {
            method,
            root: build(method, leaves),
        })
    }

    pub fn method(&self) -> &'static HashMethod {
        self.method
    }

    pub fn root_digest(&self) -> &[u8] {
        &self.root.digest
    }

    /// The unpadded Base32 form of the root digest, 39 characters for
    /// Tiger.
    pub fn root_base32(&self) -> String {
        data_encoding::BASE32_NOPAD.encode(&self.root.digest)
    }

    /// Number of levels, 1 for a single-node tree.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut node = &self.root;

        // The left spine is always a deepest path.
        while let Some(left) = &node.left {
            depth += 1;
            node = left;
        }

        depth
    }

    /// Serializes every node digest in breadth-first order from the root.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([&self.root]);

        while let Some(node) = queue.pop_front() {
            out.extend_from_slice(&node.digest);

            if let Some(left) = &node.left {
                queue.push_back(left);
            }
            if let Some(right) = &node.right {
                queue.push_back(right);
            }
        }

        out
    }

    /// Rebuilds a tree from its breadth-first serialization.
    ///
    /// The per-level node counts are not stored in the serialized form, so
    /// the caller must supply the tree's depth.
    pub fn deserialize(
        method: &'static HashMethod,
        data: &[u8],
        depth: usize,
    ) -> Result<Self, MerkleShapeError> {
        if data.is_empty() || data.len() % method.size != 0 {
            return Err(MerkleShapeError::NotAligned {
                length: data.len(),
                digest_size: method.size,
            });
        }

        let count = data.len() / method.size;
        let sizes = level_sizes(count, depth)?;

        let mut position = data.len();
        let mut lower: Vec<Node> = Vec::new();

        // Levels are laid out root first; consume them from the back so the
        // leaves come first.
        for size in sizes.iter().copied() {
            position -= size * method.size;
            let level = &data[position..position + size * method.size];

            let mut children = lower.into_iter();
            let mut nodes = Vec::with_capacity(size);

            for digest in level.chunks(method.size) {
                nodes.push(Node {
                    digest: digest.to_vec(),
                    left: children.next().map(Box::new),
                    right: children.next().map(Box::new),
                });
            }

            lower = nodes;
        }

        // # Safety
        //
        // `unwrap` can't panic: `level_sizes` guarantees the top level has
        // exactly one node.
        let root = lower.pop().unwrap();

        Ok(Self { method, root })
    }
}

/// Structural equality: matching digests all the way down.
impl PartialEq for MerkleTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for MerkleTree {}

fn build(method: &'static HashMethod, mut nodes: Vec<Node>) -> Node {
    if nodes.is_empty() {
        nodes.push(Node::leaf(method.digest(&[LEAF_PREFIX])));
    }

    while nodes.len() > 1 {
        let mut paired = Vec::with_capacity(nodes.len() / 2 + 1);
        let mut iter = nodes.into_iter();

        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => {
                    let digest = method.digest(&[INNER_PREFIX, &left.digest, &right.digest]);
                    paired.push(Node {
                        digest,
                        left: Some(Box::new(left)),
                        right: Some(Box::new(right)),
                    });
                }
                // Odd node: promoted unchanged to the next level.
                None => paired.push(Node {
                    digest: left.digest.clone(),
                    left: Some(Box::new(left)),
                    right: None,
                }),
            }
        }

        nodes = paired;
    }

    nodes.remove(0)
}

/// Bottom-up level sizes of a tree with `count` nodes and `depth` levels.
///
/// The leaf count determines the whole shape (each level is the rounded-up
/// half of the one below), and the total node count grows strictly with the
/// leaf count, so a binary search recovers it.
fn level_sizes(count: usize, depth: usize) -> Result<Vec<usize>, MerkleShapeError> {
    let mismatch = MerkleShapeError::ShapeMismatch { count, depth };

    if depth == 0 {
        return Err(mismatch);
    }

    if depth == 1 {
        if count != 1 {
            return Err(mismatch);
        }
        return Ok(vec![1]);
    }

    let chain = |leaves: usize| {
        let mut sizes = vec![leaves];
        let mut level = leaves;

        while level > 1 {
            level = level / 2 + level % 2;
            sizes.push(level);
        }

        sizes
    };

    let total = |leaves: usize| chain(leaves).iter().sum::<usize>();

    let (mut low, mut high) = (1usize, count);

    while low < high {
        let mid = low + (high - low) / 2;

        if total(mid) < count {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    let sizes = chain(low);

    if total(low) != count || sizes.len() != depth {
        return Err(mismatch);
    }

    Ok(sizes)
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum MerkleShapeError {
    #[error("{length} bytes is not a whole number of {digest_size}-byte digests")]
    NotAligned { length: usize, digest_size: usize },
    #[error("No tree of depth {depth} has {count} nodes")]
    ShapeMismatch { count: usize, depth: usize },
}
