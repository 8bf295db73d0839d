//! Sparse Poseidon Merkle tree over account leaves.
//!
//! Only populated nodes are stored. Anything else resolves to the root of an
//! empty subtree of the same height, with the empty leaf being zero.

use std::collections::HashMap;

use ark_bn254::Fr;
use thiserror::Error;

use crate::{circuit::hash::hash2, constants::MAX_TREE_DEPTH};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("tree depth must be between 1 and {max}, got {depth}")]
    Depth { depth: usize, max: usize },

    #[error("index {index} does not fit a tree of {capacity} leaves")]
    IndexOutOfRange { index: u64, capacity: u64 },
}

/// Sibling hashes from leaf level up to just below the root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    pub siblings: Vec<Fr>,
}

impl MerkleProof {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Root implied by placing `leaf` at `index` along this path.
    pub fn compute_root(&self, leaf: Fr, index: u64) -> Fr {
        self.siblings
            .iter()
            .enumerate()
            .fold(leaf, |current, (level, sibling)| {
                if (index >> level) & 1 == 1 {
                    hash2(*sibling, current)
                } else {
                    hash2(current, *sibling)
                }
            })
    }

    pub fn verify(&self, leaf: Fr, index: u64, root: Fr) -> bool {
        self.compute_root(leaf, index) == root
    }

    /// All-empty path for a tree of the given depth
    pub fn empty(depth: usize) -> Self {
        Self {
            siblings: empty_roots(depth).into_iter().take(depth).collect(),
        }
    }
}

/// empty[h] is the root of an all-empty subtree of height h, for h in 0..=depth
fn empty_roots(depth: usize) -> Vec<Fr> {
    let mut roots = Vec::with_capacity(depth + 1);
    roots.push(Fr::from(0u64));
    for h in 0..depth {
        let below = roots[h];
        roots.push(hash2(below, below));
    }
    roots
}

#[derive(Clone, Debug)]
pub struct AccountTree {
    depth: usize,
    /// levels[0] holds leaves, levels[depth] holds the root
    levels: Vec<HashMap<u64, Fr>>,
    empty: Vec<Fr>,
}

impl AccountTree {
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(TreeError::Depth {
                depth,
                max: MAX_TREE_DEPTH,
            });
        }
        Ok(Self {
            depth,
            levels: vec![HashMap::new(); depth + 1],
            empty: empty_roots(depth),
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn root(&self) -> Fr {
        self.node(self.depth, 0)
    }

    pub fn leaf(&self, index: u64) -> Fr {
        self.node(0, index)
    }

    fn node(&self, level: usize, position: u64) -> Fr {
        self.levels[level]
            .get(&position)
            .copied()
            .unwrap_or(self.empty[level])
    }

    fn check_index(&self, index: u64) -> Result<(), TreeError> {
        if index >= self.capacity() {
            return Err(TreeError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Write a leaf and rehash its path to the root.
    pub fn insert(&mut self, index: u64, leaf: Fr) -> Result<(), TreeError> {
        self.check_index(index)?;

        self.levels[0].insert(index, leaf);
        let mut position = index;
        for level in 0..self.depth {
            let parent = position >> 1;
            let left = self.node(level, parent << 1);
            let right = self.node(level, (parent << 1) | 1);
            self.levels[level + 1].insert(parent, hash2(left, right));
            position = parent;
        }
        Ok(())
    }

    pub fn proof(&self, index: u64) -> Result<MerkleProof, TreeError> {
        self.check_index(index)?;

        let siblings = (0..self.depth)
            .map(|level| self.node(level, (index >> level) ^ 1))
            .collect();
        Ok(MerkleProof { siblings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_root_matches_empty_path() {
        let tree = AccountTree::new(4).unwrap();
        let proof = MerkleProof::empty(4);
        assert_eq!(tree.root(), proof.compute_root(Fr::from(0u64), 9));
        assert_eq!(tree.proof(9).unwrap(), proof);
    }

    #[test]
    fn proofs_verify_after_updates() {
        let mut tree = AccountTree::new(5).unwrap();
        for (i, v) in [(0u64, 100u64), (1, 7), (17, 3), (31, 9)] {
            tree.insert(i, Fr::from(v)).unwrap();
        }
        let root = tree.root();
        for i in [0u64, 1, 17, 31, 2] {
            let proof = tree.proof(i).unwrap();
            assert_eq!(proof.depth(), 5);
            assert!(proof.verify(tree.leaf(i), i, root));
        }
    }

    #[test]
    fn updating_a_leaf_changes_the_root() {
        let mut tree = AccountTree::new(3).unwrap();
        tree.insert(2, Fr::from(1u64)).unwrap();
        let before = tree.root();
        tree.insert(2, Fr::from(2u64)).unwrap();
        assert_ne!(before, tree.root());

        // A leaf's own path does not depend on its value.
        let proof = tree.proof(2).unwrap();
        assert!(proof.verify(Fr::from(2u64), 2, tree.root()));
        assert!(!proof.verify(Fr::from(2u64), 2, before));
    }

    #[test]
    fn out_of_range_index() {
        let mut tree = AccountTree::new(3).unwrap();
        let err = tree.insert(8, Fr::from(1u64)).unwrap_err();
        assert_eq!(
            err,
            TreeError::IndexOutOfRange {
                index: 8,
                capacity: 8
            }
        );
        assert!(tree.proof(8).is_err());
    }

    #[test]
    fn depth_is_bounded() {
        assert_eq!(
            AccountTree::new(0).unwrap_err(),
            TreeError::Depth {
                depth: 0,
                max: MAX_TREE_DEPTH
            }
        );
        assert!(AccountTree::new(64).is_err());
        assert!(AccountTree::new(MAX_TREE_DEPTH + 1).is_err());

        let tree = AccountTree::new(MAX_TREE_DEPTH).unwrap();
        assert_eq!(tree.capacity(), 1u64 << MAX_TREE_DEPTH);
    }

    #[test]
    fn wrong_index_fails_verification() {
        let mut tree = AccountTree::new(3).unwrap();
        tree.insert(5, Fr::from(42u64)).unwrap();
        let proof = tree.proof(5).unwrap();
        assert!(!proof.verify(Fr::from(42u64), 4, tree.root()));
    }
}
