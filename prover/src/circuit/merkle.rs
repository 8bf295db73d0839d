use ark_bn254::Fr;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::{circuit::hash::hash2_var, tree::MerkleProof};

/// Sibling hashes of an inclusion proof, allocated as private witnesses.
#[derive(Clone, Debug)]
pub struct MerklePathVar {
    pub siblings: Vec<FpVar<Fr>>,
}

impl MerklePathVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        proof: &MerkleProof,
    ) -> Result<Self, SynthesisError> {
        let siblings = proof
            .siblings
            .iter()
            .map(|sibling| FpVar::new_witness(cs.clone(), || Ok(*sibling)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { siblings })
    }
}

/// Fold a leaf up to the root.
///
/// `index_bits` is the leaf position, least significant bit first. A set bit
/// means the running node is the right child at that level.
pub fn compute_root(
    cs: ConstraintSystemRef<Fr>,
    leaf: &FpVar<Fr>,
    index_bits: &[Boolean<Fr>],
    path: &MerklePathVar,
) -> Result<FpVar<Fr>, SynthesisError> {
    if index_bits.len() != path.siblings.len() {
        return Err(SynthesisError::Unsatisfiable);
    }

    let mut current = leaf.clone();
    for (is_right, sibling) in index_bits.iter().zip(&path.siblings) {
        let left = FpVar::conditionally_select(is_right, sibling, &current)?;
        let right = FpVar::conditionally_select(is_right, &current, sibling)?;
        current = hash2_var(cs.clone(), &left, &right)?;
    }
    Ok(current)
}

/// Enforce that `leaf` sits at `index_bits` under `root`.
pub fn enforce_membership(
    cs: ConstraintSystemRef<Fr>,
    root: &FpVar<Fr>,
    leaf: &FpVar<Fr>,
    index_bits: &[Boolean<Fr>],
    path: &MerklePathVar,
) -> Result<(), SynthesisError> {
    compute_root(cs, leaf, index_bits, path)?.enforce_equal(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::range::enforce_bits;
    use crate::tree::AccountTree;
    use ark_relations::r1cs::ConstraintSystem;

    fn populated_tree() -> AccountTree {
        let mut tree = AccountTree::new(3).unwrap();
        tree.insert(0, Fr::from(10u64)).unwrap();
        tree.insert(5, Fr::from(55u64)).unwrap();
        tree.insert(6, Fr::from(66u64)).unwrap();
        tree
    }

    fn check(tree: &AccountTree, index: u64, leaf: Fr, claimed_index: u64) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let proof = tree.proof(index).unwrap();

        let root = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
        let leaf = FpVar::new_witness(cs.clone(), || Ok(leaf)).unwrap();
        let index = FpVar::new_witness(cs.clone(), || Ok(Fr::from(claimed_index))).unwrap();
        let bits = enforce_bits(cs.clone(), &index, tree.depth()).unwrap();
        let path = MerklePathVar::new_witness(cs.clone(), &proof).unwrap();

        enforce_membership(cs.clone(), &root, &leaf, &bits, &path).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn accepts_committed_leaf() {
        let tree = populated_tree();
        assert!(check(&tree, 5, Fr::from(55u64), 5));
        assert!(check(&tree, 0, Fr::from(10u64), 0));
    }

    #[test]
    fn accepts_empty_slot() {
        let tree = populated_tree();
        assert!(check(&tree, 3, Fr::from(0u64), 3));
    }

    #[test]
    fn rejects_wrong_leaf() {
        let tree = populated_tree();
        assert!(!check(&tree, 5, Fr::from(56u64), 5));
    }

    #[test]
    fn rejects_wrong_position() {
        let tree = populated_tree();
        // Path for 5, claimed at 4 (sibling order flips at level 0).
        assert!(!check(&tree, 5, Fr::from(55u64), 4));
    }

    #[test]
    fn mismatched_depth_is_an_error() {
        let tree = populated_tree();
        let cs = ConstraintSystem::<Fr>::new_ref();
        let proof = tree.proof(5).unwrap();
        let leaf = FpVar::new_witness(cs.clone(), || Ok(Fr::from(55u64))).unwrap();
        let index = FpVar::new_witness(cs.clone(), || Ok(Fr::from(5u64))).unwrap();
        let bits = enforce_bits(cs.clone(), &index, 2).unwrap();
        let path = MerklePathVar::new_witness(cs.clone(), &proof).unwrap();
        assert!(compute_root(cs, &leaf, &bits, &path).is_err());
    }
}
