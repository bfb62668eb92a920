//! AddNewKey Input Builder
//!
//! Lets a voter who has deactivated their old state leaf prove ownership
//! of one of the published deactivate leaves and register a fresh,
//! unlinkable public key without revealing which leaf was theirs.

use crate::baby_jubjub::{self, EdwardsAffine};
use crate::elgamal::{self, Ciphertext};
use crate::error::{AmaciError, Result};
use crate::field;
use crate::identity::Keypair;
use crate::merkle::{MerklePath, MerkleTree};
use crate::operator::state::DeactivateMessageLeaf;
use crate::poseidon::poseidon_t2;
use ark_ed_on_bn254::{Fq, Fr};

/// Domain-separation constant binding the nullifier to AddNewKey. Larger
/// than `u64::MAX`, so it is parsed from its decimal literal rather than
/// written as an integer constant.
fn domain_nullifier() -> Fq {
    field::fq_from_decimal("1444992409218394441042").expect("valid decimal literal")
}

/// The structured witness handed to the AddNewKey circuit.
#[derive(Debug, Clone)]
pub struct AddNewKeyWitness {
    pub input_hash: Fq,
    pub coord_pub_key: EdwardsAffine,
    pub deactivate_root: Fq,
    pub deactivate_index: u64,
    pub deactivate_leaf: Fq,
    pub c1: EdwardsAffine,
    pub c2: EdwardsAffine,
    pub random_val: Fr,
    pub d1: EdwardsAffine,
    pub d2: EdwardsAffine,
    pub path: MerklePath,
    pub nullifier: Fq,
    pub old_private_key: Fq,
}

/// `nullifier = poseidon2(formatted_priv_key, domain_nullifier())`.
pub fn nullifier(formatted_priv_key: Fq) -> Result<Fq> {
    poseidon_t2(&[formatted_priv_key, domain_nullifier()])
}

/// Builds the AddNewKey witness for `voter` against the full
/// publication-order array of deactivate leaves, using a deactivate tree
/// of `circuit_depth` (which may exceed the depth the real leaves fill;
/// the gap is covered by [`MerkleTree::extend_root`]).
pub fn build_add_new_key_input(
    voter: &Keypair,
    operator_pub: &EdwardsAffine,
    deactivates: &[DeactivateMessageLeaf],
    circuit_depth: u32,
) -> Result<AddNewKeyWitness> {
    let formatted_priv_fr = voter.formatted_priv_key_fr();
    let formatted_priv_fq = field::biguint_to_fq(voter.formatted_priv_key());

    let (k0, k1) = voter.ecdh_shared_key(operator_pub);
    let shared_key_hash = poseidon_t2(&[k0, k1])?;

    let j = deactivates
        .iter()
        .position(|leaf| leaf.shared_key_hash == shared_key_hash)
        .ok_or(AmaciError::NotDeactivated)?;

    let leaf = deactivates[j];
    let ciphertext: Ciphertext = leaf.ciphertext;

    let z = field::biguint_to_fr(&baby_jubjub::gen_random_babyjub_value());
    let rerandomized = elgamal::rerandomize(&ciphertext, operator_pub, z);

    let null = nullifier(formatted_priv_fq)?;

    let real_depth = depth_for_len(deactivates.len());
    let leaf_hashes: Result<Vec<Fq>> = deactivates.iter().map(|l| l.hash()).collect();
    let leaf_hashes = leaf_hashes?;
    let small_tree = MerkleTree::init_leaves(real_depth, &leaf_hashes)?;

    let deactivate_root = if circuit_depth == real_depth {
        small_tree.root()
    } else {
        MerkleTree::extend_root(small_tree.root(), real_depth, circuit_depth)?
    };

    let path = small_tree.path_of(j as u64)?;

    let operator_pub_hash = poseidon_t2(&[operator_pub.x, operator_pub.y])?;
    let input_hash = crate::commitment::input_hash(&[
        deactivate_root,
        operator_pub_hash,
        null,
        rerandomized.c1.x,
        rerandomized.c1.y,
        rerandomized.c2.x,
        rerandomized.c2.y,
    ]);

    Ok(AddNewKeyWitness {
        input_hash,
        coord_pub_key: *operator_pub,
        deactivate_root,
        deactivate_index: j as u64,
        deactivate_leaf: leaf.hash()?,
        c1: ciphertext.c1,
        c2: ciphertext.c2,
        random_val: z,
        d1: rerandomized.c1,
        d2: rerandomized.c2,
        path,
        nullifier: null,
        old_private_key: formatted_priv_fq,
    })
}

/// Smallest tree depth whose `5^d` capacity covers `len` leaves.
fn depth_for_len(len: usize) -> u32 {
    let mut depth = 0u32;
    while 5usize.pow(depth) < len.max(1) {
        depth += 1;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal::encrypt_deactivated;

    fn deactivate_leaf_for(voter: &Keypair, operator: &Keypair, r: Fr) -> DeactivateMessageLeaf {
        let (k0, k1) = voter.ecdh_shared_key(operator.pub_key());
        let shared_key_hash = poseidon_t2(&[k0, k1]).unwrap();
        let ciphertext = encrypt_deactivated(operator.pub_key(), r);
        DeactivateMessageLeaf {
            ciphertext,
            shared_key_hash,
        }
    }

    #[test]
    fn finds_own_leaf_among_others() {
        let voter = Keypair::new("voter-1").unwrap();
        let other = Keypair::new("voter-2").unwrap();
        let operator = Keypair::new("operator").unwrap();

        let leaves = vec![
            deactivate_leaf_for(&other, &operator, Fr::from(11u64)),
            deactivate_leaf_for(&voter, &operator, Fr::from(22u64)),
            DeactivateMessageLeaf::zero(),
        ];

        let witness = build_add_new_key_input(&voter, operator.pub_key(), &leaves, 2).unwrap();
        assert_eq!(witness.deactivate_index, 1);
    }

    #[test]
    fn fails_not_deactivated_for_a_foreign_voter() {
        let voter = Keypair::new("voter-1").unwrap();
        let other = Keypair::new("voter-2").unwrap();
        let operator = Keypair::new("operator").unwrap();

        let leaves = vec![deactivate_leaf_for(&other, &operator, Fr::from(11u64))];
        let err = build_add_new_key_input(&voter, operator.pub_key(), &leaves, 2).unwrap_err();
        assert_eq!(err, AmaciError::NotDeactivated);
    }

    #[test]
    fn nullifier_is_deterministic_per_formatted_key() {
        let voter = Keypair::new("voter-1").unwrap();
        let fq = field::biguint_to_fq(voter.formatted_priv_key());
        assert_eq!(nullifier(fq).unwrap(), nullifier(fq).unwrap());
    }

    #[test]
    fn rerandomized_ciphertext_still_decodes_to_deactivated() {
        let voter = Keypair::new("voter-1").unwrap();
        let operator = Keypair::new("operator").unwrap();

        let leaves = vec![deactivate_leaf_for(&voter, &operator, Fr::from(7u64))];
        let witness = build_add_new_key_input(&voter, operator.pub_key(), &leaves, 1).unwrap();

        // Only the operator's key can decrypt: the ciphertext is sealed
        // under the operator's public key.
        let rerandomized = Ciphertext {
            c1: witness.d1,
            c2: witness.d2,
            x_increment: leaves[0].ciphertext.x_increment,
        };
        let decoded = elgamal::decrypt(operator.formatted_priv_key_fr(), &rerandomized).unwrap();
        assert!(decoded);
    }
}
