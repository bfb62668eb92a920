//! Operator-side leaf types: the state tree's `StateLeaf`, the
//! active-state tree's per-index deactivation flag, and the deactivate
//! tree's `DeactivateMessageLeaf`.

use crate::baby_jubjub::{self, EdwardsAffine};
use crate::elgamal::Ciphertext;
use crate::error::Result;
use crate::field;
use crate::poseidon::{poseidon_t2, poseidon_t5};
use ark_ed_on_bn254::Fq;
use ark_ff::Zero;
use num_bigint::BigUint;

/// A registered voter's on-tree record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLeaf {
    pub pub_key: EdwardsAffine,
    pub balance: u128,
    pub vote_option_tree_root: Fq,
    pub nonce: u32,
    /// Rerandomised ElGamal ciphertext bound at AddNewKey; zero for a
    /// plain signup (non-AMACI, or an AMACI signup with no deactivate
    /// history yet).
    pub d: (Fq, Fq, Fq, Fq),
}

impl StateLeaf {
    /// A freshly signed-up leaf: full balance, empty vote tree, no prior
    /// commands, no AMACI rerandomised ciphertext.
    pub fn new_signup(pub_key: EdwardsAffine, initial_balance: u128) -> Self {
        Self {
            pub_key,
            balance: initial_balance,
            vote_option_tree_root: Fq::zero(),
            nonce: 0,
            d: (Fq::zero(), Fq::zero(), Fq::zero(), Fq::zero()),
        }
    }

    /// A leaf produced by AddNewKey: carries the rerandomised
    /// deactivate-ciphertext `d` forward so its provenance can be
    /// checked again by a future AddNewKey.
    pub fn new_add_new_key(pub_key: EdwardsAffine, initial_balance: u128, d: (Fq, Fq, Fq, Fq)) -> Self {
        Self {
            pub_key,
            balance: initial_balance,
            vote_option_tree_root: Fq::zero(),
            nonce: 0,
            d,
        }
    }

    /// `inner = poseidon5(pubx, puby, balance, voTreeRoot, nonce)`;
    /// AMACI leaf hash is `poseidon2(inner, poseidon5(d1x,d1y,d2x,d2y,0))`.
    pub fn hash(&self, amaci: bool) -> Result<Fq> {
        let inner = poseidon_t5(&[
            self.pub_key.x,
            self.pub_key.y,
            field::biguint_to_fq(&BigUint::from(self.balance)),
            self.vote_option_tree_root,
            Fq::from(self.nonce),
        ])?;
        if !amaci {
            return Ok(inner);
        }
        let d_hash = poseidon_t5(&[self.d.0, self.d.1, self.d.2, self.d.3, Fq::zero()])?;
        poseidon_t2(&[inner, d_hash])
    }
}

/// Active-state tree entry: zero means active, non-zero means
/// deactivated. Mutated only by the deactivate pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStateLeaf(pub Fq);

impl ActiveStateLeaf {
    pub fn active() -> Self {
        Self(Fq::zero())
    }

    pub fn is_active(&self) -> bool {
        self.0.is_zero()
    }

    pub fn deactivate(marker: Fq) -> Self {
        Self(marker)
    }
}

/// One entry in the deactivate tree: an ElGamal ciphertext encrypting the
/// deactivation marker under the operator's key, plus the ECDH
/// shared-key hash that lets only the originating voter recognise it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeactivateMessageLeaf {
    pub ciphertext: Ciphertext,
    pub shared_key_hash: Fq,
}

impl DeactivateMessageLeaf {
    /// An unfilled batch slot: ciphertext points set to the curve identity
    /// and a zero shared-key hash no real ECDH result will ever match.
    pub fn zero() -> Self {
        Self {
            ciphertext: Ciphertext {
                c1: baby_jubjub::identity(),
                c2: baby_jubjub::identity(),
                x_increment: 0,
            },
            shared_key_hash: Fq::zero(),
        }
    }

    /// `poseidon5(c1x, c1y, c2x, c2y, shared_key_hash)`.
    pub fn hash(&self) -> Result<Fq> {
        poseidon_t5(&[
            self.ciphertext.c1.x,
            self.ciphertext.c1.y,
            self.ciphertext.c2.x,
            self.ciphertext.c2.y,
            self.shared_key_hash,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baby_jubjub::base8;

    #[test]
    fn signup_leaf_hashes_non_amaci() {
        let leaf = StateLeaf::new_signup(base8(), 100);
        assert!(leaf.hash(false).is_ok());
    }

    #[test]
    fn amaci_hash_differs_from_plain_hash() {
        let leaf = StateLeaf::new_signup(base8(), 100);
        let plain = leaf.hash(false).unwrap();
        let amaci = leaf.hash(true).unwrap();
        assert_ne!(plain, amaci);
    }

    #[test]
    fn active_state_leaf_defaults_active() {
        assert!(ActiveStateLeaf::active().is_active());
    }

    #[test]
    fn deactivate_marker_is_not_active() {
        let marker = ActiveStateLeaf::deactivate(Fq::from(1u64));
        assert!(!marker.is_active());
    }

    #[test]
    fn zero_deactivate_leaf_hashes_deterministically() {
        assert_eq!(
            DeactivateMessageLeaf::zero().hash().unwrap(),
            DeactivateMessageLeaf::zero().hash().unwrap()
        );
    }
}
