//! Commitments and Digests Module
//!
//! The two running commitments the operator publishes batch-by-batch
//! (`state_commitment`, `tally_commitment`), and `input_hash`, the
//! sha256-collapse that ties an arbitrary bundle of public field-element
//! inputs to one Groth16-friendly scalar.

use crate::field;
use crate::poseidon::poseidon_t2;
use ark_ed_on_bn254::Fq;
use ark_ff::{BigInteger, PrimeField};
use sha2::{Digest, Sha256};

/// `state_commitment = poseidon2(state_root, state_salt)`.
pub fn state_commitment(state_root: Fq, state_salt: Fq) -> crate::error::Result<Fq> {
    poseidon_t2(&[state_root, state_salt])
}

/// `tally_commitment = poseidon2(results_root, tally_salt)`.
pub fn tally_commitment(results_root: Fq, tally_salt: Fq) -> crate::error::Result<Fq> {
    poseidon_t2(&[results_root, tally_salt])
}

/// Advances a running salt across a processed batch:
/// `next_salt = poseidon2(prev_salt, batch_digest)`.
pub fn next_salt(prev_salt: Fq, batch_digest: Fq) -> crate::error::Result<Fq> {
    poseidon_t2(&[prev_salt, batch_digest])
}

/// Collapses a bundle of public circuit inputs into one field element:
/// `sha256(field_elements_as_be32) mod p`. Every element is serialised
/// big-endian, 32 bytes, concatenated in argument order.
pub fn input_hash(elements: &[Fq]) -> Fq {
    let mut hasher = Sha256::new();
    for e in elements {
        let mut bytes = e.into_bigint().to_bytes_be();
        if bytes.len() < 32 {
            let mut padded = vec![0u8; 32 - bytes.len()];
            padded.extend_from_slice(&bytes);
            bytes = padded;
        }
        hasher.update(&bytes);
    }
    let digest = hasher.finalize();
    let n = num_bigint::BigUint::from_bytes_be(&digest) % field::snark_field_size();
    field::biguint_to_fq(&n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_commitment_is_deterministic() {
        let a = state_commitment(Fq::from(1u64), Fq::from(2u64)).unwrap();
        let b = state_commitment(Fq::from(1u64), Fq::from(2u64)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salts_change_the_commitment() {
        let a = state_commitment(Fq::from(1u64), Fq::from(2u64)).unwrap();
        let b = state_commitment(Fq::from(1u64), Fq::from(3u64)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn input_hash_is_deterministic_and_sub_p() {
        let elements = [Fq::from(10u64), Fq::from(20u64), Fq::from(30u64)];
        let a = input_hash(&elements);
        let b = input_hash(&elements);
        assert_eq!(a, b);
        assert!(field::fq_to_biguint(&a) < field::snark_field_size());
    }

    #[test]
    fn input_hash_is_sensitive_to_order() {
        let a = input_hash(&[Fq::from(1u64), Fq::from(2u64)]);
        let b = input_hash(&[Fq::from(2u64), Fq::from(1u64)]);
        assert_ne!(a, b);
    }

    #[test]
    fn next_salt_chains_deterministically() {
        let s0 = Fq::from(0u64);
        let s1 = next_salt(s0, Fq::from(111u64)).unwrap();
        let s2 = next_salt(s1, Fq::from(222u64)).unwrap();
        assert_ne!(s1, s2);
    }
}
