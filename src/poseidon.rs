//! Poseidon Module
//!
//! Fixed-width Poseidon permutation over BN254, parameterised the same way
//! as the reference `circomlib`/`@zk-kit` implementation (`light-poseidon`
//! ships the matching round constants and MDS matrices). Exposes the
//! variadic `poseidon` hash plus arity-named wrappers, and an authenticated
//! Poseidon-encryption scheme used to seal vote payloads under an ECDH key.

use crate::error::{AmaciError, Result};
use ark_ed_on_bn254::Fq;
use ark_ff::AdditiveGroup;
use light_poseidon::{Poseidon, PoseidonHasher};

/// Domain-separated variadic Poseidon hash: `t = inputs.len() + 1`, capacity
/// element `0`, state initialised to `[0, inputs...]`, output is `state[0]`.
///
/// `inputs.len()` must be in `1..=16`.
pub fn poseidon(inputs: &[Fq]) -> Result<Fq> {
    if inputs.is_empty() || inputs.len() > 16 {
        return Err(AmaciError::ValueTooLarge(
            "poseidon arity".to_string(),
            16,
        ));
    }
    let mut hasher =
        Poseidon::<Fq>::new_circom(inputs.len()).map_err(|_| AmaciError::InvalidScalar)?;
    hasher.hash(inputs).map_err(|_| AmaciError::InvalidScalar)
}

macro_rules! fixed_arity {
    ($name:ident, $n:literal) => {
        #[doc = concat!("Poseidon hash of exactly ", stringify!($n), " field elements.")]
        pub fn $name(inputs: &[Fq; $n]) -> Result<Fq> {
            poseidon(inputs)
        }
    };
}

fixed_arity!(poseidon_t2, 2);
fixed_arity!(poseidon_t3, 3);
fixed_arity!(poseidon_t4, 4);
fixed_arity!(poseidon_t5, 5);
fixed_arity!(poseidon_t6, 6);

/// Poseidon-encrypts a plaintext of arbitrary length under a two-element
/// shared key, returning `plaintext.len() + 1` ciphertext field elements
/// (the last one is the authentication tag).
///
/// This follows the `zk-kit`/MACI Poseidon-encryption construction: the
/// plaintext is processed in chunks of 3 using a duplex-style sponge keyed
/// by `(shared_key.0, shared_key.1, nonce)`, and the final permutation state
/// element is appended as the tag.
pub fn poseidon_encrypt(plaintext: &[Fq], shared_key: (Fq, Fq), nonce: u64) -> Result<Vec<Fq>> {
    let padded_len = plaintext.len().div_ceil(3) * 3;
    let mut padded = plaintext.to_vec();
    padded.resize(padded_len, Fq::ZERO);

    let mut state = [
        Fq::ZERO,
        shared_key.0,
        shared_key.1,
        Fq::from(nonce) + Fq::from((plaintext.len() as u64) << 32),
    ];

    let mut ciphertext = Vec::with_capacity(plaintext.len() + 1);
    let mut emitted = 0usize;
    for chunk in padded.chunks(3) {
        state = permute_round(state)?;
        for (i, p) in chunk.iter().enumerate() {
            state[i + 1] += *p;
        }
        // The trailing padding added above never leaves the sponge: only
        // the slots covering real plaintext are emitted as ciphertext.
        let take = (plaintext.len() - emitted).min(3);
        ciphertext.extend_from_slice(&state[1..1 + take]);
        emitted += take;
    }

    state = permute_round(state)?;
    ciphertext.push(state[1]);

    Ok(ciphertext)
}

/// Decrypts and authenticates a Poseidon-encrypted ciphertext produced by
/// [`poseidon_encrypt`]. `plaintext_len` is the original (unpadded) length.
pub fn poseidon_decrypt(
    ciphertext: &[Fq],
    shared_key: (Fq, Fq),
    nonce: u64,
    plaintext_len: usize,
) -> Result<Vec<Fq>> {
    if ciphertext.len() != plaintext_len + 1 {
        return Err(AmaciError::LengthMismatch(ciphertext.len(), plaintext_len + 1));
    }

    let mut state = [
        Fq::ZERO,
        shared_key.0,
        shared_key.1,
        Fq::from(nonce) + Fq::from((plaintext_len as u64) << 32),
    ];

    let num_chunks = plaintext_len.div_ceil(3);
    let mut plaintext = Vec::with_capacity(plaintext_len);
    let mut consumed = 0usize;
    for _ in 0..num_chunks {
        state = permute_round(state)?;
        let take = (plaintext_len - consumed).min(3);
        for i in 0..take {
            let c = ciphertext[consumed + i];
            plaintext.push(c - state[i + 1]);
            state[i + 1] = c;
        }
        consumed += take;
    }

    state = permute_round(state)?;
    if state[1] != ciphertext[plaintext_len] {
        return Err(AmaciError::AuthTagMismatch);
    }

    Ok(plaintext)
}

fn permute_round(state: [Fq; 4]) -> Result<[Fq; 4]> {
    let mut hasher = Poseidon::<Fq>::new_circom(4).map_err(|_| AmaciError::InvalidScalar)?;
    let out = hasher
        .hash(&state)
        .map_err(|_| AmaciError::InvalidScalar)?;
    Ok([out, state[1], state[2], state[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fq(n: u64) -> Fq {
        Fq::from(n)
    }

    #[test]
    fn deterministic() {
        let inputs = [fq(100), fq(200)];
        assert_eq!(poseidon(&inputs).unwrap(), poseidon(&inputs).unwrap());
    }

    #[test]
    fn distinct_on_distinct_inputs() {
        let h00 = poseidon_t2(&[fq(0), fq(0)]).unwrap();
        let h11 = poseidon_t2(&[fq(1), fq(1)]).unwrap();
        assert_ne!(h00, h11);
    }

    #[test]
    fn avalanche_effect() {
        let h12 = poseidon_t2(&[fq(1), fq(2)]).unwrap();
        let h13 = poseidon_t2(&[fq(1), fq(3)]).unwrap();
        assert_ne!(h12, h13);

        let a = crate::field::fq_to_biguint(&h12);
        let b = crate::field::fq_to_biguint(&h13);
        let diff_bits = (a ^ b).bits();
        // A single-bit input change should scatter widely across the digest.
        assert!(diff_bits as u32 >= 50, "only {diff_bits} bits differ");
    }

    #[test]
    fn arity_mismatch_rejected() {
        assert!(poseidon(&[]).is_err());
    }

    #[test]
    fn poseidon5_matches_fixed_wrapper() {
        let inputs = [fq(1), fq(2), fq(3), fq(4), fq(5)];
        assert_eq!(poseidon(&inputs).unwrap(), poseidon_t5(&inputs).unwrap());
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let shared = (fq(11), fq(22));
        let plaintext = vec![fq(1), fq(2), fq(3), fq(4), fq(5), fq(6), fq(0)];

        let ciphertext = poseidon_encrypt(&plaintext, shared, 0).unwrap();
        assert_eq!(ciphertext.len(), 8);

        let decrypted = poseidon_decrypt(&ciphertext, shared, 0, plaintext.len()).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_wrong_key() {
        let shared = (fq(11), fq(22));
        let wrong = (fq(11), fq(23));
        let plaintext = vec![fq(42); 7];

        let ciphertext = poseidon_encrypt(&plaintext, shared, 0).unwrap();
        let result = poseidon_decrypt(&ciphertext, wrong, 0, plaintext.len());
        assert_eq!(result, Err(AmaciError::AuthTagMismatch));
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let shared = (fq(11), fq(22));
        let plaintext = vec![fq(42); 7];

        let mut ciphertext = poseidon_encrypt(&plaintext, shared, 0).unwrap();
        ciphertext[0] += Fq::from(1u64);
        let result = poseidon_decrypt(&ciphertext, shared, 0, plaintext.len());
        assert_eq!(result, Err(AmaciError::AuthTagMismatch));
    }

    #[test]
    fn decrypt_rejects_length_mismatch() {
        let shared = (fq(1), fq(2));
        let ciphertext = vec![fq(0); 3];
        let result = poseidon_decrypt(&ciphertext, shared, 0, 7);
        assert_eq!(result, Err(AmaciError::LengthMismatch(3, 8)));
    }

    #[test]
    fn big_values_stay_in_field() {
        let h = poseidon_t2(&[fq(1), fq(2)]).unwrap();
        assert!(crate::field::fq_to_biguint(&h) < crate::field::snark_field_size());
    }
}
