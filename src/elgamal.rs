//! Exponential-Parity ElGamal Module
//!
//! ElGamal over Baby Jubjub carrying a single bit of information — the
//! parity of a deactivated voter's latest vote weight — plus
//! rerandomisation so a ciphertext can be republished without revealing it
//! is linked to the original. The plaintext is never a general integer: it
//! is always one of two fixed curve-encodable markers, so decoding is a
//! small lookup rather than a discrete-log search.

use crate::baby_jubjub::{self, base8, mul_point_escalar, sub_point, EdwardsAffine};
use crate::error::{AmaciError, Result};
use ark_ed_on_bn254::{Fq, Fr};
use ark_ff::Field;
use num_bigint::BigUint;

/// Plaintext marker for an even (still active) encoded bit.
const PLAINTEXT_EVEN: u64 = 123;
/// Plaintext marker for an odd (deactivated) encoded bit.
const PLAINTEXT_ODD: u64 = 124;

/// An ElGamal ciphertext plus the increment used to encode its plaintext
/// as a curve point. `x_increment` is public and must be carried alongside
/// `(c1, c2)` through rerandomisation unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ciphertext {
    pub c1: EdwardsAffine,
    pub c2: EdwardsAffine,
    pub x_increment: u64,
}

/// Maps a small plaintext integer to a curve point by probing `x =
/// plaintext + increment` for the smallest `increment ≥ 0` at which the
/// twisted-Edwards curve equation has a solution for `y`.
fn encode_to_message(plaintext: u64) -> (EdwardsAffine, u64) {
    use ark_ec::twisted_edwards::TECurveConfig as _;
    use baby_jubjub::BabyJubjubConfig;

    for increment in 0u64.. {
        let x = Fq::from(plaintext + increment);
        let x2 = x * x;
        let num = Fq::ONE - BabyJubjubConfig::mul_by_a(x2);
        let den = Fq::ONE - BabyJubjubConfig::COEFF_D * x2;
        let Some(den_inv) = den.inverse() else {
            continue;
        };
        let y2 = num * den_inv;
        if let Some(y) = y2.sqrt() {
            return (EdwardsAffine::new_unchecked(x, y), increment);
        }
    }
    unreachable!("the curve has a point at some x in any sufficiently large range")
}

/// Recovers the parity marker encoded in `m` given the `x_increment` used
/// at encryption time. Fails with `DecodeFailure` if the point does not
/// decode to one of the two known markers.
fn decode_message(m: &EdwardsAffine, x_increment: u64) -> Result<bool> {
    let x_big = BigUint::from_bytes_le(&ark_ff::PrimeField::into_bigint(m.x).to_bytes_le());
    let increment_big = BigUint::from(x_increment);
    if x_big < increment_big {
        return Err(AmaciError::DecodeFailure);
    }
    let plaintext = x_big - increment_big;

    if plaintext == BigUint::from(PLAINTEXT_EVEN) {
        Ok(false)
    } else if plaintext == BigUint::from(PLAINTEXT_ODD) {
        Ok(true)
    } else {
        Err(AmaciError::DecodeFailure)
    }
}

/// Encrypts the parity bit `is_odd` under `pub_key` with randomness `r`.
pub fn encrypt_odevity(is_odd: bool, pub_key: &EdwardsAffine, r: Fr) -> Ciphertext {
    let plaintext = if is_odd { PLAINTEXT_ODD } else { PLAINTEXT_EVEN };
    let (m, x_increment) = encode_to_message(plaintext);

    let c1 = mul_point_escalar(&base8(), r);
    let r_pub = mul_point_escalar(pub_key, r);
    let c2 = baby_jubjub::add_point(&m, &r_pub);

    Ciphertext { c1, c2, x_increment }
}

/// Decrypts `ciphertext` under `priv_key` (the operator's
/// `formatted_priv_key`), recovering the parity bit.
pub fn decrypt(priv_key: Fr, ciphertext: &Ciphertext) -> Result<bool> {
    if !baby_jubjub::in_subgroup(&ciphertext.c1) || !baby_jubjub::in_subgroup(&ciphertext.c2) {
        return Err(AmaciError::InvalidCiphertext);
    }
    let priv_c1 = mul_point_escalar(&ciphertext.c1, priv_key);
    let m = sub_point(&ciphertext.c2, &priv_c1);
    decode_message(&m, ciphertext.x_increment)
}

/// Encrypts the fixed "deactivated" marker under `pub_key`. Every
/// deactivate-queue ciphertext the operator publishes is produced this
/// way, so its `x_increment` is always the same constant.
pub fn encrypt_deactivated(pub_key: &EdwardsAffine, r: Fr) -> Ciphertext {
    encrypt_odevity(true, pub_key, r)
}

/// Rerandomises `(c1, c2)` with a fresh scalar `z`, preserving
/// `x_increment` and the decrypted plaintext: `d1 = c1 + z·B8`,
/// `d2 = c2 + z·pub`.
pub fn rerandomize(ciphertext: &Ciphertext, pub_key: &EdwardsAffine, z: Fr) -> Ciphertext {
    let z_b8 = mul_point_escalar(&base8(), z);
    let z_pub = mul_point_escalar(pub_key, z);
    Ciphertext {
        c1: baby_jubjub::add_point(&ciphertext.c1, &z_b8),
        c2: baby_jubjub::add_point(&ciphertext.c2, &z_pub),
        x_increment: ciphertext.x_increment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eddsa::derive_public_key;
    use crate::field;

    fn keypair(seed: &str) -> (Fr, EdwardsAffine) {
        let formatted = crate::eddsa::format_priv_key(seed).unwrap();
        let priv_fr = field::biguint_to_fr(&formatted);
        let pub_key = derive_public_key(seed).unwrap();
        (priv_fr, pub_key)
    }

    #[test]
    fn encrypt_decrypt_roundtrip_even() {
        let (priv_key, pub_key) = keypair("operator");
        let ct = encrypt_odevity(false, &pub_key, Fr::from(7u64));
        assert_eq!(decrypt(priv_key, &ct).unwrap(), false);
    }

    #[test]
    fn encrypt_decrypt_roundtrip_odd() {
        let (priv_key, pub_key) = keypair("operator");
        let ct = encrypt_odevity(true, &pub_key, Fr::from(9u64));
        assert_eq!(decrypt(priv_key, &ct).unwrap(), true);
    }

    #[test]
    fn rerandomize_preserves_plaintext() {
        let (priv_key, pub_key) = keypair("operator");
        let ct = encrypt_odevity(true, &pub_key, Fr::from(3u64));
        let rerandomized = rerandomize(&ct, &pub_key, Fr::from(42u64));
        assert_ne!(rerandomized.c1, ct.c1);
        assert_ne!(rerandomized.c2, ct.c2);
        assert_eq!(rerandomized.x_increment, ct.x_increment);
        assert_eq!(decrypt(priv_key, &rerandomized).unwrap(), true);
    }

    #[test]
    fn decrypt_with_wrong_key_does_not_panic() {
        let (_, pub_key) = keypair("operator");
        let (other_priv, _) = keypair("someone-else");
        let ct = encrypt_odevity(false, &pub_key, Fr::from(5u64));
        // Either a decode failure or (rarely) a different in-table marker;
        // never a panic. Both are acceptable non-matches.
        let _ = decrypt(other_priv, &ct);
    }

    #[test]
    fn encode_decode_known_markers() {
        let (m_even, inc_even) = encode_to_message(PLAINTEXT_EVEN);
        assert_eq!(decode_message(&m_even, inc_even).unwrap(), false);

        let (m_odd, inc_odd) = encode_to_message(PLAINTEXT_ODD);
        assert_eq!(decode_message(&m_odd, inc_odd).unwrap(), true);
    }

    #[test]
    fn decode_rejects_unknown_plaintext() {
        let (m, inc) = encode_to_message(1);
        assert_eq!(decode_message(&m, inc), Err(AmaciError::DecodeFailure));
    }
}
