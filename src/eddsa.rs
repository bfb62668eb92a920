//! EdDSA-Poseidon Module
//!
//! Key derivation, deterministic signing and verification over Baby
//! Jubjub, using Poseidon as the hash inside the Fiat-Shamir challenge and
//! Blake-512 for secret-key expansion (the scheme popularised by
//! `circomlib`'s `eddsa-poseidon` and used unchanged here).

use crate::baby_jubjub::{self, base8, mul_point_escalar, EdwardsAffine, SUBGROUP_ORDER};
use crate::error::{AmaciError, Result};
use crate::field::{self, fq_to_biguint, fr_to_biguint, IntoScalar};
use crate::poseidon::poseidon_t5;
use ark_ed_on_bn254::{Fq, Fr};
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use tracing::trace;

/// EdDSA-Poseidon signature: an ephemeral curve point `R8` and a scalar `S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r8: EdwardsAffine,
    pub s: Fr,
}

/// Computes Blake-512 of `input`.
pub fn blake_512(input: &[u8]) -> [u8; 64] {
    let mut output = [0u8; 64];
    let mut hasher = blake::Blake::new(512).expect("512 is a supported Blake digest size");
    hasher.update(input);
    hasher.finalise(&mut output);
    output
}

/// `clamp_and_shift`: the standard EdDSA secret-key expansion — Blake-512,
/// clear the low 3 bits of byte 0, clear the top bit and set bit 254 of
/// byte 31, then shift right by 3 (dividing out the cofactor). Yields a
/// value in `[0, l)`.
fn clamp_and_shift(priv_key_mod_p: &BigUint) -> BigUint {
    let mut bytes = priv_key_mod_p.to_bytes_le();
    bytes.resize(32, 0);

    let mut hash = blake_512(&bytes);
    hash[0] &= 0xF8;
    hash[31] &= 0x7F;
    hash[31] |= 0x40;

    BigUint::from_bytes_le(&hash[..32]) >> 3
}

/// Derives `formatted_priv_key` from any accepted secret representation.
pub fn format_priv_key<T: IntoScalar>(sk: T) -> Result<BigUint> {
    let n = sk.into_biguint()?;
    let n_mod_p = n % field::snark_field_size();
    Ok(clamp_and_shift(&n_mod_p))
}

/// Derives the public key `formatted_priv_key · B8`.
pub fn derive_public_key<T: IntoScalar>(sk: T) -> Result<EdwardsAffine> {
    let formatted = format_priv_key(sk)?;
    let scalar = field::biguint_to_fr(&formatted);
    Ok(mul_point_escalar(&base8(), scalar))
}

/// Signs a message field element with the deterministic-nonce EdDSA-Poseidon
/// scheme: `r = H(sk_hash_high_half ‖ m) mod l`, `R8 = r·B8`,
/// `h = poseidon5(R8.x, R8.y, pub.x, pub.y, m)`, `S = r + h·formatted_priv_key`.
pub fn sign<T: IntoScalar>(sk: T, m: Fq) -> Result<Signature> {
    let n = sk.into_biguint()?;
    let n_mod_p = n % field::snark_field_size();

    let mut sk_bytes = n_mod_p.to_bytes_le();
    sk_bytes.resize(32, 0);
    let hash = blake_512(&sk_bytes);

    let formatted = clamp_and_shift(&n_mod_p);
    let formatted_fr = field::biguint_to_fr(&formatted);
    let pub_key = mul_point_escalar(&base8(), formatted_fr);

    let mut nonce_input = hash[32..64].to_vec();
    let m_bytes = m.into_bigint().to_bytes_le();
    nonce_input.extend_from_slice(&m_bytes);
    let r_hash = blake_512(&nonce_input);
    let r_big = BigUint::from_bytes_le(&r_hash) % fr_to_biguint(&SUBGROUP_ORDER);
    let r = field::biguint_to_fr(&r_big);

    let r8 = mul_point_escalar(&base8(), r);

    let h = poseidon_t5(&[r8.x, r8.y, pub_key.x, pub_key.y, m])?;
    let h_fr = field::biguint_to_fr(&fq_to_biguint(&h));

    let s = r + h_fr * formatted_fr;

    Ok(Signature { r8, s })
}

/// Verifies `sig` against `m` and `pub_key`. Checks both points are in the
/// prime-order subgroup, then the cofactor-cleared equation
/// `8·S·B8 == 8·(R8 + h·pub)`.
pub fn verify(m: Fq, sig: &Signature, pub_key: &EdwardsAffine) -> Result<()> {
    if !baby_jubjub::in_subgroup(&sig.r8) {
        trace!("eddsa verify failed: R8 not in subgroup");
        return Err(AmaciError::InvalidPoint);
    }
    if !baby_jubjub::in_subgroup(pub_key) {
        trace!("eddsa verify failed: public key not in subgroup");
        return Err(AmaciError::NotInSubgroup);
    }

    let h = poseidon_t5(&[sig.r8.x, sig.r8.y, pub_key.x, pub_key.y, m])?;
    let h_fr = field::biguint_to_fr(&fq_to_biguint(&h));

    let eight = Fr::from(8u64);
    let left = mul_point_escalar(&base8(), sig.s * eight);

    let h_pub = mul_point_escalar(pub_key, h_fr * eight);
    let right = baby_jubjub::add_point(&sig.r8, &h_pub);

    if left == right {
        Ok(())
    } else {
        trace!("eddsa verify failed: cofactor-cleared equation mismatch");
        Err(AmaciError::InvalidScalar)
    }
}

/// Packs a signature into 64 bytes: `pack_point(R8) ‖ S` (little-endian).
pub fn pack_signature(sig: &Signature) -> Vec<u8> {
    let mut packed = baby_jubjub::pack_point(&sig.r8).to_bytes_le();
    packed.resize(32, 0);
    let mut s_bytes = fr_to_biguint(&sig.s).to_bytes_le();
    s_bytes.resize(32, 0);
    packed.extend_from_slice(&s_bytes);
    packed
}

/// Unpacks a 64-byte signature produced by [`pack_signature`].
pub fn unpack_signature(packed: &[u8]) -> Result<Signature> {
    if packed.len() != 64 {
        return Err(AmaciError::LengthMismatch(packed.len(), 64));
    }
    let r8 = baby_jubjub::unpack_point(&BigUint::from_bytes_le(&packed[..32]))?;
    let s = field::biguint_to_fr(&BigUint::from_bytes_le(&packed[32..64]));
    Ok(Signature { r8, s })
}
