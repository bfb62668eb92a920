//! Field Module
//!
//! Canonical conversions between the SNARK base field `Fq` (BN254 scalar
//! field, `p` in the glossary), the Baby Jubjub subgroup scalar field `Fr`,
//! and the byte/`BigUint` representations voter-facing code hands in.
//!
//! Builder inputs in the source protocol are dynamically typed (a private
//! key may arrive as a string, a byte buffer, or an integer). [`IntoScalar`]
//! collapses that into one canonical internal representation instead of
//! threading a sum type through every function signature.

use crate::error::{AmaciError, Result};
use ark_ed_on_bn254::{Fq, Fr};
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

/// SNARK base field modulus `p`, as named in the glossary.
pub fn snark_field_size() -> BigUint {
    BigUint::parse_bytes(
        b"21888242871839275222246405745257275088548364400416034343698204186575808495617",
        10,
    )
    .expect("p is a valid decimal literal")
}

/// Any caller-supplied representation of a field scalar.
///
/// Mirrors the redesign note in spec.md §9: voter-facing builders accept a
/// string, a byte buffer, or an integer, and every internal path works with
/// one canonical representation from here on.
pub trait IntoScalar {
    fn into_biguint(self) -> Result<BigUint>;
}

impl IntoScalar for BigUint {
    fn into_biguint(self) -> Result<BigUint> {
        Ok(self)
    }
}

impl IntoScalar for &[u8] {
    fn into_biguint(self) -> Result<BigUint> {
        Ok(BigUint::from_bytes_be(self))
    }
}

impl IntoScalar for &str {
    fn into_biguint(self) -> Result<BigUint> {
        if let Ok(n) = self.parse::<BigUint>() {
            return Ok(n);
        }
        Ok(BigUint::from_bytes_be(self.as_bytes()))
    }
}

impl IntoScalar for u64 {
    fn into_biguint(self) -> Result<BigUint> {
        Ok(BigUint::from(self))
    }
}

/// Converts a [`BigUint`] to `Fq`, reducing modulo `p`.
pub fn biguint_to_fq(value: &BigUint) -> Fq {
    Fq::from_le_bytes_mod_order(&value.to_bytes_le())
}

/// Converts `Fq` back to a canonical [`BigUint`] in `[0, p)`.
pub fn fq_to_biguint(value: &Fq) -> BigUint {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le())
}

/// Converts a [`BigUint`] to `Fr`, reducing modulo the subgroup order `l`.
pub fn biguint_to_fr(value: &BigUint) -> Fr {
    Fr::from_le_bytes_mod_order(&value.to_bytes_le())
}

/// Converts `Fr` back to a canonical [`BigUint`] in `[0, l)`.
pub fn fr_to_biguint(value: &Fr) -> BigUint {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le())
}

/// Parses a decimal string into `Fq`, erroring on malformed input.
pub fn fq_from_decimal(s: &str) -> Result<Fq> {
    let n = s.parse::<BigUint>().map_err(|_| AmaciError::InvalidScalar)?;
    Ok(biguint_to_fq(&n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_fq() {
        let v = BigUint::from(123456789u64);
        let fq = biguint_to_fq(&v);
        assert_eq!(fq_to_biguint(&fq), v);
    }

    #[test]
    fn roundtrip_fr() {
        let v = BigUint::from(987654321u64);
        let fr = biguint_to_fr(&v);
        assert_eq!(fr_to_biguint(&fr), v);
    }

    #[test]
    fn reduces_modulo_p() {
        let p = snark_field_size();
        let fq = biguint_to_fq(&p);
        assert_eq!(fq_to_biguint(&fq), BigUint::from(0u64));
    }

    #[test]
    fn into_scalar_from_str_decimal() {
        let n = "42".into_biguint().unwrap();
        assert_eq!(n, BigUint::from(42u64));
    }

    #[test]
    fn into_scalar_from_bytes() {
        let bytes: &[u8] = &[0x01, 0x00];
        let n = bytes.into_biguint().unwrap();
        assert_eq!(n, BigUint::from(256u64));
    }
}
