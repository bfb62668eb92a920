//! Voter Identity Module
//!
//! A voter's keypair and the ECDH shared-key derivation used to encrypt
//! messages under the operator's public key (and vice versa). Built on
//! [`crate::eddsa`] for key derivation and signing; vote-payload and
//! deactivate-payload construction live in [`crate::vote`].

use crate::baby_jubjub::{mul_point_escalar, EdwardsAffine};
use crate::eddsa::{self, Signature};
use crate::error::Result;
use crate::field::{self, IntoScalar};
use ark_ed_on_bn254::{Fq, Fr};
use num_bigint::BigUint;

/// A voter's keypair: the raw secret (reduced mod `p`), its EdDSA-formatted
/// scalar, and the derived public key. Created deterministically from a
/// secret; never mutated once built.
#[derive(Debug, Clone)]
pub struct Keypair {
    priv_key: BigUint,
    formatted_priv_key: BigUint,
    pub_key: EdwardsAffine,
}

impl Keypair {
    /// Derives a keypair from any accepted secret representation (string,
    /// byte buffer, or integer).
    pub fn new<T: IntoScalar>(sk: T) -> Result<Self> {
        let priv_key = sk.into_biguint()? % field::snark_field_size();
        let formatted_priv_key = eddsa::format_priv_key(priv_key.clone())?;
        let pub_key = eddsa::derive_public_key(priv_key.clone())?;
        Ok(Self {
            priv_key,
            formatted_priv_key,
            pub_key,
        })
    }

    pub fn priv_key(&self) -> &BigUint {
        &self.priv_key
    }

    pub fn formatted_priv_key(&self) -> &BigUint {
        &self.formatted_priv_key
    }

    pub fn formatted_priv_key_fr(&self) -> Fr {
        field::biguint_to_fr(&self.formatted_priv_key)
    }

    pub fn pub_key(&self) -> &EdwardsAffine {
        &self.pub_key
    }

    /// Signs a message field element with this keypair's secret.
    pub fn sign(&self, m: Fq) -> Result<Signature> {
        eddsa::sign(self.priv_key.clone(), m)
    }

    /// Derives the ECDH shared key with `other_pub`:
    /// `formatted_priv_key · other_pub`.
    pub fn ecdh_shared_key(&self, other_pub: &EdwardsAffine) -> (Fq, Fq) {
        ecdh_shared_key(self.formatted_priv_key_fr(), other_pub)
    }
}

/// ECDH shared-key derivation given an already-formatted scalar. Exposed
/// standalone for builders (AddNewKey, vote payloads) that only carry the
/// formatted scalar rather than a full [`Keypair`].
pub fn ecdh_shared_key(formatted_priv_key: Fr, other_pub: &EdwardsAffine) -> (Fq, Fq) {
    let shared = mul_point_escalar(other_pub, formatted_priv_key);
    (shared.x, shared.y)
}
