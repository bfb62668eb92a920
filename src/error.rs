//! Error Module

use thiserror::Error;

/// Errors surfaced by the AMACI core engine.
///
/// Protocol-internal failures detected while processing a batch of voter
/// messages (nonce mismatches, bad signatures, insufficient balance, ...)
/// are *not* represented here: they become silent no-ops recorded in
/// [`crate::operator::engine::NoOpReason`], since the ZK proof attests to
/// them uniformly and the caller never needs to branch on them.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmaciError {
    #[error("packed bytes do not decode to a point on Baby Jubjub")]
    InvalidPoint,
    #[error("point is not in the prime-order subgroup")]
    NotInSubgroup,
    #[error("Poseidon-encrypt authentication tag mismatch")]
    AuthTagMismatch,
    #[error("ciphertext length {0} does not match expected plaintext length {1}")]
    LengthMismatch(usize, usize),
    #[error("ciphertext fails the subgroup check")]
    InvalidCiphertext,
    #[error("decoded point is not in the small decoding table")]
    DecodeFailure,
    #[error("duplicate vote-option index {0} in a single payload")]
    DuplicateOption(u32),
    #[error("packed command overflows a single field element")]
    PackOverflow,
    #[error("voter's ECDH shared-key hash was not found among the published deactivate leaves")]
    NotDeactivated,
    #[error("nullifier already used in this round")]
    NullifierReplay,
    #[error("state tree is full")]
    TreeFull,
    #[error("encryption public key already used in this round")]
    EncPubReused,
    #[error("state index {0} is out of range for a tree of depth {1}")]
    StateIdxOutOfRange(u64, u32),
    #[error("value {0} does not fit in the requested bit width {1}")]
    ValueTooLarge(String, u32),
    #[error("input value could not be interpreted as a field scalar")]
    InvalidScalar,
    #[error("round is in state {0}, operation requires {1}")]
    WrongRoundState(&'static str, &'static str),
    #[error("proof verification failed for a submitted batch")]
    ProofVerificationFailed,
    #[error("serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, AmaciError>;
