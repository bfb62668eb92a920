//! Contract-facing message shapes
//!
//! The payloads a round exchanges with its voters, named after the
//! entry points a deployed contract would expose. Wire encoding to an
//! actual chain is out of scope here; these are the semantic shapes
//! [`crate::operator::engine::Engine`] consumes and produces.

use crate::baby_jubjub::EdwardsAffine;
use crate::vote::{DeactivateRequest, VoteMessage};
use ark_ed_on_bn254::Fq;

/// A new voter's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignUp {
    pub pub_key: EdwardsAffine,
}

/// A published vote/key-rotation message, as built by
/// [`crate::vote::build_vote_payload`]. Same shape as the deactivate
/// message below; kept as a distinct alias because the two travel
/// through different queues.
pub type PublishMessage = VoteMessage;

/// A published deactivate request, as built by
/// [`crate::vote::build_deactivate_payload`]: the Poseidon-enveloped
/// command plus the ElGamal-encrypted parity marker the operator decrypts
/// to gate the even/no-op vs odd/deactivate branches.
pub type PublishDeactivateMessage = DeactivateRequest;

/// An AddNewKey registration: the fresh public key plus the witness
/// fields the contract checks against the deactivate tree and the
/// nullifier set (see [`crate::addnewkey::AddNewKeyWitness`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddNewKey {
    pub new_pub: EdwardsAffine,
    pub nullifier: Fq,
    pub d: (Fq, Fq, Fq, Fq),
}
