//! Vote Payload Module
//!
//! Builds the encrypted message batch a voter publishes for a ballot:
//! one Poseidon-encrypted, EdDSA-signed message per non-zero vote option,
//! produced in reverse-nonce order so key-rotation decoys precede the
//! real command, plus the single-message deactivate payload.

use crate::baby_jubjub::{self, EdwardsAffine};
use crate::elgamal::{self, Ciphertext};
use crate::error::{AmaciError, Result};
use crate::field;
use crate::identity::Keypair;
use crate::pack::PackedCommand;
use crate::poseidon::{poseidon_encrypt, poseidon_t3};
use ark_ed_on_bn254::Fq;
use ark_ff::AdditiveGroup;
use rand::Rng;

/// A single vote option and the weight the voter assigns to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOption {
    pub index: u32,
    pub weight: u128,
}

/// One published message: the 8-element Poseidon ciphertext plus the
/// single-use encryption public key it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteMessage {
    pub ciphertext: [Fq; 8],
    pub enc_pub: EdwardsAffine,
}

/// Sentinel for "no key rotation": two zero field elements, never a valid
/// curve point, so it can never collide with a real public key.
const NO_ROTATION: (Fq, Fq) = (Fq::ZERO, Fq::ZERO);

/// A published deactivate request: the Poseidon-enveloped command (carries
/// the signed `state_idx` to target) plus the ElGamal-encrypted parity
/// marker the operator decrypts to decide whether this is a genuine
/// deactivation (odd) rather than a no-op (even).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivateRequest {
    pub message: VoteMessage,
    pub parity: Ciphertext,
}

/// Builds the reverse-ordered message batch for a ballot. `voter` is the
/// voter's current keypair (used to sign and, for every message but the
/// newest, as the unchanged `new_pubkey`); `operator_pub` is the
/// operator's public key vote messages are sealed under.
pub fn build_vote_payload(
    voter: &Keypair,
    state_idx: u32,
    operator_pub: &EdwardsAffine,
    options: &[VoteOption],
) -> Result<Vec<VoteMessage>> {
    let mut seen = std::collections::HashSet::new();
    for opt in options {
        if !seen.insert(opt.index) {
            return Err(AmaciError::DuplicateOption(opt.index));
        }
    }

    let mut options: Vec<VoteOption> = options.iter().copied().filter(|o| o.weight != 0).collect();
    options.sort_by_key(|o| o.index);

    let k = options.len();
    let mut messages = Vec::with_capacity(k);

    for i in (0..k).rev() {
        let opt = options[i];
        let nonce = (i + 1) as u32;

        let command = PackedCommand {
            nonce,
            state_idx,
            vote_option_idx: opt.index,
            new_vote_weight: opt.weight,
            salt: random_salt(),
        };

        let is_newest = i == k - 1;
        let new_pub = if is_newest {
            NO_ROTATION
        } else {
            (voter.pub_key().x, voter.pub_key().y)
        };

        messages.push(build_message(voter, &command, new_pub, operator_pub)?);
    }

    Ok(messages)
}

/// Builds the single deactivate message: no vote option or weight, but
/// still addressed at the voter's own `state_idx` so the operator can
/// locate the state leaf being deactivated.
///
/// Unlike a vote message, this is sealed directly under the voter's own
/// identity key rather than a fresh single-use one: the operator needs to
/// recover the same ECDH shared secret later purely from `(voter,
/// operator_pub)` when a deactivated voter proves ownership in AddNewKey
/// (see [`crate::addnewkey::build_add_new_key_input`]), which a
/// throwaway ephemeral key would make impossible to recompute.
pub fn build_deactivate_payload(
    voter: &Keypair,
    state_idx: u32,
    operator_pub: &EdwardsAffine,
) -> Result<DeactivateRequest> {
    let command = PackedCommand::deactivate(state_idx, random_salt());
    let message = build_message_with_enc_key(voter, voter, &command, NO_ROTATION, operator_pub)?;

    let r = field::biguint_to_fr(&baby_jubjub::gen_random_babyjub_value());
    let parity = elgamal::encrypt_odevity(true, operator_pub, r);

    Ok(DeactivateRequest { message, parity })
}

fn build_message(
    voter: &Keypair,
    command: &PackedCommand,
    new_pub: (Fq, Fq),
    operator_pub: &EdwardsAffine,
) -> Result<VoteMessage> {
    let enc_kp = Keypair::new(baby_jubjub::gen_random_babyjub_value())?;
    build_message_with_enc_key(voter, &enc_kp, command, new_pub, operator_pub)
}

fn build_message_with_enc_key(
    voter: &Keypair,
    enc_key: &Keypair,
    command: &PackedCommand,
    new_pub: (Fq, Fq),
    operator_pub: &EdwardsAffine,
) -> Result<VoteMessage> {
    let packed = command.pack()?;
    let hash = poseidon_t3(&[packed, new_pub.0, new_pub.1])?;
    let sig = voter.sign(hash)?;

    let (k0, k1) = enc_key.ecdh_shared_key(operator_pub);

    let s_fq = field::biguint_to_fq(&field::fr_to_biguint(&sig.s));
    let plaintext = [
        packed,
        new_pub.0,
        new_pub.1,
        sig.r8.x,
        sig.r8.y,
        s_fq,
        Fq::from(0u64),
    ];
    let ciphertext_vec = poseidon_encrypt(&plaintext, (k0, k1), 0)?;
    let ciphertext: [Fq; 8] = ciphertext_vec
        .try_into()
        .map_err(|_| AmaciError::PackOverflow)?;

    Ok(VoteMessage {
        ciphertext,
        enc_pub: *enc_key.pub_key(),
    })
}

fn random_salt() -> u64 {
    let mut rng = rand::thread_rng();
    rng.gen::<u64>() & ((1u64 << 56) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poseidon::poseidon_decrypt;

    fn decrypt_new_pub(message: &VoteMessage, operator: &Keypair) -> (Fq, Fq) {
        let shared = operator.ecdh_shared_key(&message.enc_pub);
        let plaintext = poseidon_decrypt(&message.ciphertext, shared, 0, 7).unwrap();
        (plaintext[1], plaintext[2])
    }

    #[test]
    fn rejects_duplicate_options() {
        let voter = Keypair::new("voter").unwrap();
        let operator = Keypair::new("operator").unwrap();
        let options = [
            VoteOption { index: 1, weight: 2 },
            VoteOption { index: 1, weight: 3 },
        ];
        let err = build_vote_payload(&voter, 0, operator.pub_key(), &options).unwrap_err();
        assert_eq!(err, AmaciError::DuplicateOption(1));
    }

    #[test]
    fn drops_zero_weight_options() {
        let voter = Keypair::new("voter").unwrap();
        let operator = Keypair::new("operator").unwrap();
        let options = [
            VoteOption { index: 0, weight: 0 },
            VoteOption { index: 1, weight: 5 },
        ];
        let messages = build_vote_payload(&voter, 0, operator.pub_key(), &options).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn only_the_newest_message_carries_the_no_rotation_sentinel() {
        let voter = Keypair::new("voter").unwrap();
        let operator = Keypair::new("operator").unwrap();
        let options = [
            VoteOption { index: 0, weight: 5 },
            VoteOption { index: 1, weight: 7 },
        ];
        let messages = build_vote_payload(&voter, 3, operator.pub_key(), &options).unwrap();
        assert_eq!(messages.len(), 2);

        // Production order is reverse: messages[0] has the highest nonce
        // (the newest command) and carries the no-rotation sentinel.
        assert_eq!(decrypt_new_pub(&messages[0], &operator), NO_ROTATION);
        assert_eq!(
            decrypt_new_pub(&messages[1], &operator),
            (voter.pub_key().x, voter.pub_key().y)
        );
    }

    #[test]
    fn each_message_uses_a_distinct_enc_pub() {
        let voter = Keypair::new("voter").unwrap();
        let operator = Keypair::new("operator").unwrap();
        let options = [
            VoteOption { index: 0, weight: 1 },
            VoteOption { index: 1, weight: 1 },
            VoteOption { index: 2, weight: 1 },
        ];
        let messages = build_vote_payload(&voter, 0, operator.pub_key(), &options).unwrap();
        let mut enc_pubs = messages.iter().map(|m| m.enc_pub);
        let first = enc_pubs.next().unwrap();
        assert!(enc_pubs.all(|p| p != first));
    }

    #[test]
    fn deactivate_payload_builds_a_single_message() {
        let voter = Keypair::new("voter").unwrap();
        let operator = Keypair::new("operator").unwrap();
        let request = build_deactivate_payload(&voter, 4, operator.pub_key()).unwrap();
        assert_eq!(decrypt_new_pub(&request.message, &operator), NO_ROTATION);
    }

    #[test]
    fn deactivate_payload_parity_decrypts_to_odd() {
        let voter = Keypair::new("voter").unwrap();
        let operator = Keypair::new("operator").unwrap();
        let request = build_deactivate_payload(&voter, 4, operator.pub_key()).unwrap();
        let is_odd = crate::elgamal::decrypt(operator.formatted_priv_key_fr(), &request.parity).unwrap();
        assert!(is_odd);
    }
}
