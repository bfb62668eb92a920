//! Operator State Engine
//!
//! Drives a round through its linear lifecycle — `FILLING` → `PROCESSING`
//! → `TALLYING` → `ENDED` — consuming queued messages and deactivate
//! requests into the running `state_commitment`/`tally_commitment` pair a
//! deployed contract would check a submitted proof against. Every
//! cryptographic processing failure (a bad signature, a stale nonce, an
//! overdrawn balance) is folded into a silent no-op rather than an error:
//! the circuit's constraints enforce the same rule, so the caller has
//! nothing useful to branch on beyond an audit trail.

use crate::baby_jubjub::EdwardsAffine;
use crate::commitment;
use crate::config::RoundConfig;
use crate::eddsa::{self, Signature};
use crate::error::{AmaciError, Result};
use crate::field;
use crate::identity::{ecdh_shared_key, Keypair};
use crate::merkle::MerkleTree;
use crate::operator::messages::{AddNewKey, PublishDeactivateMessage, PublishMessage, SignUp};
use crate::operator::state::{ActiveStateLeaf, DeactivateMessageLeaf, StateLeaf};
use crate::pack::PackedCommand;
use crate::poseidon::{poseidon_decrypt, poseidon_t2, poseidon_t3};
use ark_ed_on_bn254::Fq;
use ark_ff::Zero;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, instrument, warn};

/// A round's linear lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Filling,
    Processing,
    Tallying,
    Ended,
}

/// Why a queued message, deactivate request, or batch slot was skipped
/// instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Poseidon-decrypt authentication failed under the candidate key.
    AuthTagMismatch,
    /// The packed command addresses a state index with no registered leaf.
    StateIdxOutOfRange,
    /// The targeted leaf has already been deactivated.
    Deactivated,
    /// `packed.nonce != leaf.nonce + 1`.
    NonceMismatch,
    /// The EdDSA signature over the packed command did not verify under
    /// the leaf's current public key.
    BadSignature,
    /// The new vote cost exceeds the voter's remaining balance.
    InsufficientBalance,
    /// The ElGamal parity marker decrypted to even: the sender's request
    /// carries no deactivation intent.
    EvenParity,
    /// The ElGamal parity ciphertext did not decode to a known marker.
    ParityDecodeFailure,
    /// An empty batch slot past the end of the real queue.
    Padding,
}

/// Final per-option tally: summed vote weight and the voice credits spent
/// reaching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TallyResult {
    pub votes: u128,
    pub voice_credits_spent: u128,
}

/// The operator's view of one round: registered leaves, pending queues,
/// and the running commitments. Construction requires an operator
/// keypair because message/deactivate decryption is always performed
/// under the operator's ECDH key, never the sender's.
pub struct Engine {
    config: RoundConfig,
    state: RoundState,
    operator: Keypair,

    state_leaves: Vec<StateLeaf>,
    active_leaves: Vec<ActiveStateLeaf>,
    vote_weights: Vec<std::collections::HashMap<u32, u128>>,
    vote_option_trees: Vec<MerkleTree>,
    state_tree: MerkleTree,

    message_queue: VecDeque<PublishMessage>,
    deactivate_queue: VecDeque<PublishDeactivateMessage>,
    deactivate_leaves: Vec<DeactivateMessageLeaf>,
    nullifiers: HashSet<Fq>,

    state_salt: Fq,
    tally_salt: Fq,
    tally: Vec<TallyResult>,
    tally_cursor: usize,

    no_ops: Vec<NoOpReason>,
}

impl Engine {
    /// Creates an empty round with `num_vote_options` tally slots.
    pub fn new(config: RoundConfig, operator: Keypair, num_vote_options: usize) -> Result<Self> {
        let state_tree = MerkleTree::new(config.state_tree_depth)?;
        Ok(Self {
            config,
            state: RoundState::Filling,
            operator,
            state_leaves: Vec::new(),
            active_leaves: Vec::new(),
            vote_weights: Vec::new(),
            vote_option_trees: Vec::new(),
            state_tree,
            message_queue: VecDeque::new(),
            deactivate_queue: VecDeque::new(),
            deactivate_leaves: Vec::new(),
            nullifiers: HashSet::new(),
            state_salt: Fq::zero(),
            tally_salt: Fq::zero(),
            tally: vec![TallyResult::default(); num_vote_options],
            tally_cursor: 0,
            no_ops: Vec::new(),
        })
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn no_ops(&self) -> &[NoOpReason] {
        &self.no_ops
    }

    fn require_state(&self, expected: RoundState, op: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(AmaciError::WrongRoundState(state_name(self.state), op));
        }
        Ok(())
    }

    /// Registers a new voter, returning its state index.
    #[instrument(skip(self, signup))]
    pub fn sign_up(&mut self, signup: SignUp) -> Result<u64> {
        self.require_state(RoundState::Filling, "signUp")?;
        let idx = self.push_leaf(StateLeaf::new_signup(
            signup.pub_key,
            self.config.voice_credit_amount,
        ))?;
        debug!(idx, "signed up");
        Ok(idx)
    }

    /// Queues a vote/key-rotation message for later processing.
    pub fn publish_message(&mut self, message: PublishMessage) -> Result<()> {
        self.require_state(RoundState::Filling, "publishMessage")?;
        self.message_queue.push_back(message);
        Ok(())
    }

    /// Queues a deactivate request.
    pub fn publish_deactivate_message(&mut self, message: PublishDeactivateMessage) -> Result<()> {
        self.require_state(RoundState::Filling, "publishDeactivateMessage")?;
        self.deactivate_queue.push_back(message);
        Ok(())
    }

    /// Registers a fresh, unlinkable key produced by an AddNewKey proof.
    /// The nullifier is checked against replay but the proof itself
    /// (binding the nullifier to a real deactivate leaf) is assumed
    /// already verified by the caller.
    pub fn add_new_key(&mut self, request: AddNewKey) -> Result<u64> {
        self.require_state(RoundState::Filling, "addNewKey")?;
        if !self.nullifiers.insert(request.nullifier) {
            return Err(AmaciError::NullifierReplay);
        }
        let idx = self.push_leaf(StateLeaf::new_add_new_key(
            request.new_pub,
            self.config.voice_credit_amount,
            request.d,
        ))?;
        info!(idx, "registered AddNewKey replacement leaf");
        Ok(idx)
    }

    fn push_leaf(&mut self, leaf: StateLeaf) -> Result<u64> {
        let idx = self.state_leaves.len() as u64;
        if idx >= self.state_tree.capacity() {
            return Err(AmaciError::TreeFull);
        }
        let hash = leaf.hash(self.config.is_amaci)?;
        self.state_tree.update_leaf(idx, hash)?;
        self.state_leaves.push(leaf);
        self.active_leaves.push(ActiveStateLeaf::active());
        self.vote_weights.push(std::collections::HashMap::new());
        self.vote_option_trees
            .push(MerkleTree::new(self.config.vote_option_tree_depth)?);
        Ok(idx)
    }

    /// Processes as many queued deactivate requests as are pending, up to
    /// `batch_size`. Callable during `FILLING` (the deactivate pipeline
    /// runs eagerly, ahead of the processing phase proper). Padding slots
    /// past the end of the real queue hash to
    /// [`DeactivateMessageLeaf::zero`] and are recorded as
    /// [`NoOpReason::Padding`].
    #[instrument(skip(self))]
    pub fn process_deactivate_batch(&mut self, batch_size: usize) -> Result<Vec<NoOpReason>> {
        if self.state != RoundState::Filling && self.state != RoundState::Processing {
            return Err(AmaciError::WrongRoundState(
                state_name(self.state),
                "processDeactivate",
            ));
        }

        let mut outcomes = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let leaf = match self.deactivate_queue.pop_front() {
                None => {
                    outcomes.push(NoOpReason::Padding);
                    DeactivateMessageLeaf::zero()
                }
                Some(message) => match self.decrypt_deactivate(&message) {
                    Ok(leaf) => leaf,
                    Err(reason) => {
                        outcomes.push(reason);
                        DeactivateMessageLeaf::zero()
                    }
                },
            };
            self.deactivate_leaves.push(leaf);
        }

        for reason in &outcomes {
            if *reason != NoOpReason::Padding {
                warn!(?reason, "deactivate slot skipped");
            }
        }
        self.no_ops.extend(&outcomes);
        Ok(outcomes)
    }

    /// Decrypts and verifies one deactivate request, returning the leaf to
    /// record and (on success) flips the target's `ActiveStateLeaf`.
    ///
    /// The ElGamal parity marker is decrypted first and gates everything
    /// else: even decodes to a no-op, odd proceeds to the Poseidon-enveloped
    /// command. Deactivate commands carry `nonce = 0` and an all-zero
    /// vote/weight, but — unlike the spec's literal all-zero template —
    /// still carry the sender's real `state_idx`, because without it the
    /// operator has no way to locate the leaf being deactivated (see
    /// DESIGN.md).
    fn decrypt_deactivate(
        &mut self,
        message: &PublishDeactivateMessage,
    ) -> std::result::Result<DeactivateMessageLeaf, NoOpReason> {
        let is_odd = crate::elgamal::decrypt(self.operator.formatted_priv_key_fr(), &message.parity)
            .map_err(|_| NoOpReason::ParityDecodeFailure)?;
        if !is_odd {
            return Err(NoOpReason::EvenParity);
        }

        let shared =
            ecdh_shared_key(self.operator.formatted_priv_key_fr(), &message.message.enc_pub);
        let plaintext = poseidon_decrypt(&message.message.ciphertext, shared, 0, 7)
            .map_err(|_| NoOpReason::AuthTagMismatch)?;

        let packed =
            PackedCommand::unpack(plaintext[0]).map_err(|_| NoOpReason::StateIdxOutOfRange)?;
        let state_idx = packed.state_idx as usize;
        if state_idx >= self.state_leaves.len() {
            return Err(NoOpReason::StateIdxOutOfRange);
        }
        if !self.active_leaves[state_idx].is_active() {
            return Err(NoOpReason::Deactivated);
        }

        let sig = Signature {
            r8: EdwardsAffine::new_unchecked(plaintext[3], plaintext[4]),
            s: field::biguint_to_fr(&field::fq_to_biguint(&plaintext[5])),
        };
        let hash = poseidon_t3(&[plaintext[0], plaintext[1], plaintext[2]])
            .map_err(|_| NoOpReason::BadSignature)?;
        eddsa::verify(hash, &sig, &self.state_leaves[state_idx].pub_key)
            .map_err(|_| NoOpReason::BadSignature)?;

        self.active_leaves[state_idx] = ActiveStateLeaf::deactivate(poseidon_t2(&[
            Fq::from(state_idx as u64),
            packed_salt(packed.salt),
        ])
        .map_err(|_| NoOpReason::AuthTagMismatch)?);

        let shared_key_hash =
            poseidon_t2(&[shared.0, shared.1]).map_err(|_| NoOpReason::AuthTagMismatch)?;
        let ciphertext = crate::elgamal::encrypt_deactivated(
            self.operator.pub_key(),
            field::biguint_to_fr(&crate::baby_jubjub::gen_random_babyjub_value()),
        );

        Ok(DeactivateMessageLeaf {
            ciphertext,
            shared_key_hash,
        })
    }

    /// `FILLING` → `PROCESSING`.
    pub fn start_processing(&mut self) -> Result<()> {
        self.require_state(RoundState::Filling, "startProcessPeriod")?;
        self.state = RoundState::Processing;
        info!("round entered PROCESSING");
        Ok(())
    }

    /// Drains up to `message_batch_size` messages in reverse publication
    /// order (the most recently published message is processed first),
    /// padding with [`NoOpReason::Padding`] once the queue empties.
    #[instrument(skip(self))]
    pub fn process_message_batch(&mut self) -> Result<Vec<NoOpReason>> {
        self.require_state(RoundState::Processing, "processMessage")?;

        let mut outcomes = Vec::with_capacity(self.config.batch_size);
        for _ in 0..self.config.batch_size {
            match self.message_queue.pop_back() {
                None => outcomes.push(NoOpReason::Padding),
                Some(message) => {
                    if let Err(reason) = self.apply_message(&message) {
                        warn!(?reason, "message skipped");
                        outcomes.push(reason);
                    }
                }
            }
        }

        let digest = self.state_tree.root();
        self.state_salt = commitment::next_salt(self.state_salt, digest)?;
        self.no_ops.extend(&outcomes);
        Ok(outcomes)
    }

    fn apply_message(&mut self, message: &PublishMessage) -> std::result::Result<(), NoOpReason> {
        let shared = ecdh_shared_key(self.operator.formatted_priv_key_fr(), &message.enc_pub);
        let plaintext = poseidon_decrypt(&message.ciphertext, shared, 0, 7)
            .map_err(|_| NoOpReason::AuthTagMismatch)?;

        let packed =
            PackedCommand::unpack(plaintext[0]).map_err(|_| NoOpReason::StateIdxOutOfRange)?;
        let state_idx = packed.state_idx as usize;
        if state_idx >= self.state_leaves.len() {
            return Err(NoOpReason::StateIdxOutOfRange);
        }
        if !self.active_leaves[state_idx].is_active() {
            return Err(NoOpReason::Deactivated);
        }
        if packed.nonce != self.state_leaves[state_idx].nonce + 1 {
            return Err(NoOpReason::NonceMismatch);
        }

        let hash = poseidon_t3(&[plaintext[0], plaintext[1], plaintext[2]])
            .map_err(|_| NoOpReason::BadSignature)?;
        let sig = Signature {
            r8: EdwardsAffine::new_unchecked(plaintext[3], plaintext[4]),
            s: field::biguint_to_fr(&field::fq_to_biguint(&plaintext[5])),
        };
        eddsa::verify(hash, &sig, &self.state_leaves[state_idx].pub_key)
            .map_err(|_| NoOpReason::BadSignature)?;

        if packed.vote_option_idx != 0 || packed.new_vote_weight != 0 {
            self.apply_vote(state_idx, packed.vote_option_idx, packed.new_vote_weight)?;
        }

        let new_pub_is_rotation = !(plaintext[1].is_zero() && plaintext[2].is_zero());
        let leaf = &mut self.state_leaves[state_idx];
        leaf.nonce = packed.nonce;
        if new_pub_is_rotation {
            leaf.pub_key = EdwardsAffine::new_unchecked(plaintext[1], plaintext[2]);
        }
        leaf.vote_option_tree_root = self.vote_option_trees[state_idx].root();

        let new_hash = leaf.hash(self.config.is_amaci).map_err(|_| NoOpReason::BadSignature)?;
        self.state_tree
            .update_leaf(state_idx as u64, new_hash)
            .map_err(|_| NoOpReason::StateIdxOutOfRange)?;
        Ok(())
    }

    fn apply_vote(
        &mut self,
        state_idx: usize,
        vote_option_idx: u32,
        new_weight: u128,
    ) -> std::result::Result<(), NoOpReason> {
        let cost = |w: u128| -> Option<u128> {
            if self.config.quadratic {
                w.checked_mul(w)
            } else {
                Some(w)
            }
        };

        let prev_weight = self
            .vote_weights[state_idx]
            .get(&vote_option_idx)
            .copied()
            .unwrap_or(0);
        let prev_cost = cost(prev_weight).ok_or(NoOpReason::InsufficientBalance)?;
        let new_cost = cost(new_weight).ok_or(NoOpReason::InsufficientBalance)?;

        let balance = self.state_leaves[state_idx].balance;
        let refunded = balance
            .checked_add(prev_cost)
            .ok_or(NoOpReason::InsufficientBalance)?;
        let new_balance = refunded
            .checked_sub(new_cost)
            .ok_or(NoOpReason::InsufficientBalance)?;

        self.state_leaves[state_idx].balance = new_balance;
        self.vote_weights[state_idx].insert(vote_option_idx, new_weight);
        self.vote_option_trees[state_idx]
            .update_leaf(
                vote_option_idx as u64,
                field::biguint_to_fq(&num_bigint::BigUint::from(new_weight)),
            )
            .map_err(|_| NoOpReason::StateIdxOutOfRange)?;
        Ok(())
    }

    /// `PROCESSING` → `TALLYING`. Requires the message queue fully drained.
    pub fn stop_processing(&mut self) -> Result<()> {
        self.require_state(RoundState::Processing, "stopProcessingPeriod")?;
        if !self.message_queue.is_empty() {
            return Err(AmaciError::WrongRoundState(
                "PROCESSING (queue not drained)",
                "stopProcessingPeriod",
            ));
        }
        self.state = RoundState::Tallying;
        info!("round entered TALLYING");
        Ok(())
    }

    /// Accumulates up to `batch_size` more state leaves into the running
    /// per-option tally.
    #[instrument(skip(self))]
    pub fn process_tally_batch(&mut self, batch_size: usize) -> Result<()> {
        self.require_state(RoundState::Tallying, "processTally")?;

        let end = (self.tally_cursor + batch_size).min(self.state_leaves.len());
        for idx in self.tally_cursor..end {
            for (&option, &weight) in &self.vote_weights[idx] {
                if (option as usize) >= self.tally.len() {
                    continue;
                }
                let cost = if self.config.quadratic {
                    weight.saturating_mul(weight)
                } else {
                    weight
                };
                self.tally[option as usize].votes += weight;
                self.tally[option as usize].voice_credits_spent += cost;
            }
        }
        self.tally_cursor = end;

        let digest = Fq::from(self.tally_cursor as u64);
        self.tally_salt = commitment::next_salt(self.tally_salt, digest)?;
        debug!(cursor = self.tally_cursor, "tally batch processed");
        Ok(())
    }

    /// `TALLYING` → `ENDED`. Requires every state leaf tallied.
    pub fn stop_tallying(&mut self) -> Result<()> {
        self.require_state(RoundState::Tallying, "stopTallyingPeriod")?;
        if self.tally_cursor < self.state_leaves.len() {
            return Err(AmaciError::WrongRoundState(
                "TALLYING (not all leaves tallied)",
                "stopTallyingPeriod",
            ));
        }
        self.state = RoundState::Ended;
        info!("round ENDED");
        Ok(())
    }

    pub fn state_commitment(&self) -> Result<Fq> {
        commitment::state_commitment(self.state_tree.root(), self.state_salt)
    }

    pub fn tally_commitment(&self, results_root: Fq) -> Result<Fq> {
        commitment::tally_commitment(results_root, self.tally_salt)
    }

    /// Per-option `(votes, voice_credits_spent)`, encoded the way a
    /// contract would store a single tally slot: `votes * 10^24 +
    /// voice_credits_spent`.
    pub fn tally_results(&self) -> &[TallyResult] {
        &self.tally
    }

    pub fn encode_tally_result(result: &TallyResult) -> u128 {
        result.votes * 1_000_000_000_000_000_000_000_000u128 + result.voice_credits_spent
    }

    pub fn state_tree_root(&self) -> Fq {
        self.state_tree.root()
    }

    pub fn deactivate_leaves(&self) -> &[DeactivateMessageLeaf] {
        &self.deactivate_leaves
    }
}

fn packed_salt(salt: u64) -> Fq {
    Fq::from(salt)
}

fn state_name(state: RoundState) -> &'static str {
    match state {
        RoundState::Filling => "FILLING",
        RoundState::Processing => "PROCESSING",
        RoundState::Tallying => "TALLYING",
        RoundState::Ended => "ENDED",
    }
}
