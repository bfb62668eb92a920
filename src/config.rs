//! Round configuration
//!
//! The fixed parameters a round is constructed with: tree depths, the
//! per-voter voice-credit allotment, and the cost model. Kept as a plain
//! serializable struct, separate from [`crate::operator::engine::Engine`]
//! itself, so an embedder can load it from a round's on-chain deployment
//! parameters rather than hard-code it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters fixed at round creation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoundConfig {
    /// Depth of the quinary state tree (one leaf per registered voter).
    pub state_tree_depth: u32,
    /// Depth of the quinary intermediate-state tree a tally batch covers:
    /// a tally batch processes `5^int_state_tree_depth` leaves at a time.
    pub int_state_tree_depth: u32,
    /// Depth of the per-voter quinary vote-option tree.
    pub vote_option_tree_depth: u32,
    /// Depth of the deactivate tree.
    pub deactivate_tree_depth: u32,
    /// Starting balance credited to every signed-up voter.
    pub voice_credit_amount: u128,
    /// Quadratic cost (`weight^2`) vs linear (`weight`) voice-credit spend.
    pub quadratic: bool,
    /// Whether AddNewKey/deactivate processing is active for this round.
    pub is_amaci: bool,
    /// Messages drained per `processMessage` batch.
    pub batch_size: usize,
}

impl RoundConfig {
    /// Leaves covered by one tally batch, `5^int_state_tree_depth`.
    pub fn tally_batch_size(&self) -> usize {
        5usize.pow(self.int_state_tree_depth)
    }
}
