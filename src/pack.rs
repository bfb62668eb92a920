//! Packed Command Module
//!
//! The 192-bit command layout carried inside a single field element: a
//! vote (or deactivate/key-rotation) command packs `nonce`, `state_idx`,
//! `vote_option_idx`, `new_vote_weight` and a random `salt` into one
//! `Fq`, low bits first.
//!
//! ```text
//! bits   0..31   nonce            (u32)
//! bits  32..63   state_idx        (u32)
//! bits  64..95   vote_option_idx  (u32)
//! bits  96..191  new_vote_weight  (96 bits effective)
//! bits 192..247  salt             (56 bits)
//! ```

use crate::error::{AmaciError, Result};
use crate::field;
use ark_ed_on_bn254::Fq;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

const NONCE_SHIFT: u32 = 0;
const STATE_IDX_SHIFT: u32 = 32;
const VOTE_OPTION_IDX_SHIFT: u32 = 64;
const WEIGHT_SHIFT: u32 = 96;
const SALT_SHIFT: u32 = 192;

const WEIGHT_BITS: u32 = 96;
const SALT_BITS: u32 = 56;

/// A decoded command: either a vote (`vote_option_idx`/`new_vote_weight`
/// non-zero) or a deactivate/key-rotation command (both zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedCommand {
    pub nonce: u32,
    pub state_idx: u32,
    pub vote_option_idx: u32,
    pub new_vote_weight: u128,
    pub salt: u64,
}

impl PackedCommand {
    /// Packs into the single field element the circuit expects.
    pub fn pack(&self) -> Result<Fq> {
        if self.new_vote_weight >= (1u128 << WEIGHT_BITS) {
            return Err(AmaciError::ValueTooLarge(
                self.new_vote_weight.to_string(),
                WEIGHT_BITS,
            ));
        }
        if self.salt >= (1u64 << SALT_BITS) {
            return Err(AmaciError::ValueTooLarge(self.salt.to_string(), SALT_BITS));
        }

        let mut acc = BigUint::from(self.nonce);
        acc += BigUint::from(self.state_idx) << STATE_IDX_SHIFT;
        acc += BigUint::from(self.vote_option_idx) << VOTE_OPTION_IDX_SHIFT;
        acc += BigUint::from(self.new_vote_weight) << WEIGHT_SHIFT;
        acc += BigUint::from(self.salt) << SALT_SHIFT;

        if acc >= field::snark_field_size() {
            return Err(AmaciError::PackOverflow);
        }
        Ok(field::biguint_to_fq(&acc))
    }

    /// Unpacks a command from its field-element encoding.
    pub fn unpack(packed: Fq) -> Result<Self> {
        let n = field::fq_to_biguint(&packed);

        let nonce = extract(&n, NONCE_SHIFT, 32)
            .to_u32()
            .ok_or(AmaciError::PackOverflow)?;
        let state_idx = extract(&n, STATE_IDX_SHIFT, 32)
            .to_u32()
            .ok_or(AmaciError::PackOverflow)?;
        let vote_option_idx = extract(&n, VOTE_OPTION_IDX_SHIFT, 32)
            .to_u32()
            .ok_or(AmaciError::PackOverflow)?;
        let new_vote_weight = extract(&n, WEIGHT_SHIFT, WEIGHT_BITS)
            .to_u128()
            .ok_or(AmaciError::PackOverflow)?;
        let salt = extract(&n, SALT_SHIFT, SALT_BITS)
            .to_u64()
            .ok_or(AmaciError::PackOverflow)?;

        Ok(Self {
            nonce,
            state_idx,
            vote_option_idx,
            new_vote_weight,
            salt,
        })
    }

    /// Builds the command a deactivate message carries: `nonce = 0` and
    /// no vote option/weight, but still addressed at the sender's own
    /// `state_idx` — the operator has no other way to locate the state
    /// leaf a deactivate request targets.
    pub fn deactivate(state_idx: u32, salt: u64) -> Self {
        Self {
            nonce: 0,
            state_idx,
            vote_option_idx: 0,
            new_vote_weight: 0,
            salt,
        }
    }
}

fn extract(n: &BigUint, shift: u32, bits: u32) -> BigUint {
    let mask = (BigUint::from(1u8) << bits) - BigUint::from(1u8);
    (n >> shift) & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let cmd = PackedCommand {
            nonce: 3,
            state_idx: 7,
            vote_option_idx: 2,
            new_vote_weight: 9_000,
            salt: 0x00ab_cdef_1234,
        };
        let packed = cmd.pack().unwrap();
        assert_eq!(PackedCommand::unpack(packed).unwrap(), cmd);
    }

    #[test]
    fn deactivate_command_roundtrip() {
        let cmd = PackedCommand::deactivate(5, 42);
        let packed = cmd.pack().unwrap();
        let unpacked = PackedCommand::unpack(packed).unwrap();
        assert_eq!(unpacked, cmd);
        assert_eq!(unpacked.nonce, 0);
        assert_eq!(unpacked.state_idx, 5);
        assert_eq!(unpacked.vote_option_idx, 0);
    }

    #[test]
    fn pack_rejects_oversized_weight() {
        let cmd = PackedCommand {
            nonce: 1,
            state_idx: 0,
            vote_option_idx: 0,
            new_vote_weight: 1u128 << 96,
            salt: 0,
        };
        assert!(matches!(
            cmd.pack(),
            Err(AmaciError::ValueTooLarge(_, 96))
        ));
    }

    #[test]
    fn pack_rejects_oversized_salt() {
        let cmd = PackedCommand {
            nonce: 1,
            state_idx: 0,
            vote_option_idx: 0,
            new_vote_weight: 0,
            salt: 1u64 << 56,
        };
        assert!(matches!(
            cmd.pack(),
            Err(AmaciError::ValueTooLarge(_, 56))
        ));
    }

    #[test]
    fn fields_do_not_overlap() {
        let cmd = PackedCommand {
            nonce: u32::MAX,
            state_idx: u32::MAX,
            vote_option_idx: u32::MAX,
            new_vote_weight: (1u128 << 96) - 1,
            salt: (1u64 << 56) - 1,
        };
        let packed = cmd.pack().unwrap();
        assert_eq!(PackedCommand::unpack(packed).unwrap(), cmd);
    }
}
