//! Property-based invariant checks across the packed-command encoding,
//! point packing, and quinary Merkle tree arithmetic.

use amaci_core::baby_jubjub::{self, base8, mul_point_escalar};
use amaci_core::merkle::MerkleTree;
use amaci_core::pack::PackedCommand;
use ark_ed_on_bn254::{Fq, Fr};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn packed_command_roundtrips_for_any_in_range_fields(
        nonce in any::<u32>(),
        state_idx in any::<u32>(),
        vote_option_idx in any::<u32>(),
        new_vote_weight in 0u128..(1u128 << 96),
        salt in 0u64..(1u64 << 56),
    ) {
        let cmd = PackedCommand {
            nonce,
            state_idx,
            vote_option_idx,
            new_vote_weight,
            salt,
        };
        let packed = cmd.pack().unwrap();
        prop_assert_eq!(PackedCommand::unpack(packed).unwrap(), cmd);
    }

    #[test]
    fn point_pack_unpack_roundtrips_for_any_scalar(k in any::<u64>()) {
        let p = mul_point_escalar(&base8(), Fr::from(k));
        let packed = baby_jubjub::pack_point(&p);
        let unpacked = baby_jubjub::unpack_point(&packed).unwrap();
        prop_assert_eq!(unpacked, p);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn merkle_update_leaf_matches_init_leaves_for_any_small_tree(
        values in prop::collection::vec(any::<u64>(), 1..25),
    ) {
        let depth = 2;
        let fq_values: Vec<Fq> = values.iter().map(|&v| Fq::from(v)).collect();

        let mut sequential = MerkleTree::new(depth).unwrap();
        for (i, v) in fq_values.iter().enumerate() {
            sequential.update_leaf(i as u64, *v).unwrap();
        }
        let batched = MerkleTree::init_leaves(depth, &fq_values).unwrap();

        prop_assert_eq!(sequential.root(), batched.root());
    }
}
