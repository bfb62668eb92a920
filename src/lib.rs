//! AMACI client-side cryptographic engine
//!
//! Baby Jubjub curve arithmetic, the Poseidon hash family (including
//! Poseidon-encrypt/decrypt), EdDSA-Poseidon signatures, rerandomisable
//! ElGamal, quinary Merkle trees, and the voter/operator protocol built
//! on top of them: vote-payload construction, anonymous key rotation via
//! AddNewKey, and the operator-side round state machine.
//!
//! Wire encoding to a specific chain, an indexer, HD-wallet mnemonics, a
//! CLI, fee logic, the zk-SNARK proving backend, consensus, persistence,
//! network transport, trusted setup, and circuit compilation are all out
//! of scope: this crate models the cryptography and state transitions a
//! prover/verifier pair would be built around, not the surrounding
//! infrastructure.

pub mod addnewkey;
pub mod baby_jubjub;
pub mod commitment;
pub mod config;
pub mod eddsa;
pub mod elgamal;
pub mod error;
pub mod field;
pub mod identity;
pub mod merkle;
pub mod operator;
pub mod pack;
pub mod poseidon;
#[cfg(feature = "serde")]
pub mod testvectors;
pub mod vote;

pub use error::{AmaciError, Result};
