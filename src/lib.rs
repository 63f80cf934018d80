//! Threshold ECDSA signatures based on the GGN16 protocol.
//!
//! A group of `n` mutually distrusting parties jointly holds a single
//! ECDSA key pair such that any `t` of them can produce a valid signature,
//! while no smaller coalition ever learns the private key or can forge a
//! signature. The construction follows Gennaro, Goldfeder and Narayanan,
//! *Threshold-Optimal DSA/ECDSA Signatures and an Application to Bitcoin
//! Wallet Security* (ACNS 2016): an additively homomorphic threshold
//! Paillier cryptosystem carries an encrypted sharing of the private key,
//! a multi-trapdoor commitment scheme makes the reveal rounds
//! non-malleable, and Fiat–Shamir range proofs keep actively malicious
//! parties honest.
//!
//! The crate exposes the protocol core only: a two-round distributed key
//! generation ([`LocalSigner`]) and a six-round signing protocol
//! ([`Signer`] through [`Round5Signer`]) expressed as pure round-transition
//! functions. Each round consumes the previous round's state and a
//! complete, validated set of peer messages and produces the next state
//! plus outgoing messages. Delivering messages, waiting for peers, retry
//! policy and peer exclusion are all the calling application's concern —
//! no round function blocks, and abandoning a signing attempt is just
//! dropping its state.

#![warn(missing_docs)]

#[macro_use]
pub mod errors;

pub mod commitment;
pub mod group;
mod key;
mod keygen;
pub mod messages;
pub mod paillier;
mod parameters;
#[cfg(test)]
mod safe_primes;
mod sign;
mod signer;
mod utils;
pub mod zkp;

pub use errors::{Error, QuorumScope, Result};
pub use group::{SignerGroup, SignerId};
pub use key::{PrivateKeyShare, ThresholdEcdsaKey};
pub use parameters::{CurveId, PublicParameters, DEFAULT_PAILLIER_KEY_BIT_LENGTH};
pub use sign::{Round1Signer, Round2Signer, Round3Signer, Round4Signer, Round5Signer, Signature};
pub use signer::{LocalSigner, Signer};
pub use utils::CurvePoint;
