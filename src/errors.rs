//! Error types produced during an execution of the protocol.
//!
//! Validation failures carry the identifier of the offending sender so that
//! the orchestration layer driving the protocol can decide on exclusion or
//! accusation; the protocol core itself never retries.

use crate::group::SignerId;
use core::fmt;
use thiserror::Error;

/// The default `Result` type used in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which set of group members a combine step gathers messages from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuorumScope {
    /// One message from every peer (everyone but the local signer).
    Peers,
    /// One message from every member, the local signer included.
    Group,
}

impl fmt::Display for QuorumScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuorumScope::Peers => write!(f, "group peer members"),
            QuorumScope::Group => write!(f, "group members"),
        }
    }
}

/// An error raised by a round or combine function.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// A combine step did not receive exactly one message of the required
    /// kind from each expected sender.
    #[error("{required} required from all {scope}; got {actual}, expected {expected}")]
    QuorumMismatch {
        /// Human-readable name of the message kind, e.g. "commitments".
        required: &'static str,
        /// Whether messages were expected from peers only or the whole group.
        scope: QuorumScope,
        /// How many messages the combine step needed.
        expected: usize,
        /// How many usable messages it actually received.
        actual: usize,
    },

    /// A sender's message from an earlier sub-round has no counterpart in the
    /// later sub-round.
    #[error("no matching {required} for signer with ID = {sender}")]
    MissingPeerMessage {
        /// Name of the missing message kind.
        required: &'static str,
        /// The sender whose message is missing.
        sender: SignerId,
    },

    /// A revealed value did not open the commitment published earlier.
    #[error("commitment from signer with ID = {sender} does not open to the revealed values")]
    InvalidCommitment {
        /// The sender of the rejected reveal.
        sender: SignerId,
    },

    /// A zero-knowledge range proof failed verification.
    #[error("zero-knowledge proof from signer with ID = {sender} failed to verify")]
    InvalidProof {
        /// The sender of the rejected proof.
        sender: SignerId,
    },

    /// A key share records a curve other than the protocol's configured one.
    #[error("key share curve is incompatible with the protocol curve")]
    IncompatibleCurve,

    /// Public parameter generation (safe primes, group generators) failed.
    #[error("could not generate protocol parameters: {0}")]
    ParameterGeneration(String),

    /// A commitment was requested before the per-phase master public key
    /// sub-protocol completed.
    #[error("commitment master public key has not been established for this phase")]
    MissingMasterPublicKey,

    /// The message digest handed to the final signing round has the wrong
    /// length.
    #[error("message digest is required to be exactly 32 bytes and it's {0} bytes")]
    InvalidMessageDigest(usize),

    /// An error surfaced by the threshold Paillier cryptosystem.
    #[error("paillier error: {0}")]
    Paillier(#[from] crate::paillier::PaillierError),

    /// Byte-level encoding or decoding failed.
    #[error("serialization failed")]
    Serialization,

    /// A code assumption that was checked at runtime failed to hold.
    #[error("internal invariant violated")]
    InternalInvariantFailed,
}

macro_rules! serialize {
    ($x:expr) => {{
        bincode::serialize($x).or(Err(crate::errors::Error::Serialization))
    }};
}

macro_rules! deserialize {
    ($x:expr) => {{
        bincode::deserialize($x).or(Err(crate::errors::Error::Serialization))
    }};
}
