//! Signer identities and the signing group roster.

use crate::errors::{Error, QuorumScope, Result};
use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// A stable identifier for a single signer in the group.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct SignerId(u64);

impl SignerId {
    /// Draw a fresh non-zero identifier.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let id = rng.gen::<u64>();
            if id != 0 {
                return Self(id);
            }
        }
    }
}

impl Display for SignerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0.to_be_bytes()))
    }
}

/// The roster of a T-ECDSA signing group.
///
/// `threshold` is just for signing. If anything goes wrong during key
/// generation, e.g. one of the ZKPs fails or any commitment opens
/// incorrectly, the key generation protocol terminates without an output —
/// all `initial_group_size` members must behave.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignerGroup {
    signer_ids: Vec<SignerId>,
    initial_group_size: usize,
    threshold: usize,
}

impl SignerGroup {
    /// Create a group roster. The identifier list must be free of
    /// duplicates and no larger than the declared group size, and the
    /// signing threshold must be strictly below the group size.
    pub fn new(
        initial_group_size: usize,
        threshold: usize,
        signer_ids: Vec<SignerId>,
    ) -> Result<Self> {
        if threshold == 0 || threshold >= initial_group_size {
            return Err(Error::ParameterGeneration(format!(
                "signing threshold {} must be positive and below the group size {}",
                threshold, initial_group_size,
            )));
        }
        let distinct: BTreeSet<_> = signer_ids.iter().collect();
        if distinct.len() != signer_ids.len() || signer_ids.len() > initial_group_size {
            return Err(Error::ParameterGeneration(
                "signer identifiers must be unique and within the group size".to_string(),
            ));
        }
        Ok(Self {
            signer_ids,
            initial_group_size,
            threshold,
        })
    }

    /// A group is complete when every declared seat is filled.
    pub fn is_complete(&self) -> bool {
        self.signer_ids.len() == self.initial_group_size
    }

    /// The declared size of the group.
    pub fn initial_group_size(&self) -> usize {
        self.initial_group_size
    }

    /// How many signatures-worth of members may fail while the group can
    /// still be expected to sign.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The number of peers each member exchanges messages with.
    pub fn peer_signer_count(&self) -> usize {
        self.initial_group_size - 1
    }

    pub(crate) fn contains(&self, id: &SignerId) -> bool {
        self.signer_ids.contains(id)
    }

    /// All member identifiers except `own_id`.
    pub(crate) fn peer_signer_ids(&self, own_id: &SignerId) -> Vec<SignerId> {
        self.signer_ids
            .iter()
            .copied()
            .filter(|id| id != own_id)
            .collect()
    }

    /// Gate for combine steps that gather one message per peer: there must
    /// be exactly one message from every group member other than `own_id`,
    /// each addressed to `own_id`. Anything else is a quorum failure.
    pub(crate) fn expect_one_message_per_peer(
        &self,
        own_id: &SignerId,
        messages: &[(SignerId, SignerId)],
        required: &'static str,
    ) -> Result<()> {
        let expected = self.peer_signer_count();
        if messages.len() != expected {
            return Err(Error::QuorumMismatch {
                required,
                scope: QuorumScope::Peers,
                expected,
                actual: messages.len(),
            });
        }
        let valid_senders: BTreeSet<_> = messages
            .iter()
            .filter(|(sender, receiver)| {
                receiver == own_id && sender != own_id && self.contains(sender)
            })
            .map(|(sender, _)| *sender)
            .collect();
        if valid_senders.len() != expected {
            return Err(Error::QuorumMismatch {
                required,
                scope: QuorumScope::Peers,
                expected,
                actual: valid_senders.len(),
            });
        }
        Ok(())
    }

    /// Gate for combine steps that gather one broadcast message per group
    /// member, the local signer included.
    pub(crate) fn expect_one_message_per_member(
        &self,
        senders: &[SignerId],
        required: &'static str,
    ) -> Result<()> {
        let expected = self.initial_group_size;
        if senders.len() != expected {
            return Err(Error::QuorumMismatch {
                required,
                scope: QuorumScope::Group,
                expected,
                actual: senders.len(),
            });
        }
        let valid_senders: BTreeSet<_> = senders
            .iter()
            .filter(|sender| self.contains(sender))
            .copied()
            .collect();
        if valid_senders.len() != expected {
            return Err(Error::QuorumMismatch {
                required,
                scope: QuorumScope::Group,
                expected,
                actual: valid_senders.len(),
            });
        }
        Ok(())
    }
}
