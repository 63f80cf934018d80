//! Signer state shared by the key-generation and signing phases.

use crate::commitment::{CommitmentMasterPublicKey, MasterPublicKeyShare};
use crate::errors::{Error, Result};
use crate::group::{SignerGroup, SignerId};
use crate::key::{PrivateKeyShare, ThresholdEcdsaKey};
use crate::messages::MasterPublicKeyShareMessage;
use crate::paillier::ThresholdPrivateKey;
use crate::parameters::{CurveId, PublicParameters};
use crate::utils::CurvePoint;
use crate::zkp;
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;

/// State every group member carries through both protocol phases: its
/// identity, its threshold Paillier key share and the public parameters of
/// the deployment.
#[derive(Clone)]
pub(crate) struct SignerCore {
    pub(crate) id: SignerId,
    pub(crate) paillier_key: ThresholdPrivateKey,
    pub(crate) group_parameters: PublicParameters,
    pub(crate) zkp_parameters: zkp::PublicParameters,
    pub(crate) signer_group: SignerGroup,
}

impl Debug for SignerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerCore")
            .field("id", &self.id)
            .field("paillier_key", &"[redacted]")
            .field("group_parameters", &self.group_parameters)
            .field("signer_group", &self.signer_group)
            .finish()
    }
}

impl SignerCore {
    fn new(
        id: SignerId,
        paillier_key: ThresholdPrivateKey,
        group_parameters: PublicParameters,
        zkp_parameters: zkp::PublicParameters,
        signer_group: SignerGroup,
    ) -> Result<Self> {
        if group_parameters.curve != CurveId::Secp256k1 {
            return Err(Error::IncompatibleCurve);
        }
        if !signer_group.is_complete() {
            return Err(Error::ParameterGeneration(
                "signer group roster is not complete".to_string(),
            ));
        }
        if !signer_group.contains(&id) {
            return Err(Error::ParameterGeneration(format!(
                "signer {} is not a member of the group",
                id,
            )));
        }
        Ok(Self {
            id,
            paillier_key,
            group_parameters,
            zkp_parameters,
            signer_group,
        })
    }

    /// Publish this member's additive share of the phase's commitment
    /// master public key.
    fn generate_master_public_key_share<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> MasterPublicKeyShareMessage {
        MasterPublicKeyShareMessage {
            sender_id: self.id,
            master_public_key_share: MasterPublicKeyShare::random(rng),
        }
    }

    /// Combine every member's share into the phase's master public key.
    /// Requires exactly one share from each group member, the local
    /// signer's included.
    fn combine_master_public_key_shares(
        &self,
        messages: &[MasterPublicKeyShareMessage],
    ) -> Result<CommitmentMasterPublicKey> {
        let senders: Vec<SignerId> = messages.iter().map(|m| m.sender_id).collect();
        self.signer_group
            .expect_one_message_per_member(&senders, "master public key shares")?;
        let shares: Vec<MasterPublicKeyShare> = messages
            .iter()
            .map(|m| m.master_public_key_share)
            .collect();
        Ok(CommitmentMasterPublicKey::combine(&shares))
    }
}

/// A T-ECDSA group member during the initialization phase, before the
/// shared key exists. Runs the master-public-key sub-protocol and the two
/// key-generation rounds.
#[derive(Clone, Debug)]
pub struct LocalSigner {
    pub(crate) core: SignerCore,
    pub(crate) commitment_master_key: Option<CommitmentMasterPublicKey>,
    pub(crate) keygen_state: Option<crate::keygen::KeygenState>,
}

impl LocalSigner {
    /// Create a signer for the initialization phase. There must never be
    /// two `LocalSigner`s for the same [`ThresholdPrivateKey`] instance.
    pub fn new(
        id: SignerId,
        paillier_key: ThresholdPrivateKey,
        group_parameters: PublicParameters,
        zkp_parameters: zkp::PublicParameters,
        signer_group: SignerGroup,
    ) -> Result<Self> {
        Ok(Self {
            core: SignerCore::new(
                id,
                paillier_key,
                group_parameters,
                zkp_parameters,
                signer_group,
            )?,
            commitment_master_key: None,
            keygen_state: None,
        })
    }

    /// This signer's identifier.
    pub fn id(&self) -> SignerId {
        self.core.id
    }

    /// Publish this member's master public key share for the key-generation
    /// phase.
    pub fn generate_master_public_key_share<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> MasterPublicKeyShareMessage {
        self.core.generate_master_public_key_share(rng)
    }

    /// Combine all members' shares into the key-generation phase's master
    /// public key.
    pub fn combine_master_public_key_shares(
        &self,
        messages: &[MasterPublicKeyShareMessage],
    ) -> Result<CommitmentMasterPublicKey> {
        self.core.combine_master_public_key_shares(messages)
    }

    /// Install the combined master public key. Must happen before the
    /// first key-generation round.
    pub fn set_commitment_master_public_key(&mut self, key: CommitmentMasterPublicKey) {
        self.commitment_master_key = Some(key);
    }

    /// Transform this `LocalSigner` into a [`Signer`] once key generation
    /// completed and the [`ThresholdEcdsaKey`] is ready. There is one
    /// instance of the key for all signers.
    pub fn with_key(self, key: ThresholdEcdsaKey) -> Result<Signer> {
        if key.curve != self.core.group_parameters.curve {
            return Err(Error::IncompatibleCurve);
        }
        Ok(Signer {
            core: self.core,
            key,
            commitment_master_key: None,
        })
    }
}

/// A fully initialized T-ECDSA group member, ready for signing. Holds the
/// `(t, n)` threshold sharing of the group's ECDSA key.
#[derive(Clone, Debug)]
pub struct Signer {
    pub(crate) core: SignerCore,
    pub(crate) key: ThresholdEcdsaKey,
    pub(crate) commitment_master_key: Option<CommitmentMasterPublicKey>,
}

impl Signer {
    /// This signer's identifier.
    pub fn id(&self) -> SignerId {
        self.core.id
    }

    /// The public ECDSA key of the group; identical for all signers.
    pub fn public_key(&self) -> &CurvePoint {
        self.key.public_key()
    }

    /// The durable private state of this member, for the storage boundary.
    pub fn private_key_share(&self) -> PrivateKeyShare {
        PrivateKeyShare::new(self.core.paillier_key.clone(), self.key.clone())
    }

    /// Publish this member's master public key share for the signing
    /// phase. The signing phase runs its own sub-protocol, independent of
    /// the key-generation one.
    pub fn generate_master_public_key_share<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> MasterPublicKeyShareMessage {
        self.core.generate_master_public_key_share(rng)
    }

    /// Combine all members' shares into the signing phase's master public
    /// key.
    pub fn combine_master_public_key_shares(
        &self,
        messages: &[MasterPublicKeyShareMessage],
    ) -> Result<CommitmentMasterPublicKey> {
        self.core.combine_master_public_key_shares(messages)
    }

    /// Install the combined master public key. Must happen before the
    /// first signing round.
    pub fn set_commitment_master_public_key(&mut self, key: CommitmentMasterPublicKey) {
        self.commitment_master_key = Some(key);
    }

    pub(crate) fn commitment_master_key(&self) -> Result<CommitmentMasterPublicKey> {
        self.commitment_master_key
            .ok_or(Error::MissingMasterPublicKey)
    }
}
