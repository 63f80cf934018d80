//! Message shapes exchanged between signers.
//!
//! Each protocol round defines one message type carrying the sender (and,
//! for rounds addressed per peer, the receiver). Messages are immutable
//! once created; the transport delivering them between parties is an
//! external collaborator and so is their wire framing.

use crate::commitment::{DecommitmentKey, MasterPublicKeyShare, MultiTrapdoorCommitment};
use crate::group::SignerId;
use crate::paillier::{Ciphertext, PartialDecryption};
use crate::utils::CurvePoint;
use crate::zkp::key_range::KeyRangeProof;
use crate::zkp::secret_key_factor::SecretKeyFactorRangeProof;
use crate::zkp::signature_factor::SignatureFactorRangeProof;
use serde::{Deserialize, Serialize};

/// Broadcast share of a phase's commitment master public key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MasterPublicKeyShareMessage {
    pub(crate) sender_id: SignerId,
    pub(crate) master_public_key_share: MasterPublicKeyShare,
}

impl MasterPublicKeyShareMessage {
    /// The signer that published this share.
    pub fn sender_id(&self) -> SignerId {
        self.sender_id
    }
}

/// First key-generation round: a commitment to the sender's public ECDSA
/// key share, addressed individually to one peer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicKeyShareCommitmentMessage {
    pub(crate) sender_id: SignerId,
    pub(crate) receiver_id: SignerId,
    pub(crate) public_key_share_commitment: MultiTrapdoorCommitment,
}

/// Second key-generation round: the revealed public key share, the
/// decommitment key validating it against the earlier commitment, the
/// Paillier-encrypted secret key share and its range proof.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyShareRevealMessage {
    pub(crate) sender_id: SignerId,
    pub(crate) receiver_id: SignerId,
    pub(crate) encrypted_secret_key_share: Ciphertext,
    pub(crate) public_key_share: CurvePoint,
    pub(crate) public_key_share_decommitment_key: DecommitmentKey,
    pub(crate) secret_key_proof: KeyRangeProof,
}

/// First signing round: commitment to `(u_i, v_i)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRound1Message {
    pub(crate) sender_id: SignerId,
    pub(crate) receiver_id: SignerId,
    pub(crate) secret_key_factor_share_commitment: MultiTrapdoorCommitment,
}

/// Second signing round: reveal of `u_i = E(ρ_i)` and `v_i = E(ρ_i·x)`
/// with the matching decommitment key and range proof.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRound2Message {
    pub(crate) sender_id: SignerId,
    pub(crate) receiver_id: SignerId,
    pub(crate) secret_key_factor_share: Ciphertext,
    pub(crate) secret_key_multiple_share: Ciphertext,
    pub(crate) secret_key_factor_share_decommitment_key: DecommitmentKey,
    pub(crate) secret_key_factor_proof: SecretKeyFactorRangeProof,
}

/// Third signing round: commitment to `(r_i, w_i)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRound3Message {
    pub(crate) sender_id: SignerId,
    pub(crate) receiver_id: SignerId,
    pub(crate) signature_factor_share_commitment: MultiTrapdoorCommitment,
}

/// Fourth signing round: reveal of `r_i = g^{k_i}` and
/// `w_i = E(k_i·ρ + c_i·q)` with the matching decommitment key and range
/// proof.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRound4Message {
    pub(crate) sender_id: SignerId,
    pub(crate) receiver_id: SignerId,
    pub(crate) signature_factor_public_share: CurvePoint,
    pub(crate) signature_unmask_share: Ciphertext,
    pub(crate) signature_factor_share_decommitment_key: DecommitmentKey,
    pub(crate) signature_factor_proof: SignatureFactorRangeProof,
}

/// Fifth signing round: broadcast partial decryption of the combined
/// signature unmask `w`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRound5Message {
    pub(crate) sender_id: SignerId,
    pub(crate) signature_unmask_partial_decryption: PartialDecryption,
}

/// Sixth signing round: broadcast partial decryption of the encrypted
/// signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRound6Message {
    pub(crate) sender_id: SignerId,
    pub(crate) signature_partial_decryption: PartialDecryption,
}

macro_rules! impl_addressed_accessors {
    ($($message:ty),*) => {
        $(impl $message {
            /// The signer that sent this message.
            pub fn sender_id(&self) -> SignerId {
                self.sender_id
            }

            /// The signer this message is addressed to.
            pub fn receiver_id(&self) -> SignerId {
                self.receiver_id
            }
        })*
    };
}

impl_addressed_accessors!(
    PublicKeyShareCommitmentMessage,
    KeyShareRevealMessage,
    SignRound1Message,
    SignRound2Message,
    SignRound3Message,
    SignRound4Message
);

macro_rules! impl_broadcast_accessors {
    ($($message:ty),*) => {
        $(impl $message {
            /// The signer that sent this message.
            pub fn sender_id(&self) -> SignerId {
                self.sender_id
            }
        })*
    };
}

impl_broadcast_accessors!(SignRound5Message, SignRound6Message);
