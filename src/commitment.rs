//! Multi-trapdoor commitment scheme.
//!
//! Commitments are computed in the BLS12-381 pairing groups and opened with
//! a bilinear-pairing equality. Each commitment derives a fresh trapdoor
//! public key by hashing a one-time signature verification key into the
//! scalar field, and the commitment value itself is signed with the matching
//! one-time signing key. An adversary who observes a commitment therefore
//! cannot reuse its internal randomness to produce a related commitment to
//! a different message.
//!
//! Before a protocol phase uses commitments, every group member publishes a
//! random master public key share; the shares sum into the single master
//! public key `h` all commitments of that phase are bound to.

use ::group::Group;
use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use ff::Field;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature as OneTimeSignature, SigningKey, VerifyingKey,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};

/// One group member's additive share of a phase's commitment master public
/// key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MasterPublicKeyShare(pub(crate) G2Projective);

impl MasterPublicKeyShare {
    /// Draw a fresh random share.
    pub(crate) fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(G2Projective::random(&mut *rng))
    }
}

/// The combined master public key of a commitment phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommitmentMasterPublicKey(pub(crate) G2Projective);

impl CommitmentMasterPublicKey {
    /// Sum all members' shares into the phase's master public key.
    pub(crate) fn combine(shares: &[MasterPublicKeyShare]) -> Self {
        Self(
            shares
                .iter()
                .fold(G2Projective::identity(), |acc, share| acc + share.0),
        )
    }
}

/// A non-malleable, computationally binding and hiding commitment to a byte
/// string.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiTrapdoorCommitment {
    /// The master public key `h` of the phase the commitment was made in.
    master_public_key: G2Projective,
    /// The commitment value `g^digest * (h * g^trapdoor)^r`.
    commitment: G2Projective,
    /// Verification key of the one-time signature over the commitment value.
    one_time_verification_key: VerifyingKey,
}

/// The secret counterpart of a commitment, disclosed when the committed
/// message is revealed.
#[derive(Clone, Debug, PartialEq)]
pub struct DecommitmentKey {
    r: Scalar,
    one_time_signature: OneTimeSignature,
}

impl MultiTrapdoorCommitment {
    /// Commit to the concatenation of `messages`.
    ///
    /// Returns the commitment together with the decommitment key the
    /// committer later reveals to open it.
    pub fn generate<R: RngCore + CryptoRng>(
        master_public_key: &CommitmentMasterPublicKey,
        rng: &mut R,
        messages: &[&[u8]],
    ) -> (Self, DecommitmentKey) {
        let digest = hash_to_scalar(messages);

        // A fresh one-time keypair per commitment; its verification key
        // determines the per-commitment trapdoor public key.
        let one_time_signing_key = SigningKey::random(&mut *rng);
        let one_time_verification_key = *one_time_signing_key.verifying_key();
        let verification_key_bytes = one_time_verification_key.to_sec1_bytes();
        let trapdoor = hash_to_scalar(&[verification_key_bytes.as_ref()]);

        let r = Scalar::random(&mut *rng);
        let he = master_public_key.0 + G2Projective::generator() * trapdoor;
        let commitment = G2Projective::generator() * digest + he * r;

        let one_time_signature = one_time_signing_key.sign(&g2_to_bytes(&commitment));

        (
            Self {
                master_public_key: master_public_key.0,
                commitment,
                one_time_verification_key,
            },
            DecommitmentKey {
                r,
                one_time_signature,
            },
        )
    }

    /// Check that this commitment was produced from exactly `messages` and
    /// the given decommitment key.
    ///
    /// Both the pairing equality and the one-time signature must hold;
    /// either failing alone means a corrupted or unrelated commitment.
    pub fn verify(&self, decommitment_key: &DecommitmentKey, messages: &[&[u8]]) -> bool {
        let digest = hash_to_scalar(messages);
        let verification_key_bytes = self.one_time_verification_key.to_sec1_bytes();
        let trapdoor = hash_to_scalar(&[verification_key_bytes.as_ref()]);
        let he = self.master_public_key + G2Projective::generator() * trapdoor;

        // commitment = g^digest * he^r  <=>  e(g1^r, he) = e(g1, commitment * g^-digest)
        let lhs = pairing(
            &G1Affine::from(G1Projective::generator() * decommitment_key.r),
            &G2Affine::from(he),
        );
        let rhs = pairing(
            &G1Affine::generator(),
            &G2Affine::from(self.commitment - G2Projective::generator() * digest),
        );

        let signature_valid = self
            .one_time_verification_key
            .verify(
                &g2_to_bytes(&self.commitment),
                &decommitment_key.one_time_signature,
            )
            .is_ok();

        lhs == rhs && signature_valid
    }
}

fn hash_to_scalar(chunks: &[&[u8]]) -> Scalar {
    let mut hasher = Sha512::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let digest: [u8; 64] = hasher.finalize().into();
    Scalar::from_bytes_wide(&digest)
}

fn g2_to_bytes(point: &G2Projective) -> Vec<u8> {
    G2Affine::from(point).to_compressed().to_vec()
}

fn g2_from_bytes<E: serde::de::Error>(bytes: &[u8]) -> Result<G2Projective, E> {
    let fixed: [u8; 96] = bytes
        .try_into()
        .map_err(|_| E::custom("malformed G2 encoding"))?;
    Option::<G2Affine>::from(G2Affine::from_compressed(&fixed))
        .map(G2Projective::from)
        .ok_or_else(|| E::custom("byte string is not a G2 element"))
}

#[derive(Serialize, Deserialize)]
struct PointWire(Vec<u8>);

impl Serialize for MasterPublicKeyShare {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PointWire(g2_to_bytes(&self.0)).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MasterPublicKeyShare {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = PointWire::deserialize(deserializer)?;
        Ok(Self(g2_from_bytes(&wire.0)?))
    }
}

impl Serialize for CommitmentMasterPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PointWire(g2_to_bytes(&self.0)).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CommitmentMasterPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = PointWire::deserialize(deserializer)?;
        Ok(Self(g2_from_bytes(&wire.0)?))
    }
}

#[derive(Serialize, Deserialize)]
struct CommitmentWire {
    master_public_key: Vec<u8>,
    commitment: Vec<u8>,
    one_time_verification_key: Vec<u8>,
}

impl Serialize for MultiTrapdoorCommitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CommitmentWire {
            master_public_key: g2_to_bytes(&self.master_public_key),
            commitment: g2_to_bytes(&self.commitment),
            one_time_verification_key: self.one_time_verification_key.to_sec1_bytes().to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MultiTrapdoorCommitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = CommitmentWire::deserialize(deserializer)?;
        Ok(Self {
            master_public_key: g2_from_bytes(&wire.master_public_key)?,
            commitment: g2_from_bytes(&wire.commitment)?,
            one_time_verification_key: VerifyingKey::from_sec1_bytes(
                &wire.one_time_verification_key,
            )
            .map_err(|_| serde::de::Error::custom("malformed one-time verification key"))?,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct DecommitmentWire {
    r: [u8; 32],
    one_time_signature: Vec<u8>,
}

impl Serialize for DecommitmentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DecommitmentWire {
            r: self.r.to_bytes(),
            one_time_signature: self.one_time_signature.to_bytes().to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DecommitmentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = DecommitmentWire::deserialize(deserializer)?;
        let r = Option::from(Scalar::from_bytes(&wire.r))
            .ok_or_else(|| serde::de::Error::custom("malformed commitment randomness"))?;
        let one_time_signature = OneTimeSignature::from_slice(&wire.one_time_signature)
            .map_err(|_| serde::de::Error::custom("malformed one-time signature"))?;
        Ok(Self {
            r,
            one_time_signature,
        })
    }
}
