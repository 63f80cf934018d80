//! Six-round signing protocol.
//!
//! Given a [`ThresholdEcdsaKey`] and a 32-byte message digest, the group
//! produces a standard ECDSA signature without ever reconstructing the
//! private key:
//!
//! - rounds 1–2 establish `u = E(ρ)` and `v = E(ρ·x)` for a random shared
//!   secret key factor `ρ`,
//! - rounds 3–4 establish the signature factor `R = g^k` and the masked
//!   product `w = E(k·ρ + c·q)`,
//! - round 5 jointly decrypts `w`,
//! - round 6 assembles `E((m·ρ + r·ρ·x) / (k·ρ))` — the factor `ρ` cancels
//!   because `D(w) ≡ k·ρ (mod q)` — and jointly decrypts the signature.
//!
//! Every round consumes the previous round's state object and yields the
//! next one; state is never shared between rounds of different signing
//! attempts, and the per-attempt randomness `ρ_i`, `k_i`, `c_i` must never
//! be reused.

use crate::commitment::{DecommitmentKey, MultiTrapdoorCommitment};
use crate::errors::{Error, Result};
use crate::group::SignerId;
use crate::messages::{
    SignRound1Message, SignRound2Message, SignRound3Message, SignRound4Message, SignRound5Message,
    SignRound6Message,
};
use crate::paillier::Ciphertext;
use crate::signer::Signer;
use crate::utils::{random_bn_in_z_star, random_positive_bn, CurvePoint};
use crate::zkp::secret_key_factor::{
    SecretKeyFactorInput, SecretKeyFactorRangeProof, SecretKeyFactorSecret,
};
use crate::zkp::signature_factor::{
    SignatureFactorInput, SignatureFactorRangeProof, SignatureFactorSecret,
};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::error;

/// A final T-ECDSA signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// `R.x mod q`, the signature factor hash.
    pub r: BigNumber,
    /// The canonical (low-S) signature scalar.
    pub s: BigNumber,
    /// Chain-agnostic recovery id in `[0, 3]`.
    pub recovery_id: u8,
}

impl Signature {
    /// Encode the signature for storage or transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialize!(self)
    }

    /// Decode a signature previously encoded with [`Signature::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        deserialize!(bytes)
    }
}

/// State of a signer after the first round.
#[derive(Clone)]
pub struct Round1Signer {
    signer: Signer,
    /// `ρ_i`, this party's secret key factor share.
    secret_key_factor_share: BigNumber,
    /// `u_i = E(ρ_i)`.
    encrypted_secret_key_factor_share: Ciphertext,
    /// `v_i = E(ρ_i · x)`.
    secret_key_multiple_share: Ciphertext,
    decommitment_keys: BTreeMap<SignerId, DecommitmentKey>,
    paillier_nonce: BigNumber,
}

impl Debug for Round1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Round1Signer")
            .field("signer", &self.signer)
            .field("secret_key_factor_share", &"[redacted]")
            .field("paillier_nonce", &"[redacted]")
            .finish()
    }
}

impl Signer {
    /// First signing round: draw a secret key factor share `ρ_i`, encrypt
    /// it into `u_i = E(ρ_i)`, scale the shared encrypted key into
    /// `v_i = E(ρ_i·x)` and commit to both values, individually per peer.
    pub fn sign_round_one<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Round1Signer, Vec<SignRound1Message>)> {
        let master_key = self.commitment_master_key()?;

        let secret_key_factor_share =
            random_positive_bn(rng, &self.core.group_parameters.curve_order());
        let paillier_nonce = random_bn_in_z_star(rng, self.core.paillier_key.n())?;
        let encrypted_secret_key_factor_share = self
            .core
            .paillier_key
            .encrypt_with_nonce(&secret_key_factor_share, &paillier_nonce)?;
        let secret_key_multiple_share = self
            .core
            .paillier_key
            .mul(&self.key.encrypted_secret_key, &secret_key_factor_share);

        let factor_bytes = encrypted_secret_key_factor_share.0.to_bytes();
        let multiple_bytes = secret_key_multiple_share.0.to_bytes();

        let mut decommitment_keys = BTreeMap::new();
        let mut messages = Vec::with_capacity(self.core.signer_group.peer_signer_count());
        for peer_id in self.core.signer_group.peer_signer_ids(&self.core.id) {
            let (commitment, decommitment_key) = MultiTrapdoorCommitment::generate(
                &master_key,
                rng,
                &[&factor_bytes, &multiple_bytes],
            );
            decommitment_keys.insert(peer_id, decommitment_key);
            messages.push(SignRound1Message {
                sender_id: self.core.id,
                receiver_id: peer_id,
                secret_key_factor_share_commitment: commitment,
            });
        }

        let round1_signer = Round1Signer {
            signer: self.clone(),
            secret_key_factor_share,
            encrypted_secret_key_factor_share,
            secret_key_multiple_share,
            decommitment_keys,
            paillier_nonce,
        };
        Ok((round1_signer, messages))
    }
}

/// State of a signer after the second round.
#[derive(Clone, Debug)]
pub struct Round2Signer {
    round1: Round1Signer,
}

impl Round1Signer {
    /// Second signing round: reveal `u_i` and `v_i` together with the
    /// decommitment key for the first-round commitment and a range proof
    /// of their consistency.
    pub fn sign_round_two<R: RngCore + CryptoRng>(
        self,
        rng: &mut R,
    ) -> Result<(Round2Signer, Vec<SignRound2Message>)> {
        let input = SecretKeyFactorInput {
            params: &self.signer.core.zkp_parameters,
            secret_key_multiple: &self.secret_key_multiple_share,
            encrypted_secret_key: &self.signer.key.encrypted_secret_key,
            encrypted_factor: &self.encrypted_secret_key_factor_share,
        };
        let secret = SecretKeyFactorSecret {
            factor: &self.secret_key_factor_share,
            paillier_nonce: &self.paillier_nonce,
        };
        let secret_key_factor_proof = SecretKeyFactorRangeProof::prove(&input, &secret, rng)?;

        let messages = self
            .signer
            .core
            .signer_group
            .peer_signer_ids(&self.signer.core.id)
            .into_iter()
            .map(|peer_id| {
                let decommitment_key = self
                    .decommitment_keys
                    .get(&peer_id)
                    .ok_or(Error::InternalInvariantFailed)?
                    .clone();
                Ok(SignRound2Message {
                    sender_id: self.signer.core.id,
                    receiver_id: peer_id,
                    secret_key_factor_share: self.encrypted_secret_key_factor_share.clone(),
                    secret_key_multiple_share: self.secret_key_multiple_share.clone(),
                    secret_key_factor_share_decommitment_key: decommitment_key,
                    secret_key_factor_proof: secret_key_factor_proof.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((Round2Signer { round1: self }, messages))
    }
}

impl Round2Signer {
    /// Validate and combine the messages of the first two rounds into the
    /// combined secret key factor `u = E(ρ)` and secret key multiple
    /// `v = E(ρ·x)`, where `ρ = Σ ρ_i`.
    ///
    /// The returned values feed [`Round2Signer::sign_round_three`].
    pub fn combine_round_two_messages(
        &self,
        round1_messages: &[SignRound1Message],
        round2_messages: &[SignRound2Message],
    ) -> Result<(Ciphertext, Ciphertext)> {
        let core = &self.round1.signer.core;

        let round1_pairs: Vec<_> = round1_messages
            .iter()
            .map(|m| (m.sender_id, m.receiver_id))
            .collect();
        core.signer_group
            .expect_one_message_per_peer(&core.id, &round1_pairs, "round 1 messages")?;
        let round2_pairs: Vec<_> = round2_messages
            .iter()
            .map(|m| (m.sender_id, m.receiver_id))
            .collect();
        core.signer_group
            .expect_one_message_per_peer(&core.id, &round2_pairs, "round 2 messages")?;

        let mut factor_shares = Vec::with_capacity(round1_messages.len() + 1);
        let mut multiple_shares = Vec::with_capacity(round1_messages.len() + 1);
        for round1_message in round1_messages {
            let sender = round1_message.sender_id;
            let round2_message = round2_messages
                .iter()
                .find(|m| m.sender_id == sender)
                .ok_or(Error::MissingPeerMessage {
                    required: "round 2 message",
                    sender,
                })?;

            let opens = round1_message.secret_key_factor_share_commitment.verify(
                &round2_message.secret_key_factor_share_decommitment_key,
                &[
                    &round2_message.secret_key_factor_share.0.to_bytes(),
                    &round2_message.secret_key_multiple_share.0.to_bytes(),
                ],
            );
            if !opens {
                error!("secret key factor commitment from {sender} did not open");
                return Err(Error::InvalidCommitment { sender });
            }

            let input = SecretKeyFactorInput {
                params: &core.zkp_parameters,
                secret_key_multiple: &round2_message.secret_key_multiple_share,
                encrypted_secret_key: &self.round1.signer.key.encrypted_secret_key,
                encrypted_factor: &round2_message.secret_key_factor_share,
            };
            if !round2_message.secret_key_factor_proof.verify(&input) {
                error!("secret key factor range proof from {sender} failed to verify");
                return Err(Error::InvalidProof { sender });
            }

            factor_shares.push(&round2_message.secret_key_factor_share);
            multiple_shares.push(&round2_message.secret_key_multiple_share);
        }

        factor_shares.push(&self.round1.encrypted_secret_key_factor_share);
        multiple_shares.push(&self.round1.secret_key_multiple_share);

        let secret_key_factor = core.paillier_key.add(&factor_shares);
        let secret_key_multiple = core.paillier_key.add(&multiple_shares);
        Ok((secret_key_factor, secret_key_multiple))
    }

    /// Third signing round: draw the signature factor share `k_i` with its
    /// public counterpart `r_i = g^{k_i}`, mask it into
    /// `w_i = E(k_i·ρ + c_i·q)` and commit to `(r_i, w_i)` per peer.
    pub fn sign_round_three<R: RngCore + CryptoRng>(
        self,
        secret_key_factor: Ciphertext,
        secret_key_multiple: Ciphertext,
        rng: &mut R,
    ) -> Result<(Round3Signer, Vec<SignRound3Message>)> {
        let signer = self.round1.signer;
        let master_key = signer.commitment_master_key()?;
        let q = signer.core.group_parameters.curve_order();

        let signature_factor_secret_share = random_positive_bn(rng, &q);
        let signature_factor_public_share =
            CurvePoint::GENERATOR.multiply_by_bignum(&signature_factor_secret_share)?;

        // The mask is drawn from [0, q^6) rather than the symmetric
        // interval around zero: Paillier plaintexts live in [0, N), so a
        // negative mask would make the unmask value undecryptable.
        let signature_factor_mask_share =
            random_positive_bn(rng, &signer.core.zkp_parameters.q_six());

        let paillier_nonce = random_bn_in_z_star(rng, signer.core.paillier_key.n())?;
        let mask_share_mul_cardinality = signer.core.paillier_key.encrypt_with_nonce(
            &(&signature_factor_mask_share * &q),
            &paillier_nonce,
        )?;
        let signature_unmask_share = signer.core.paillier_key.add(&[
            &signer
                .core
                .paillier_key
                .mul(&secret_key_factor, &signature_factor_secret_share),
            &mask_share_mul_cardinality,
        ]);

        let public_share_bytes = signature_factor_public_share.to_bytes();
        let unmask_share_bytes = signature_unmask_share.0.to_bytes();

        let mut decommitment_keys = BTreeMap::new();
        let mut messages = Vec::with_capacity(signer.core.signer_group.peer_signer_count());
        for peer_id in signer.core.signer_group.peer_signer_ids(&signer.core.id) {
            let (commitment, decommitment_key) = MultiTrapdoorCommitment::generate(
                &master_key,
                rng,
                &[&public_share_bytes, &unmask_share_bytes],
            );
            decommitment_keys.insert(peer_id, decommitment_key);
            messages.push(SignRound3Message {
                sender_id: signer.core.id,
                receiver_id: peer_id,
                signature_factor_share_commitment: commitment,
            });
        }

        let round3_signer = Round3Signer {
            signer,
            secret_key_factor,
            secret_key_multiple,
            signature_factor_secret_share,
            signature_factor_public_share,
            signature_factor_mask_share,
            signature_unmask_share,
            decommitment_keys,
            paillier_nonce,
        };
        Ok((round3_signer, messages))
    }
}

/// State of a signer after the third round.
#[derive(Clone)]
pub struct Round3Signer {
    signer: Signer,
    /// `u = E(ρ)`.
    secret_key_factor: Ciphertext,
    /// `v = E(ρ·x)`.
    secret_key_multiple: Ciphertext,
    /// `k_i`.
    signature_factor_secret_share: BigNumber,
    /// `r_i = g^{k_i}`.
    signature_factor_public_share: CurvePoint,
    /// `c_i`.
    signature_factor_mask_share: BigNumber,
    /// `w_i = E(k_i·ρ + c_i·q)`.
    signature_unmask_share: Ciphertext,
    decommitment_keys: BTreeMap<SignerId, DecommitmentKey>,
    paillier_nonce: BigNumber,
}

impl Debug for Round3Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Round3Signer")
            .field("signer", &self.signer)
            .field("signature_factor_secret_share", &"[redacted]")
            .field("signature_factor_mask_share", &"[redacted]")
            .field("paillier_nonce", &"[redacted]")
            .finish()
    }
}

/// State of a signer after the fourth round.
#[derive(Clone, Debug)]
pub struct Round4Signer {
    round3: Round3Signer,
}

impl Round3Signer {
    /// Fourth signing round: reveal `r_i` and `w_i` together with the
    /// decommitment key for the third-round commitment and a range proof
    /// of their consistency.
    pub fn sign_round_four<R: RngCore + CryptoRng>(
        self,
        rng: &mut R,
    ) -> Result<(Round4Signer, Vec<SignRound4Message>)> {
        let input = SignatureFactorInput {
            params: &self.signer.core.zkp_parameters,
            signature_factor_public: &self.signature_factor_public_share,
            signature_unmask: &self.signature_unmask_share,
            secret_key_factor: &self.secret_key_factor,
        };
        let secret = SignatureFactorSecret {
            signature_factor_secret: &self.signature_factor_secret_share,
            signature_factor_mask: &self.signature_factor_mask_share,
            paillier_nonce: &self.paillier_nonce,
        };
        let signature_factor_proof = SignatureFactorRangeProof::prove(&input, &secret, rng)?;

        let messages = self
            .signer
            .core
            .signer_group
            .peer_signer_ids(&self.signer.core.id)
            .into_iter()
            .map(|peer_id| {
                let decommitment_key = self
                    .decommitment_keys
                    .get(&peer_id)
                    .ok_or(Error::InternalInvariantFailed)?
                    .clone();
                Ok(SignRound4Message {
                    sender_id: self.signer.core.id,
                    receiver_id: peer_id,
                    signature_factor_public_share: self.signature_factor_public_share,
                    signature_unmask_share: self.signature_unmask_share.clone(),
                    signature_factor_share_decommitment_key: decommitment_key,
                    signature_factor_proof: signature_factor_proof.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((Round4Signer { round3: self }, messages))
    }
}

impl Round4Signer {
    /// Validate and combine the messages of rounds three and four into the
    /// public signature factor `R = g^k` and the signature unmask
    /// `w = E(k·ρ + c·q)`, where `k = Σ k_i` and `c = Σ c_i`.
    ///
    /// The returned values feed [`Round4Signer::sign_round_five`].
    pub fn combine_round_four_messages(
        &self,
        round3_messages: &[SignRound3Message],
        round4_messages: &[SignRound4Message],
    ) -> Result<(Ciphertext, CurvePoint)> {
        let core = &self.round3.signer.core;

        let round3_pairs: Vec<_> = round3_messages
            .iter()
            .map(|m| (m.sender_id, m.receiver_id))
            .collect();
        core.signer_group
            .expect_one_message_per_peer(&core.id, &round3_pairs, "round 3 messages")?;
        let round4_pairs: Vec<_> = round4_messages
            .iter()
            .map(|m| (m.sender_id, m.receiver_id))
            .collect();
        core.signer_group
            .expect_one_message_per_peer(&core.id, &round4_pairs, "round 4 messages")?;

        let mut unmask_shares = Vec::with_capacity(round3_messages.len() + 1);
        let mut signature_factor_public = self.round3.signature_factor_public_share;
        for round3_message in round3_messages {
            let sender = round3_message.sender_id;
            let round4_message = round4_messages
                .iter()
                .find(|m| m.sender_id == sender)
                .ok_or(Error::MissingPeerMessage {
                    required: "round 4 message",
                    sender,
                })?;

            let opens = round3_message.signature_factor_share_commitment.verify(
                &round4_message.signature_factor_share_decommitment_key,
                &[
                    &round4_message.signature_factor_public_share.to_bytes(),
                    &round4_message.signature_unmask_share.0.to_bytes(),
                ],
            );
            if !opens {
                error!("signature factor commitment from {sender} did not open");
                return Err(Error::InvalidCommitment { sender });
            }

            let input = SignatureFactorInput {
                params: &core.zkp_parameters,
                signature_factor_public: &round4_message.signature_factor_public_share,
                signature_unmask: &round4_message.signature_unmask_share,
                secret_key_factor: &self.round3.secret_key_factor,
            };
            if !round4_message.signature_factor_proof.verify(&input) {
                error!("signature factor range proof from {sender} failed to verify");
                return Err(Error::InvalidProof { sender });
            }

            unmask_shares.push(&round4_message.signature_unmask_share);
            signature_factor_public =
                signature_factor_public + round4_message.signature_factor_public_share;
        }

        unmask_shares.push(&self.round3.signature_unmask_share);
        let signature_unmask = core.paillier_key.add(&unmask_shares);

        Ok((signature_unmask, signature_factor_public))
    }

    /// Fifth signing round: produce this party's partial decryption of the
    /// signature unmask `w` and evaluate the signature factor hash
    /// `r = R.x mod q`, a deterministic reduction that does not need to be
    /// collision resistant.
    pub fn sign_round_five(
        self,
        signature_unmask: Ciphertext,
        signature_factor_public: CurvePoint,
    ) -> (Round5Signer, SignRound5Message) {
        let core = &self.round3.signer.core;

        let signature_unmask_partial_decryption = core.paillier_key.decrypt(&signature_unmask);
        let signature_factor_public_hash =
            signature_factor_public.x_bn() % core.group_parameters.curve_order();

        let message = SignRound5Message {
            sender_id: core.id,
            signature_unmask_partial_decryption,
        };
        let round5_signer = Round5Signer {
            signer: self.round3.signer,
            secret_key_factor: self.round3.secret_key_factor,
            secret_key_multiple: self.round3.secret_key_multiple,
            signature_factor_public,
            signature_factor_public_hash,
        };
        (round5_signer, message)
    }
}

/// State of a signer after the fifth round.
#[derive(Clone, Debug)]
pub struct Round5Signer {
    signer: Signer,
    /// `u = E(ρ)`.
    secret_key_factor: Ciphertext,
    /// `v = E(ρ·x)`.
    secret_key_multiple: Ciphertext,
    /// `R = g^k`.
    signature_factor_public: CurvePoint,
    /// `r = R.x mod q`.
    signature_factor_public_hash: BigNumber,
}

impl Round5Signer {
    /// Combine all partial decryptions of the signature unmask into the
    /// plaintext `D(w) = k·ρ + c·q`.
    ///
    /// The value is deliberately not reduced modulo `q`; the `c·q` term is
    /// what lets round six cancel `ρ` exactly.
    pub fn combine_round_five_messages(
        &self,
        round5_messages: &[SignRound5Message],
    ) -> Result<BigNumber> {
        let core = &self.signer.core;
        let senders: Vec<_> = round5_messages.iter().map(|m| m.sender_id).collect();
        core.signer_group
            .expect_one_message_per_member(&senders, "round 5 messages")?;

        let partial_decryptions: Vec<_> = round5_messages
            .iter()
            .map(|m| m.signature_unmask_partial_decryption.clone())
            .collect();
        Ok(core
            .paillier_key
            .combine_partial_decryptions(&partial_decryptions)?)
    }

    /// Sixth signing round: evaluate the encrypted signature
    /// `E((m·ρ + r·ρ·x) · unmask⁻¹)` — `unmask ≡ k·ρ (mod q)`, so the
    /// factor `ρ` cancels — and produce this party's partial decryption of
    /// it.
    pub fn sign_round_six(
        &self,
        signature_unmask: &BigNumber,
        message_digest: &[u8],
    ) -> Result<SignRound6Message> {
        if message_digest.len() != 32 {
            return Err(Error::InvalidMessageDigest(message_digest.len()));
        }
        let core = &self.signer.core;
        let q = core.group_parameters.curve_order();

        let unmask_inverse = (signature_unmask % &q)
            .invert(&q)
            .ok_or(Error::InternalInvariantFailed)?;

        let signature_cipher = core.paillier_key.mul(
            &core.paillier_key.add(&[
                &core
                    .paillier_key
                    .mul(&self.secret_key_factor, &BigNumber::from_slice(message_digest)),
                &core
                    .paillier_key
                    .mul(&self.secret_key_multiple, &self.signature_factor_public_hash),
            ]),
            &unmask_inverse,
        );

        Ok(SignRound6Message {
            sender_id: core.id,
            signature_partial_decryption: core.paillier_key.decrypt(&signature_cipher),
        })
    }

    /// Combine all partial decryptions of the encrypted signature into the
    /// final [`Signature`], reduced modulo `q` and normalized to its
    /// canonical low-S form.
    pub fn combine_round_six_messages(
        &self,
        round6_messages: &[SignRound6Message],
    ) -> Result<Signature> {
        let core = &self.signer.core;
        let senders: Vec<_> = round6_messages.iter().map(|m| m.sender_id).collect();
        core.signer_group
            .expect_one_message_per_member(&senders, "round 6 messages")?;

        let partial_decryptions: Vec<_> = round6_messages
            .iter()
            .map(|m| m.signature_partial_decryption.clone())
            .collect();
        let raw = core
            .paillier_key
            .combine_partial_decryptions(&partial_decryptions)?;

        let q = core.group_parameters.curve_order();
        let mut s = raw % &q;

        // BTC and ETH require the S value to be at most the curve order
        // divided by two; flipping S also flips the recovered point's
        // y-parity.
        let flipped = s > core.group_parameters.half_curve_order();
        if flipped {
            s = &q - &s;
        }

        let mut recovery_id = u8::from(self.signature_factor_public.y_is_odd());
        if flipped {
            recovery_id ^= 1;
        }
        if self.signature_factor_public.x_bn() >= q {
            recovery_id += 2;
        }

        Ok(Signature {
            r: self.signature_factor_public_hash.clone(),
            s,
            recovery_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QuorumScope;
    use crate::tests::generate_signing_group;
    use crate::utils::testing::init_testing;

    #[test]
    fn combine_round_two_requires_full_quorum() {
        let mut rng = init_testing();
        let signers = generate_signing_group(&mut rng, 3, 2, 1024);

        let mut round1_states = Vec::new();
        let mut round1_messages = Vec::new();
        for signer in &signers {
            let (state, messages) = signer.sign_round_one(&mut rng).unwrap();
            round1_states.push(state);
            round1_messages.push(messages);
        }
        let mut round2_states = Vec::new();
        let mut round2_messages = Vec::new();
        for state in round1_states {
            let (state, messages) = state.sign_round_two(&mut rng).unwrap();
            round2_states.push(state);
            round2_messages.push(messages);
        }

        let me = signers[0].id();
        let r1: Vec<_> = round1_messages
            .iter()
            .flatten()
            .filter(|m| m.receiver_id() == me)
            .cloned()
            .collect();
        let r2: Vec<_> = round2_messages
            .iter()
            .flatten()
            .filter(|m| m.receiver_id() == me)
            .cloned()
            .collect();

        let err = round2_states[0]
            .combine_round_two_messages(&r1[..1], &r2)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "round 1 messages required from all group peer members; got 1, expected 2"
        );
        assert_eq!(
            err,
            Error::QuorumMismatch {
                required: "round 1 messages",
                scope: QuorumScope::Peers,
                expected: 2,
                actual: 1,
            }
        );

        let err = round2_states[0]
            .combine_round_two_messages(&r1, &r2[..1])
            .unwrap_err();
        assert!(matches!(err, Error::QuorumMismatch { .. }));

        // The happy path produces the same combined ciphertexts everywhere.
        let (u0, v0) = round2_states[0]
            .combine_round_two_messages(&r1, &r2)
            .unwrap();
        let r1_other: Vec<_> = round1_messages
            .iter()
            .flatten()
            .filter(|m| m.receiver_id() == signers[1].id())
            .cloned()
            .collect();
        let r2_other: Vec<_> = round2_messages
            .iter()
            .flatten()
            .filter(|m| m.receiver_id() == signers[1].id())
            .cloned()
            .collect();
        let (u1, v1) = round2_states[1]
            .combine_round_two_messages(&r1_other, &r2_other)
            .unwrap();
        assert_eq!(u0, u1);
        assert_eq!(v0, v1);
    }

    #[test]
    fn combine_round_two_rejects_swapped_commitment() {
        let mut rng = init_testing();
        let signers = generate_signing_group(&mut rng, 3, 2, 1024);

        let mut round1_states = Vec::new();
        let mut round1_messages = Vec::new();
        for signer in &signers {
            let (state, messages) = signer.sign_round_one(&mut rng).unwrap();
            round1_states.push(state);
            round1_messages.push(messages);
        }
        let mut round2_states = Vec::new();
        let mut round2_messages = Vec::new();
        for state in round1_states {
            let (state, messages) = state.sign_round_two(&mut rng).unwrap();
            round2_states.push(state);
            round2_messages.push(messages);
        }

        let me = signers[0].id();
        let mut r1: Vec<_> = round1_messages
            .iter()
            .flatten()
            .filter(|m| m.receiver_id() == me)
            .cloned()
            .collect();
        let r2: Vec<_> = round2_messages
            .iter()
            .flatten()
            .filter(|m| m.receiver_id() == me)
            .cloned()
            .collect();

        let master_key = signers[0].commitment_master_key.unwrap();
        let (unrelated, _) =
            MultiTrapdoorCommitment::generate(&master_key, &mut rng, &[b"unrelated"]);
        let victim = r1.last_mut().unwrap();
        let sender = victim.sender_id();
        victim.secret_key_factor_share_commitment = unrelated;

        let err = round2_states[0]
            .combine_round_two_messages(&r1, &r2)
            .unwrap_err();
        assert_eq!(err, Error::InvalidCommitment { sender });
    }

    #[test]
    fn round_six_rejects_malformed_digest() {
        let mut rng = init_testing();
        let signers = generate_signing_group(&mut rng, 3, 2, 1024);
        let signer = signers[0].clone();

        let placeholder_cipher = signer
            .core
            .paillier_key
            .encrypt(&BigNumber::from(7), &mut rng)
            .unwrap();
        let round5_signer = Round5Signer {
            signer,
            secret_key_factor: placeholder_cipher.clone(),
            secret_key_multiple: placeholder_cipher,
            signature_factor_public: CurvePoint::GENERATOR,
            signature_factor_public_hash: BigNumber::one(),
        };

        let err = round5_signer
            .sign_round_six(&BigNumber::from(12345), &[0u8; 31])
            .unwrap_err();
        assert_eq!(err, Error::InvalidMessageDigest(31));
    }
}
