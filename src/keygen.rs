//! Two-round distributed key generation.
//!
//! Each party draws an ECDSA key share, commits to its public half in the
//! first round and reveals it in the second round together with a Paillier
//! encryption of the secret half and a range proof binding them. Combining
//! all reveals yields the same [`ThresholdEcdsaKey`] at every honest party:
//!
//! ```text
//! E(secretKey) = E(share_1) + E(share_2) + ... + E(share_n)
//! publicKey    = publicShare_1 + publicShare_2 + ... + publicShare_n
//! ```
//!
//! The private key exists only inside the homomorphic sum; no party ever
//! sees another party's share in the clear.

use crate::commitment::{DecommitmentKey, MultiTrapdoorCommitment};
use crate::errors::{Error, Result};
use crate::group::SignerId;
use crate::key::{EcdsaKeyShare, ThresholdEcdsaKey};
use crate::messages::{KeyShareRevealMessage, PublicKeyShareCommitmentMessage};
use crate::paillier::Ciphertext;
use crate::signer::LocalSigner;
use crate::utils::{random_bn_in_z_star, random_positive_bn, CurvePoint};
use crate::zkp::key_range::{KeyRangeInput, KeyRangeProof, KeyRangeSecret};
use rand::{CryptoRng, RngCore};
use std::collections::BTreeMap;
use tracing::error;

/// Intermediate state a party holds between the two key-generation rounds.
#[derive(Clone, Debug)]
pub(crate) struct KeygenState {
    pub(crate) key_share: EcdsaKeyShare,
    pub(crate) decommitment_keys: BTreeMap<SignerId, DecommitmentKey>,
    pub(crate) encrypted_share: Option<Ciphertext>,
}

impl LocalSigner {
    /// First key-generation round: draw an ECDSA key share and produce one
    /// commitment message per peer, each committing to the public key
    /// share.
    pub fn initialize_key_shares<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<PublicKeyShareCommitmentMessage>> {
        let master_key = self
            .commitment_master_key
            .ok_or(Error::MissingMasterPublicKey)?;

        let secret_key_share =
            random_positive_bn(rng, &self.core.group_parameters.curve_order());
        let public_key_share = CurvePoint::GENERATOR.multiply_by_bignum(&secret_key_share)?;
        let share_bytes = public_key_share.to_bytes();

        let mut decommitment_keys = BTreeMap::new();
        let mut messages = Vec::with_capacity(self.core.signer_group.peer_signer_count());
        for peer_id in self.core.signer_group.peer_signer_ids(&self.core.id) {
            let (commitment, decommitment_key) =
                MultiTrapdoorCommitment::generate(&master_key, rng, &[&share_bytes]);
            decommitment_keys.insert(peer_id, decommitment_key);
            messages.push(PublicKeyShareCommitmentMessage {
                sender_id: self.core.id,
                receiver_id: peer_id,
                public_key_share_commitment: commitment,
            });
        }

        self.keygen_state = Some(KeygenState {
            key_share: EcdsaKeyShare {
                secret_key_share,
                public_key_share,
            },
            decommitment_keys,
            encrypted_share: None,
        });
        Ok(messages)
    }

    /// Second key-generation round: encrypt the secret key share with the
    /// threshold Paillier key and reveal the public key share, the
    /// decommitment key for the first-round commitment and a range proof
    /// binding all of them.
    pub fn reveal_key_shares<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<KeyShareRevealMessage>> {
        let state = self
            .keygen_state
            .as_mut()
            .ok_or(Error::InternalInvariantFailed)?;

        let paillier_nonce = random_bn_in_z_star(rng, self.core.paillier_key.n())?;
        let encrypted_secret_key_share = self
            .core
            .paillier_key
            .encrypt_with_nonce(&state.key_share.secret_key_share, &paillier_nonce)?;

        let input = KeyRangeInput {
            params: &self.core.zkp_parameters,
            public_key_share: &state.key_share.public_key_share,
            encrypted_secret_key_share: &encrypted_secret_key_share,
        };
        let secret = KeyRangeSecret {
            secret_key_share: &state.key_share.secret_key_share,
            paillier_nonce: &paillier_nonce,
        };
        let secret_key_proof = KeyRangeProof::prove(&input, &secret, rng)?;

        state.encrypted_share = Some(encrypted_secret_key_share.clone());

        self.core
            .signer_group
            .peer_signer_ids(&self.core.id)
            .into_iter()
            .map(|peer_id| {
                let decommitment_key = state
                    .decommitment_keys
                    .get(&peer_id)
                    .ok_or(Error::InternalInvariantFailed)?
                    .clone();
                Ok(KeyShareRevealMessage {
                    sender_id: self.core.id,
                    receiver_id: peer_id,
                    encrypted_secret_key_share: encrypted_secret_key_share.clone(),
                    public_key_share: state.key_share.public_key_share,
                    public_key_share_decommitment_key: decommitment_key,
                    secret_key_proof: secret_key_proof.clone(),
                })
            })
            .collect()
    }

    /// Combine all peers' commitments and reveals into the group's
    /// [`ThresholdEcdsaKey`].
    ///
    /// Every commitment must have a matching reveal from the same sender;
    /// each revealed public key share must open its commitment and each
    /// range proof must verify. Any failure aborts the key generation,
    /// naming the offending sender.
    pub fn combine_key_shares(
        &self,
        share_commitments: &[PublicKeyShareCommitmentMessage],
        revealed_shares: &[KeyShareRevealMessage],
    ) -> Result<ThresholdEcdsaKey> {
        let state = self
            .keygen_state
            .as_ref()
            .ok_or(Error::InternalInvariantFailed)?;
        let own_encrypted_share = state
            .encrypted_share
            .as_ref()
            .ok_or(Error::InternalInvariantFailed)?;

        let commitment_pairs: Vec<_> = share_commitments
            .iter()
            .map(|m| (m.sender_id, m.receiver_id))
            .collect();
        self.core.signer_group.expect_one_message_per_peer(
            &self.core.id,
            &commitment_pairs,
            "commitments",
        )?;
        let reveal_pairs: Vec<_> = revealed_shares
            .iter()
            .map(|m| (m.sender_id, m.receiver_id))
            .collect();
        self.core.signer_group.expect_one_message_per_peer(
            &self.core.id,
            &reveal_pairs,
            "key share reveal messages",
        )?;

        let mut encrypted_shares = Vec::with_capacity(revealed_shares.len());
        let mut public_key = state.key_share.public_key_share;
        for commitment_message in share_commitments {
            let sender = commitment_message.sender_id;
            let reveal = revealed_shares
                .iter()
                .find(|m| m.sender_id == sender)
                .ok_or(Error::MissingPeerMessage {
                    required: "key share reveal message",
                    sender,
                })?;

            let opens = commitment_message.public_key_share_commitment.verify(
                &reveal.public_key_share_decommitment_key,
                &[&reveal.public_key_share.to_bytes()],
            );
            if !opens {
                error!("key share commitment from {sender} did not open");
                return Err(Error::InvalidCommitment { sender });
            }

            let input = KeyRangeInput {
                params: &self.core.zkp_parameters,
                public_key_share: &reveal.public_key_share,
                encrypted_secret_key_share: &reveal.encrypted_secret_key_share,
            };
            if !reveal.secret_key_proof.verify(&input) {
                error!("key share range proof from {sender} failed to verify");
                return Err(Error::InvalidProof { sender });
            }

            encrypted_shares.push(&reveal.encrypted_secret_key_share);
            public_key = public_key + reveal.public_key_share;
        }

        encrypted_shares.push(own_encrypted_share);
        let encrypted_secret_key = self.core.paillier_key.add(&encrypted_shares);

        Ok(ThresholdEcdsaKey {
            encrypted_secret_key,
            public_key,
            curve: self.core.group_parameters.curve,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QuorumScope;
    use crate::tests::generate_local_group;
    use crate::utils::testing::init_testing;
    use libpaillier::unknown_order::BigNumber;
    use rand::rngs::StdRng;

    struct KeygenRun {
        signers: Vec<LocalSigner>,
        commitments: Vec<Vec<PublicKeyShareCommitmentMessage>>,
        reveals: Vec<Vec<KeyShareRevealMessage>>,
    }

    fn run_keygen_rounds(rng: &mut StdRng, group_size: usize, threshold: usize) -> KeygenRun {
        let mut signers = generate_local_group(rng, group_size, threshold, 1024);

        let share_messages: Vec<_> = signers
            .iter()
            .map(|s| s.generate_master_public_key_share(rng))
            .collect();
        let master_key = signers[0]
            .combine_master_public_key_shares(&share_messages)
            .unwrap();
        for signer in signers.iter_mut() {
            signer.set_commitment_master_public_key(master_key);
        }

        let commitments: Vec<_> = signers
            .iter_mut()
            .map(|s| s.initialize_key_shares(rng).unwrap())
            .collect();
        let reveals: Vec<_> = signers
            .iter_mut()
            .map(|s| s.reveal_key_shares(rng).unwrap())
            .collect();

        KeygenRun {
            signers,
            commitments,
            reveals,
        }
    }

    /// All messages addressed to the signer with identifier `id`.
    fn addressed_to<M: Clone>(
        all: &[Vec<M>],
        receiver: impl Fn(&M) -> SignerId,
        id: SignerId,
    ) -> Vec<M> {
        all.iter()
            .flatten()
            .filter(|m| receiver(m) == id)
            .cloned()
            .collect()
    }

    #[test]
    fn all_parties_combine_to_the_same_key() {
        let mut rng = init_testing();
        let run = run_keygen_rounds(&mut rng, 3, 2);

        let mut keys = Vec::new();
        for (i, signer) in run.signers.iter().enumerate() {
            let commitments =
                addressed_to(&run.commitments, |m| m.receiver_id(), signer.id());
            let reveals = addressed_to(&run.reveals, |m| m.receiver_id(), signer.id());
            keys.push(signer.combine_key_shares(&commitments, &reveals).unwrap());
        }

        for key in &keys[1..] {
            assert_eq!(keys[0].public_key, key.public_key);
            assert_eq!(keys[0].encrypted_secret_key, key.encrypted_secret_key);
        }

        // The combined encrypted key decrypts (threshold-wise, just for the
        // test) to the discrete log of the combined public key.
        let key = &keys[0];
        let signers = &run.signers;
        let shares: Vec<_> = signers
            .iter()
            .map(|s| s.core.paillier_key.decrypt(&key.encrypted_secret_key))
            .collect();
        let secret = signers[0]
            .core
            .paillier_key
            .combine_partial_decryptions(&shares)
            .unwrap();
        // Shares are drawn from Z_q, so the sum can exceed the curve order.
        let secret = secret % signers[0].core.group_parameters.curve_order();
        let expected = CurvePoint::GENERATOR.multiply_by_bignum(&secret).unwrap();
        assert_eq!(expected, key.public_key);
    }

    #[test]
    fn combine_with_not_enough_commitments() {
        let mut rng = init_testing();
        let run = run_keygen_rounds(&mut rng, 4, 2);
        let me = run.signers[0].id();

        let commitments = addressed_to(&run.commitments, |m| m.receiver_id(), me);
        let reveals = addressed_to(&run.reveals, |m| m.receiver_id(), me);

        let err = run.signers[0]
            .combine_key_shares(&commitments[..1], &reveals)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "commitments required from all group peer members; got 1, expected 3"
        );
        assert_eq!(
            err,
            Error::QuorumMismatch {
                required: "commitments",
                scope: QuorumScope::Peers,
                expected: 3,
                actual: 1,
            }
        );
    }

    #[test]
    fn combine_with_not_enough_reveals() {
        let mut rng = init_testing();
        let run = run_keygen_rounds(&mut rng, 4, 2);
        let me = run.signers[0].id();

        let commitments = addressed_to(&run.commitments, |m| m.receiver_id(), me);
        let reveals = addressed_to(&run.reveals, |m| m.receiver_id(), me);

        let err = run.signers[0]
            .combine_key_shares(&commitments, &reveals[..1])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "key share reveal messages required from all group peer members; got 1, expected 3"
        );
    }

    #[test]
    fn combine_with_invalid_commitment() {
        let mut rng = init_testing();
        let run = run_keygen_rounds(&mut rng, 3, 2);
        let me = run.signers[0].id();

        let mut commitments = addressed_to(&run.commitments, |m| m.receiver_id(), me);
        let reveals = addressed_to(&run.reveals, |m| m.receiver_id(), me);

        // Swap one commitment for a commitment to an unrelated value.
        let master_key = run.signers[0].commitment_master_key.unwrap();
        let (unrelated, _) =
            MultiTrapdoorCommitment::generate(&master_key, &mut rng, &[b"unrelated"]);
        let victim = commitments.last_mut().unwrap();
        let sender = victim.sender_id();
        victim.public_key_share_commitment = unrelated;

        let err = run.signers[0]
            .combine_key_shares(&commitments, &reveals)
            .unwrap_err();
        assert_eq!(err, Error::InvalidCommitment { sender });
    }

    #[test]
    fn combine_with_invalid_proof() {
        let mut rng = init_testing();
        let run = run_keygen_rounds(&mut rng, 3, 2);
        let me = run.signers[0].id();

        let commitments = addressed_to(&run.commitments, |m| m.receiver_id(), me);
        let mut reveals = addressed_to(&run.reveals, |m| m.receiver_id(), me);

        // Rebuild one reveal's proof over values unrelated to the reveal.
        let signer = &run.signers[0];
        let bogus_share = BigNumber::one();
        let bogus_point = CurvePoint::GENERATOR;
        let bogus_nonce = BigNumber::one();
        let bogus_cipher = signer
            .core
            .paillier_key
            .encrypt_with_nonce(&BigNumber::from(3), &bogus_nonce)
            .unwrap();
        let input = KeyRangeInput {
            params: &signer.core.zkp_parameters,
            public_key_share: &bogus_point,
            encrypted_secret_key_share: &bogus_cipher,
        };
        let secret = KeyRangeSecret {
            secret_key_share: &bogus_share,
            paillier_nonce: &bogus_nonce,
        };
        let bogus_proof = KeyRangeProof::prove(&input, &secret, &mut rng).unwrap();

        let victim = reveals.last_mut().unwrap();
        let sender = victim.sender_id();
        victim.secret_key_proof = bogus_proof;

        let err = run.signers[0]
            .combine_key_shares(&commitments, &reveals)
            .unwrap_err();
        assert_eq!(err, Error::InvalidProof { sender });
    }

    #[test]
    fn master_key_is_required_before_round_one() {
        let mut rng = init_testing();
        let mut signers = generate_local_group(&mut rng, 3, 2, 1024);
        let err = signers[0].initialize_key_shares(&mut rng).unwrap_err();
        assert_eq!(err, Error::MissingMasterPublicKey);
    }

    #[test]
    fn master_key_combine_requires_all_shares() {
        let mut rng = init_testing();
        let signers = generate_local_group(&mut rng, 3, 2, 1024);
        let shares: Vec<_> = signers
            .iter()
            .take(2)
            .map(|s| s.generate_master_public_key_share(&mut rng))
            .collect();
        let err = signers[0]
            .combine_master_public_key_shares(&shares)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "master public key shares required from all group members; got 2, expected 3"
        );
    }
}
