//! Range proof binding an ECDSA secret key share to its public key share
//! and its Paillier encryption.
//!
//! The proof states that there exists an `η ∈ [-q^3, q^3]` such that
//! `g^η = y` and `D(w) = η`, where `y` is the published public key share,
//! `w` the Paillier encryption of the secret key share and `g` the curve
//! generator. Each party attaches one of these proofs to its key-generation
//! reveal message.
//!
//! A standard Fiat–Shamir transformation makes the proof non-interactive:
//! the challenge is derived from a transcript of every public input and
//! commitment value.

use crate::errors::Result;
use crate::paillier::Ciphertext;
use crate::utils::{
    discrete_exp, is_in_range, modpow, positive_challenge_from_transcript, random_bn_in_z_star,
    random_positive_bn, CurvePoint,
};
use crate::zkp::PublicParameters;
use libpaillier::unknown_order::BigNumber;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Public values the proof speaks about, known to prover and verifier.
pub(crate) struct KeyRangeInput<'a> {
    pub(crate) params: &'a PublicParameters,
    /// The public key share `y = g^η`.
    pub(crate) public_key_share: &'a CurvePoint,
    /// The encrypted secret key share `w = E(η)`.
    pub(crate) encrypted_secret_key_share: &'a Ciphertext,
}

/// The prover's secret knowledge.
pub(crate) struct KeyRangeSecret<'a> {
    /// The secret key share `η`.
    pub(crate) secret_key_share: &'a BigNumber,
    /// The nonce used to encrypt `η`. The proof only holds when this is the
    /// same nonce that produced `encrypted_secret_key_share`.
    pub(crate) paillier_nonce: &'a BigNumber,
}

/// Proof that a secret key share is the discrete log of a public key share
/// and the plaintext of a given ciphertext.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct KeyRangeProof {
    z: BigNumber,
    u1: CurvePoint,
    u2: BigNumber,
    u3: BigNumber,
    e: BigNumber,
    s1: BigNumber,
    s2: BigNumber,
    s3: BigNumber,
}

impl KeyRangeProof {
    pub(crate) fn prove<R: RngCore + CryptoRng>(
        input: &KeyRangeInput<'_>,
        secret: &KeyRangeSecret<'_>,
        rng: &mut R,
    ) -> Result<Self> {
        let params = input.params;
        let n_square = params.n_square();

        let alpha = random_positive_bn(rng, &params.q_cube());
        let beta = random_bn_in_z_star(rng, &params.n)?;
        let rho = random_positive_bn(rng, &params.q_n_tilde());
        let gamma = random_positive_bn(rng, &params.q_cube_n_tilde());

        // z = h1^η * h2^ρ mod Ñ
        let z = modpow(&params.h1, secret.secret_key_share, &params.n_tilde)
            .modmul(&modpow(&params.h2, &rho, &params.n_tilde), &params.n_tilde);
        // u1 = g^α in G
        let u1 = CurvePoint::GENERATOR.multiply_by_bignum(&alpha)?;
        // u2 = Γ^α * β^N mod N²
        let u2 = modpow(&params.g(), &alpha, &n_square)
            .modmul(&modpow(&beta, &params.n, &n_square), &n_square);
        // u3 = h1^α * h2^γ mod Ñ
        let u3 = modpow(&params.h1, &alpha, &params.n_tilde)
            .modmul(&modpow(&params.h2, &gamma, &params.n_tilde), &params.n_tilde);

        let mut transcript = Transcript::new(b"KeyRangeProof");
        Self::fill_transcript(&mut transcript, input, &z, &u1, &u2, &u3);
        let e = positive_challenge_from_transcript(&mut transcript, &params.q)?;

        // s1 = e*η + α
        let s1 = &e * secret.secret_key_share + &alpha;
        // s2 = r^e * β mod N
        let s2 = modpow(secret.paillier_nonce, &e, &params.n).modmul(&beta, &params.n);
        // s3 = e*ρ + γ
        let s3 = &e * &rho + &gamma;

        Ok(Self {
            z,
            u1,
            u2,
            u3,
            e,
            s1,
            s2,
            s3,
        })
    }

    /// Check the proof against the given public values. Returns `false` on
    /// any single mismatch.
    pub(crate) fn verify(&self, input: &KeyRangeInput<'_>) -> bool {
        self.verify_inner(input).unwrap_or(false)
    }

    fn verify_inner(&self, input: &KeyRangeInput<'_>) -> Result<bool> {
        let params = input.params;
        if !self.all_parameters_in_range(params) {
            return Ok(false);
        }

        let u1 = self.evaluate_u1_verification(input)?;
        let u2 = self.evaluate_u2_verification(input)?;
        let u3 = self.evaluate_u3_verification(params)?;

        let mut transcript = Transcript::new(b"KeyRangeProof");
        Self::fill_transcript(&mut transcript, input, &self.z, &u1, &u2, &u3);
        let e = positive_challenge_from_transcript(&mut transcript, &params.q)?;

        Ok(self.e == e && self.u1 == u1 && self.u2 == u2 && self.u3 == u3)
    }

    /// Reject proofs whose elements lie outside their declared groups
    /// before doing any algebra; out-of-range values could otherwise pass
    /// the equality checks by wraparound.
    fn all_parameters_in_range(&self, params: &PublicParameters) -> bool {
        let zero = BigNumber::zero();
        is_in_range(&self.z, &zero, &params.n_tilde)
            && is_in_range(&self.u2, &zero, &params.n_square())
            && is_in_range(&self.u3, &zero, &params.n_tilde)
            && is_in_range(&self.s2, &zero, &params.n)
    }

    /// u1 = g^s1 * y^-e. With s1 = e*η + α and y = g^η this collapses to
    /// g^α, which is exactly how u1 was built during proving.
    fn evaluate_u1_verification(&self, input: &KeyRangeInput<'_>) -> Result<CurvePoint> {
        let gs1 = CurvePoint::GENERATOR.multiply_by_bignum(&self.s1)?;
        let ye = input.public_key_share.multiply_by_bignum(&self.e)?;
        Ok(gs1 + -ye)
    }

    /// u2 = Γ^s1 * s2^N * w^-e mod N². The nonce contributions of `w` and
    /// `s2` cancel, leaving Γ^α * β^N.
    fn evaluate_u2_verification(&self, input: &KeyRangeInput<'_>) -> Result<BigNumber> {
        let params = input.params;
        let n_square = params.n_square();
        let gs1 = modpow(&params.g(), &self.s1, &n_square);
        let s2n = modpow(&self.s2, &params.n, &n_square);
        let we = discrete_exp(
            &input.encrypted_secret_key_share.0,
            &-self.e.clone(),
            &n_square,
        )?;
        Ok(gs1.modmul(&s2n, &n_square).modmul(&we, &n_square))
    }

    /// u3 = h1^s1 * h2^s3 * z^-e mod Ñ, which collapses to h1^α * h2^γ.
    fn evaluate_u3_verification(&self, params: &PublicParameters) -> Result<BigNumber> {
        let h1s1 = modpow(&params.h1, &self.s1, &params.n_tilde);
        let h2s3 = modpow(&params.h2, &self.s3, &params.n_tilde);
        let ze = discrete_exp(&self.z, &-self.e.clone(), &params.n_tilde)?;
        Ok(h1s1
            .modmul(&h2s3, &params.n_tilde)
            .modmul(&ze, &params.n_tilde))
    }

    fn fill_transcript(
        transcript: &mut Transcript,
        input: &KeyRangeInput<'_>,
        z: &BigNumber,
        u1: &CurvePoint,
        u2: &BigNumber,
        u3: &BigNumber,
    ) {
        transcript.append_message(b"y", &input.public_key_share.to_bytes());
        transcript.append_message(b"w", &input.encrypted_secret_key_share.0.to_bytes());
        transcript.append_message(b"z", &z.to_bytes());
        transcript.append_message(b"u1", &u1.to_bytes());
        transcript.append_message(b"u2", &u2.to_bytes());
        transcript.append_message(b"u3", &u3.to_bytes());
    }
}
