//! Range proof for the signature factor revealed in round four of signing.
//!
//! The proof states that there exist `η1 ∈ [-q^3, q^3]` and
//! `η2 ∈ [-q^8, q^8]` such that `g^η1 = r` and
//! `D(w) = η1·D(u) + q·η2`, where `r = g^k` is the revealed signature
//! factor public share, `u = E(ρ)` the combined secret key factor and
//! `w = E(k·ρ + c·q)` the signature unmask share. In round-three terms,
//! `η1 = k_i` and `η2 = c_i`: the way `w` is constructed lets the fifth
//! and sixth rounds cancel the factor `ρ` and use `k` as the ECDSA
//! signature's random factor.

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

/// Public values the proof speaks about.
pub(crate) struct SignatureFactorInput<'a> {
    pub(crate) params: &'a PublicParameters,
    /// `r_i = g^{k_i}`, the signature factor public share.
    pub(crate) signature_factor_public: &'a CurvePoint,
    /// `w_i = E(k_i·ρ + c_i·q)`, the signature unmask share.
    pub(crate) signature_unmask: &'a Ciphertext,
    /// `u = E(ρ)`, the combined secret key factor.
    pub(crate) secret_key_factor: &'a Ciphertext,
}

/// The prover's secret knowledge.
pub(crate) struct SignatureFactorSecret<'a> {
    /// `k_i`, the signature factor secret share.
    pub(crate) signature_factor_secret: &'a BigNumber,
    /// `c_i`, the signature factor mask share.
    pub(crate) signature_factor_mask: &'a BigNumber,
    /// The nonce used when encrypting `c_i·q` into the unmask share.
    pub(crate) paillier_nonce: &'a BigNumber,
}

/// Proof that a revealed curve point is `g^k` for a committed `k`, and that
/// the unmasking ciphertext decrypts to `k·ρ + c·q` for the same `k` and a
/// bounded mask `c`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignatureFactorRangeProof {
    z1: BigNumber,
    z2: BigNumber,
    u1: CurvePoint,
    u2: BigNumber,
    u3: BigNumber,
    v1: BigNumber,
    v2: BigNumber,
    v3: BigNumber,
    e: BigNumber,
    s1: BigNumber,
    s2: BigNumber,
    t1: BigNumber,
    t2: BigNumber,
    t3: BigNumber,
}

impl SignatureFactorRangeProof {
    pub(crate) fn prove<R: RngCore + CryptoRng>(
        input: &SignatureFactorInput<'_>,
        secret: &SignatureFactorSecret<'_>,
        rng: &mut R,
    ) -> Result<Self> {
        let params = input.params;
        let n_square = params.n_square();

        let alpha = random_positive_bn(rng, &params.q_cube());
        let beta = random_bn_in_z_star(rng, &params.n)?;
        let gamma = random_positive_bn(rng, &params.q_cube_n_tilde());
        let delta = random_positive_bn(rng, &params.q_cube());
        let mu = random_bn_in_z_star(rng, &params.n)?;
        let nu = random_positive_bn(rng, &params.q_cube_n_tilde());
        let theta = random_positive_bn(rng, &params.q_eight());
        let tau = random_positive_bn(rng, &params.q_eight_n_tilde());
        let rho1 = random_positive_bn(rng, &params.q_n_tilde());
        let rho2 = random_positive_bn(rng, &params.q_six_n_tilde());

        // z1 = h1^η1 * h2^ρ1 mod Ñ
        let z1 = modpow(&params.h1, secret.signature_factor_secret, &params.n_tilde)
            .modmul(&modpow(&params.h2, &rho1, &params.n_tilde), &params.n_tilde);
        // z2 = h1^η2 * h2^ρ2 mod Ñ
        let z2 = modpow(&params.h1, secret.signature_factor_mask, &params.n_tilde)
            .modmul(&modpow(&params.h2, &rho2, &params.n_tilde), &params.n_tilde);
        // u1 = g^α in G
        let u1 = CurvePoint::GENERATOR.multiply_by_bignum(&alpha)?;
        // u2 = Γ^α * β^N mod N²
        let u2 = modpow(&params.g(), &alpha, &n_square)
            .modmul(&modpow(&beta, &params.n, &n_square), &n_square);
        // u3 = h1^α * h2^γ mod Ñ
        let u3 = modpow(&params.h1, &alpha, &params.n_tilde)
            .modmul(&modpow(&params.h2, &gamma, &params.n_tilde), &params.n_tilde);
        // v1 = u^α * Γ^(q·θ) * μ^N mod N²
        let v1 = modpow(&input.secret_key_factor.0, &alpha, &n_square)
            .modmul(
                &modpow(&params.g(), &(&params.q * &theta), &n_square),
                &n_square,
            )
            .modmul(&modpow(&mu, &params.n, &n_square), &n_square);
        // v2 = h1^δ * h2^ν mod Ñ
        let v2 = modpow(&params.h1, &delta, &params.n_tilde)
            .modmul(&modpow(&params.h2, &nu, &params.n_tilde), &params.n_tilde);
        // v3 = h1^θ * h2^τ mod Ñ
        let v3 = modpow(&params.h1, &theta, &params.n_tilde)
            .modmul(&modpow(&params.h2, &tau, &params.n_tilde), &params.n_tilde);

        let mut transcript = Transcript::new(b"SignatureFactorRangeProof");
        Self::fill_transcript(
            &mut transcript,
            input,
            &z1,
            &z2,
            &u1,
            &u2,
            &u3,
            &v1,
            &v2,
            &v3,
        );
        let e = positive_challenge_from_transcript(&mut transcript, &params.q)?;

        // s1 = e·η1 + α
        let s1 = &e * secret.signature_factor_secret + &alpha;
        // s2 = e·ρ1 + γ
        let s2 = &e * &rho1 + &gamma;
        // t1 = rc^e * μ mod N
        let t1 = modpow(secret.paillier_nonce, &e, &params.n).modmul(&mu, &params.n);
        // t2 = e·η2 + θ
        let t2 = &e * secret.signature_factor_mask + &theta;
        // t3 = e·ρ2 + τ
        let t3 = &e * &rho2 + &tau;

        Ok(Self {
            z1,
            z2,
            u1,
            u2,
            u3,
            v1,
            v2,
            v3,
            e,
            s1,
            s2,
            t1,
            t2,
            t3,
        })
    }

    /// Check the proof against the revealed signature factor, unmask share
    /// and combined secret key factor. Returns `false` on any single
    /// mismatch.
    pub(crate) fn verify(&self, input: &SignatureFactorInput<'_>) -> bool {
        self.verify_inner(input).unwrap_or(false)
    }

    fn verify_inner(&self, input: &SignatureFactorInput<'_>) -> Result<bool> {
        let params = input.params;
        if !self.all_parameters_in_range(params) {
            return Ok(false);
        }

        let u1 = self.evaluate_u1_verification(input)?;
        let u3 = self.evaluate_u3_verification(params)?;
        let v1 = self.evaluate_v1_verification(input)?;
        let v3 = self.evaluate_v3_verification(params)?;

        let mut transcript = Transcript::new(b"SignatureFactorRangeProof");
        Self::fill_transcript(
            &mut transcript,
            input,
            &self.z1,
            &self.z2,
            &u1,
            &self.u2,
            &u3,
            &v1,
            &self.v2,
            &v3,
        );
        let e = positive_challenge_from_transcript(&mut transcript, &params.q)?;

        Ok(self.u1 == u1 && self.u3 == u3 && self.v1 == v1 && self.v3 == v3 && self.e == e)
    }

    fn all_parameters_in_range(&self, params: &PublicParameters) -> bool {
        let zero = BigNumber::zero();
        is_in_range(&self.z1, &zero, &params.n_tilde)
            && is_in_range(&self.z2, &zero, &params.n_tilde)
            && is_in_range(&self.u2, &zero, &params.n_square())
            && is_in_range(&self.u3, &zero, &params.n_tilde)
            && is_in_range(&self.v1, &zero, &params.n_square())
            && is_in_range(&self.v2, &zero, &params.n_tilde)
            && is_in_range(&self.v3, &zero, &params.n_tilde)
            && is_in_range(&self.t1, &zero, &params.n)
    }

    /// u1 = g^s1 * r^-e. With s1 = e·η1 + α and r = g^η1 this collapses to
    /// g^α.
    fn evaluate_u1_verification(&self, input: &SignatureFactorInput<'_>) -> Result<CurvePoint> {
        let gs1 = CurvePoint::GENERATOR.multiply_by_bignum(&self.s1)?;
        let re = input.signature_factor_public.multiply_by_bignum(&self.e)?;
        Ok(gs1 + -re)
    }

    /// u3 = h1^s1 * h2^s2 * z1^-e mod Ñ, which collapses to h1^α * h2^γ.
    fn evaluate_u3_verification(&self, params: &PublicParameters) -> Result<BigNumber> {
        let h1s1 = modpow(&params.h1, &self.s1, &params.n_tilde);
        let h2s2 = modpow(&params.h2, &self.s2, &params.n_tilde);
        let z1e = discrete_exp(&self.z1, &-self.e.clone(), &params.n_tilde)?;
        Ok(h1s1
            .modmul(&h2s2, &params.n_tilde)
            .modmul(&z1e, &params.n_tilde))
    }

    /// v1 = u^s1 * Γ^(q·t2) * t1^N * w^-e mod N². With
    /// w = u^η1 * Γ^(q·η2) * rc^N the nonce and secret contributions cancel,
    /// leaving u^α * Γ^(q·θ) * μ^N.
    fn evaluate_v1_verification(&self, input: &SignatureFactorInput<'_>) -> Result<BigNumber> {
        let params = input.params;
        let n_square = params.n_square();
        let us1 = modpow(&input.secret_key_factor.0, &self.s1, &n_square);
        let gqt2 = modpow(&params.g(), &(&params.q * &self.t2), &n_square);
        let t1n = modpow(&self.t1, &params.n, &n_square);
        let we = discrete_exp(&input.signature_unmask.0, &-self.e.clone(), &n_square)?;
        Ok(us1
            .modmul(&gqt2, &n_square)
            .modmul(&t1n, &n_square)
            .modmul(&we, &n_square))
    }

    /// v3 = h1^t2 * h2^t3 * z2^-e mod Ñ, which collapses to h1^θ * h2^τ.
    fn evaluate_v3_verification(&self, params: &PublicParameters) -> Result<BigNumber> {
        let h1t2 = modpow(&params.h1, &self.t2, &params.n_tilde);
        let h2t3 = modpow(&params.h2, &self.t3, &params.n_tilde);
        let z2e = discrete_exp(&self.z2, &-self.e.clone(), &params.n_tilde)?;
        Ok(h1t2
            .modmul(&h2t3, &params.n_tilde)
            .modmul(&z2e, &params.n_tilde))
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_transcript(
        transcript: &mut Transcript,
        input: &SignatureFactorInput<'_>,
        z1: &BigNumber,
        z2: &BigNumber,
        u1: &CurvePoint,
        u2: &BigNumber,
        u3: &BigNumber,
        v1: &BigNumber,
        v2: &BigNumber,
        v3: &BigNumber,
    ) {
        transcript.append_message(b"w", &input.signature_unmask.0.to_bytes());
        transcript.append_message(b"u", &input.secret_key_factor.0.to_bytes());
        transcript.append_message(b"z1", &z1.to_bytes());
        transcript.append_message(b"z2", &z2.to_bytes());
        transcript.append_message(b"u1", &u1.to_bytes());
        transcript.append_message(b"u2", &u2.to_bytes());
        transcript.append_message(b"u3", &u3.to_bytes());
        transcript.append_message(b"v1", &v1.to_bytes());
        transcript.append_message(b"v2", &v2.to_bytes());
        transcript.append_message(b"v3", &v3.to_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::{ThresholdKeyGenerator, ThresholdPrivateKey};
    use crate::safe_primes::{test_safe_primes_1024, test_safe_primes_512};
    use crate::utils::{k256_order, testing::init_testing};
    use rand::rngs::StdRng;

    struct Fixture {
        params: PublicParameters,
        signature_factor_secret: BigNumber,
        signature_factor_mask: BigNumber,
        nonce: BigNumber,
        signature_factor_public: CurvePoint,
        signature_unmask: Ciphertext,
        secret_key_factor: Ciphertext,
    }

    fn fixture(rng: &mut StdRng) -> (ThresholdPrivateKey, Fixture) {
        let primes = test_safe_primes_1024();
        let paillier_key = ThresholdKeyGenerator::new(2048, 3, 2)
            .unwrap()
            .generate_from_safe_primes(&primes[0], &primes[1], rng)
            .unwrap()
            .remove(0);
        let zkp_primes = test_safe_primes_512();
        let params = PublicParameters::generate_from_safe_primes(
            paillier_key.n(),
            &zkp_primes[0],
            &zkp_primes[1],
            k256_order(),
            rng,
        )
        .unwrap();

        let q = k256_order();
        let secret_key_factor_plain = random_positive_bn(rng, &q);
        let secret_key_factor = paillier_key.encrypt(&secret_key_factor_plain, rng).unwrap();

        let signature_factor_secret = random_positive_bn(rng, &q);
        let signature_factor_public = CurvePoint::GENERATOR
            .multiply_by_bignum(&signature_factor_secret)
            .unwrap();
        let signature_factor_mask = random_positive_bn(rng, &params.q_six());
        let nonce = random_bn_in_z_star(rng, paillier_key.n()).unwrap();
        let masked = paillier_key
            .encrypt_with_nonce(&(&signature_factor_mask * &q), &nonce)
            .unwrap();
        let signature_unmask = paillier_key.add(&[
            &paillier_key.mul(&secret_key_factor, &signature_factor_secret),
            &masked,
        ]);

        (
            paillier_key,
            Fixture {
                params,
                signature_factor_secret,
                signature_factor_mask,
                nonce,
                signature_factor_public,
                signature_unmask,
                secret_key_factor,
            },
        )
    }

    #[test]
    fn honest_proof_verifies() {
        let mut rng = init_testing();
        let (_key, f) = fixture(&mut rng);
        let input = SignatureFactorInput {
            params: &f.params,
            signature_factor_public: &f.signature_factor_public,
            signature_unmask: &f.signature_unmask,
            secret_key_factor: &f.secret_key_factor,
        };
        let secret = SignatureFactorSecret {
            signature_factor_secret: &f.signature_factor_secret,
            signature_factor_mask: &f.signature_factor_mask,
            paillier_nonce: &f.nonce,
        };
        let proof = SignatureFactorRangeProof::prove(&input, &secret, &mut rng).unwrap();
        assert!(proof.verify(&input));
        assert!(proof.verify(&input));
    }

    #[test]
    fn mutated_proof_fields_are_rejected() {
        let mut rng = init_testing();
        let (_key, f) = fixture(&mut rng);
        let input = SignatureFactorInput {
            params: &f.params,
            signature_factor_public: &f.signature_factor_public,
            signature_unmask: &f.signature_unmask,
            secret_key_factor: &f.secret_key_factor,
        };
        let secret = SignatureFactorSecret {
            signature_factor_secret: &f.signature_factor_secret,
            signature_factor_mask: &f.signature_factor_mask,
            paillier_nonce: &f.nonce,
        };
        let proof = SignatureFactorRangeProof::prove(&input, &secret, &mut rng).unwrap();

        let mutations: Vec<Box<dyn Fn(&mut SignatureFactorRangeProof)>> = vec![
            Box::new(|p| p.z1 = &p.z1 + BigNumber::one()),
            Box::new(|p| p.z2 = &p.z2 + BigNumber::one()),
            Box::new(|p| p.u1 = CurvePoint::GENERATOR),
            Box::new(|p| p.u3 = &p.u3 + BigNumber::one()),
            Box::new(|p| p.v1 = &p.v1 + BigNumber::one()),
            Box::new(|p| p.v3 = &p.v3 + BigNumber::one()),
            Box::new(|p| p.e = &p.e + BigNumber::one()),
            Box::new(|p| p.s1 = &p.s1 + BigNumber::one()),
            Box::new(|p| p.s2 = &p.s2 + BigNumber::one()),
            Box::new(|p| p.t1 = BigNumber::zero()),
            Box::new(|p| p.t2 = &p.t2 + BigNumber::one()),
            Box::new(|p| p.t3 = &p.t3 + BigNumber::one()),
        ];
        for mutate in mutations {
            let mut bad = proof.clone();
            mutate(&mut bad);
            assert!(!bad.verify(&input));
        }

        // Elements outside their groups fail the preliminary range check.
        let mut bad = proof.clone();
        bad.v1 = f.params.n_square();
        assert!(!bad.verify(&input));
    }
}
