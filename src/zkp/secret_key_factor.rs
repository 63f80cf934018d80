//! Range proof certifying a multiplicative relationship between three
//! Paillier ciphertexts.
//!
//! For ciphertexts `c1 = E(η·x)`, `c2 = E(x)` and `c3 = E(η)`, the proof
//! states that there exists an `η ∈ [-q^3, q^3]` such that `D(c3) = η` and
//! `D(c1) = η · D(c2)`. The signing protocol uses it in rounds one and two
//! to certify that the revealed secret key multiple really is the shared
//! encrypted key scaled by the revealed secret key factor.

use crate::errors::Result;
use crate::paillier::Ciphertext;
use crate::utils::{
    discrete_exp, is_in_range, modpow, positive_challenge_from_transcript, random_bn_in_z_star,
    random_positive_bn,
};
use crate::zkp::PublicParameters;
use libpaillier::unknown_order::BigNumber;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Public values the proof speaks about.
pub(crate) struct SecretKeyFactorInput<'a> {
    pub(crate) params: &'a PublicParameters,
    /// `c1 = E(η·x)`, the encrypted secret key multiple.
    pub(crate) secret_key_multiple: &'a Ciphertext,
    /// `c2 = E(x)`, the shared encrypted secret key.
    pub(crate) encrypted_secret_key: &'a Ciphertext,
    /// `c3 = E(η)`, the encrypted factor.
    pub(crate) encrypted_factor: &'a Ciphertext,
}

/// The prover's secret knowledge.
pub(crate) struct SecretKeyFactorSecret<'a> {
    /// The factor `η`.
    pub(crate) factor: &'a BigNumber,
    /// The nonce used to produce `c3`.
    pub(crate) paillier_nonce: &'a BigNumber,
}

/// Proof that one ciphertext encrypts a public-factor multiple of another
/// ciphertext's plaintext, and that a third ciphertext encrypts exactly
/// that factor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SecretKeyFactorRangeProof {
    z: BigNumber,
    v: BigNumber,
    u1: BigNumber,
    u2: BigNumber,
    e: BigNumber,
    s1: BigNumber,
    s2: BigNumber,
    s3: BigNumber,
}

impl SecretKeyFactorRangeProof {
    pub(crate) fn prove<R: RngCore + CryptoRng>(
        input: &SecretKeyFactorInput<'_>,
        secret: &SecretKeyFactorSecret<'_>,
        rng: &mut R,
    ) -> Result<Self> {
        let params = input.params;
        let n_square = params.n_square();

        let alpha = random_positive_bn(rng, &params.q_cube());
        let beta = random_bn_in_z_star(rng, &params.n)?;
        let rho = random_positive_bn(rng, &params.q_n_tilde());
        let gamma = random_positive_bn(rng, &params.q_cube_n_tilde());

        // u1 = h1^η * h2^ρ mod Ñ
        let u1 = modpow(&params.h1, secret.factor, &params.n_tilde)
            .modmul(&modpow(&params.h2, &rho, &params.n_tilde), &params.n_tilde);
        // u2 = h1^α * h2^γ mod Ñ
        let u2 = modpow(&params.h1, &alpha, &params.n_tilde)
            .modmul(&modpow(&params.h2, &gamma, &params.n_tilde), &params.n_tilde);
        // z = Γ^α * β^N mod N²
        let z = modpow(&params.g(), &alpha, &n_square)
            .modmul(&modpow(&beta, &params.n, &n_square), &n_square);
        // v = c2^α mod N²
        let v = modpow(&input.encrypted_secret_key.0, &alpha, &n_square);

        let mut transcript = Transcript::new(b"SecretKeyFactorRangeProof");
        Self::fill_transcript(&mut transcript, input, &z, &u1, &u2, &v);
        let e = positive_challenge_from_transcript(&mut transcript, &params.q)?;

        // s1 = e*η + α
        let s1 = &e * secret.factor + &alpha;
        // s2 = r^e * β mod N
        let s2 = modpow(secret.paillier_nonce, &e, &params.n).modmul(&beta, &params.n);
        // s3 = e*ρ + γ
        let s3 = &e * &rho + &gamma;

        Ok(Self {
            z,
            v,
            u1,
            u2,
            e,
            s1,
            s2,
            s3,
        })
    }

    /// Check the proof against the given ciphertext triple. Returns `false`
    /// on any single mismatch.
    pub(crate) fn verify(&self, input: &SecretKeyFactorInput<'_>) -> bool {
        self.verify_inner(input).unwrap_or(false)
    }

    fn verify_inner(&self, input: &SecretKeyFactorInput<'_>) -> Result<bool> {
        let params = input.params;
        if !self.all_parameters_in_range(params) {
            return Ok(false);
        }
        let n_square = params.n_square();

        // z = Γ^s1 * s2^N * c3^-e mod N², which collapses to Γ^α * β^N.
        let z = modpow(&params.g(), &self.s1, &n_square)
            .modmul(&modpow(&self.s2, &params.n, &n_square), &n_square)
            .modmul(
                &discrete_exp(&input.encrypted_factor.0, &-self.e.clone(), &n_square)?,
                &n_square,
            );
        // v = c2^s1 * c1^-e mod N², which collapses to c2^α.
        let v = modpow(&input.encrypted_secret_key.0, &self.s1, &n_square).modmul(
            &discrete_exp(&input.secret_key_multiple.0, &-self.e.clone(), &n_square)?,
            &n_square,
        );
        // u2 = h1^s1 * h2^s3 * u1^-e mod Ñ, which collapses to h1^α * h2^γ.
        let u2 = modpow(&params.h1, &self.s1, &params.n_tilde)
            .modmul(&modpow(&params.h2, &self.s3, &params.n_tilde), &params.n_tilde)
            .modmul(
                &discrete_exp(&self.u1, &-self.e.clone(), &params.n_tilde)?,
                &params.n_tilde,
            );

        let mut transcript = Transcript::new(b"SecretKeyFactorRangeProof");
        Self::fill_transcript(&mut transcript, input, &z, &self.u1, &u2, &v);
        let e = positive_challenge_from_transcript(&mut transcript, &params.q)?;

        Ok(self.u2 == u2 && self.v == v && self.z == z && self.e == e)
    }

    fn all_parameters_in_range(&self, params: &PublicParameters) -> bool {
        let zero = BigNumber::zero();
        is_in_range(&self.z, &zero, &params.n_square())
            && is_in_range(&self.v, &zero, &params.n_square())
            && is_in_range(&self.u1, &zero, &params.n_tilde)
            && is_in_range(&self.u2, &zero, &params.n_tilde)
            && is_in_range(&self.s2, &zero, &params.n)
    }

    fn fill_transcript(
        transcript: &mut Transcript,
        input: &SecretKeyFactorInput<'_>,
        z: &BigNumber,
        u1: &BigNumber,
        u2: &BigNumber,
        v: &BigNumber,
    ) {
        transcript.append_message(b"c1", &input.secret_key_multiple.0.to_bytes());
        transcript.append_message(b"c2", &input.encrypted_secret_key.0.to_bytes());
        transcript.append_message(b"c3", &input.encrypted_factor.0.to_bytes());
        transcript.append_message(b"z", &z.to_bytes());
        transcript.append_message(b"u1", &u1.to_bytes());
        transcript.append_message(b"u2", &u2.to_bytes());
        transcript.append_message(b"v", &v.to_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::{ThresholdKeyGenerator, ThresholdPrivateKey};
    use crate::safe_primes::test_safe_primes_512;
    use crate::utils::{k256_order, testing::init_testing};
    use rand::rngs::StdRng;

    struct Fixture {
        params: PublicParameters,
        factor: BigNumber,
        nonce: BigNumber,
        secret_key_multiple: Ciphertext,
        encrypted_secret_key: Ciphertext,
        encrypted_factor: Ciphertext,
    }

    fn fixture(rng: &mut StdRng) -> (ThresholdPrivateKey, Fixture) {
        let primes = test_safe_primes_512();
        let paillier_key = ThresholdKeyGenerator::new(1024, 3, 2)
            .unwrap()
            .generate_from_safe_primes(&primes[0], &primes[1], rng)
            .unwrap()
            .remove(0);
        let params = PublicParameters::generate_from_safe_primes(
            paillier_key.n(),
            &primes[2],
            &primes[3],
            k256_order(),
            rng,
        )
        .unwrap();

        let secret_key = random_positive_bn(rng, &k256_order());
        let factor = random_positive_bn(rng, &k256_order());
        let encrypted_secret_key = paillier_key.encrypt(&secret_key, rng).unwrap();
        let nonce = random_bn_in_z_star(rng, paillier_key.n()).unwrap();
        let encrypted_factor = paillier_key.encrypt_with_nonce(&factor, &nonce).unwrap();
        let secret_key_multiple = paillier_key.mul(&encrypted_secret_key, &factor);

        (
            paillier_key,
            Fixture {
                params,
                factor,
                nonce,
                secret_key_multiple,
                encrypted_secret_key,
                encrypted_factor,
            },
        )
    }

    #[test]
    fn honest_proof_verifies() {
        let mut rng = init_testing();
        let (_key, f) = fixture(&mut rng);
        let input = SecretKeyFactorInput {
            params: &f.params,
            secret_key_multiple: &f.secret_key_multiple,
            encrypted_secret_key: &f.encrypted_secret_key,
            encrypted_factor: &f.encrypted_factor,
        };
        let secret = SecretKeyFactorSecret {
            factor: &f.factor,
            paillier_nonce: &f.nonce,
        };
        let proof = SecretKeyFactorRangeProof::prove(&input, &secret, &mut rng).unwrap();
        assert!(proof.verify(&input));
        assert!(proof.verify(&input));
    }

    #[test]
    fn mutated_proof_fields_are_rejected() {
        let mut rng = init_testing();
        let (_key, f) = fixture(&mut rng);
        let input = SecretKeyFactorInput {
            params: &f.params,
            secret_key_multiple: &f.secret_key_multiple,
            encrypted_secret_key: &f.encrypted_secret_key,
            encrypted_factor: &f.encrypted_factor,
        };
        let secret = SecretKeyFactorSecret {
            factor: &f.factor,
            paillier_nonce: &f.nonce,
        };
        let proof = SecretKeyFactorRangeProof::prove(&input, &secret, &mut rng).unwrap();

        let mutations: Vec<Box<dyn Fn(&mut SecretKeyFactorRangeProof)>> = vec![
            Box::new(|p| p.z = &p.z + BigNumber::one()),
            Box::new(|p| p.v = &p.v + BigNumber::one()),
            Box::new(|p| p.u1 = BigNumber::zero()),
            Box::new(|p| p.u2 = &p.u2 + BigNumber::one()),
            Box::new(|p| p.e = &p.e + BigNumber::one()),
            Box::new(|p| p.s1 = &p.s1 + BigNumber::one()),
            Box::new(|p| p.s2 = BigNumber::zero()),
            Box::new(|p| p.s3 = &p.s3 + BigNumber::one()),
        ];
        for mutate in mutations {
            let mut bad = proof.clone();
            mutate(&mut bad);
            assert!(!bad.verify(&input));
        }
    }

    #[test]
    fn wrong_multiple_is_rejected() {
        let mut rng = init_testing();
        let (key, f) = fixture(&mut rng);
        let secret = SecretKeyFactorSecret {
            factor: &f.factor,
            paillier_nonce: &f.nonce,
        };
        let input = SecretKeyFactorInput {
            params: &f.params,
            secret_key_multiple: &f.secret_key_multiple,
            encrypted_secret_key: &f.encrypted_secret_key,
            encrypted_factor: &f.encrypted_factor,
        };
        let proof = SecretKeyFactorRangeProof::prove(&input, &secret, &mut rng).unwrap();

        // The same proof must not validate a different multiple ciphertext.
        let doctored = key.mul(&f.secret_key_multiple, &BigNumber::from(2));
        let wrong_input = SecretKeyFactorInput {
            params: &f.params,
            secret_key_multiple: &doctored,
            encrypted_secret_key: &f.encrypted_secret_key,
            encrypted_factor: &f.encrypted_factor,
        };
        assert!(!proof.verify(&wrong_input));
    }
}
