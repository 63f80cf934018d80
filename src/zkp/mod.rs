//! Zero-knowledge range proofs.
//!
//! Three proof families secure the protocol against active adversaries:
//!
//! - [`key_range::KeyRangeProof`] binds a secret key share, its public
//!   counterpart and its Paillier encryption during key generation.
//! - [`secret_key_factor::SecretKeyFactorRangeProof`] certifies the
//!   relationship between `E(ρ·x)`, `E(x)` and `E(ρ)` in signing rounds
//!   one and two.
//! - [`signature_factor::SignatureFactorRangeProof`] certifies the revealed
//!   signature factor `g^k` and the unmasking ciphertext in round four.
//!
//! All three follow the same non-interactive Sigma pattern: blinding values
//! are drawn from ranges sized relative to the curve order `q`, commitment
//! values are computed from them, a challenge is derived by hashing the
//! whole transcript, and responses combine secrets with the challenge.

pub(crate) mod key_range;
pub(crate) mod secret_key_factor;
pub(crate) mod signature_factor;

use crate::errors::{Error, Result};
use crate::utils::{modpow, random_positive_bn};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Public parameters shared by all range proofs of one deployment.
///
/// `n_tilde` is a product of two safe primes, and `h1`, `h2` generate its
/// quadratic-residues subgroup with the discrete log of `h1` base `h2`
/// unknown to any protocol participant (Fujisaki–Okamoto commitment
/// parameters). They are derived once per Paillier key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicParameters {
    pub(crate) n: BigNumber,
    pub(crate) n_tilde: BigNumber,
    pub(crate) h1: BigNumber,
    pub(crate) h2: BigNumber,
    pub(crate) q: BigNumber,
}

impl PublicParameters {
    /// Generate proof parameters for the given Paillier modulus and curve
    /// order. Draws two fresh safe primes, which takes minutes at
    /// production sizes.
    pub fn generate<R: RngCore + CryptoRng>(
        paillier_modulus: &BigNumber,
        curve_order: BigNumber,
        rng: &mut R,
    ) -> Result<Self> {
        let prime_bits = (paillier_modulus.to_bytes().len() * 8) / 2;
        let p = BigNumber::safe_prime(prime_bits);
        let q = loop {
            let candidate = BigNumber::safe_prime(prime_bits);
            if candidate != p {
                break candidate;
            }
        };
        Self::generate_from_safe_primes(paillier_modulus, &p, &q, curve_order, rng)
    }

    /// Generate proof parameters from caller-provided safe primes.
    pub fn generate_from_safe_primes<R: RngCore + CryptoRng>(
        paillier_modulus: &BigNumber,
        p_tilde: &BigNumber,
        q_tilde: &BigNumber,
        curve_order: BigNumber,
        rng: &mut R,
    ) -> Result<Self> {
        if p_tilde == q_tilde {
            return Err(Error::ParameterGeneration(
                "the two safe primes must be distinct".to_string(),
            ));
        }
        let n_tilde = p_tilde * q_tilde;

        // h2 is a random quadratic residue; h1 lives in the subgroup h2
        // generates, with an exponent nobody retains.
        let phi = (p_tilde - 1) * (q_tilde - 1);
        let tau = random_positive_bn(rng, &n_tilde);
        let h2 = tau.modmul(&tau, &n_tilde);
        if h2 == BigNumber::zero() || h2 == BigNumber::one() {
            return Err(Error::ParameterGeneration(
                "degenerate quadratic residue generator".to_string(),
            ));
        }
        let lambda = random_positive_bn(rng, &phi);
        let h1 = modpow(&h2, &lambda, &n_tilde);

        Ok(Self {
            n: paillier_modulus.clone(),
            n_tilde,
            h1,
            h2,
            q: curve_order,
        })
    }

    /// The Paillier plaintext group generator `Γ = N + 1`.
    pub(crate) fn g(&self) -> BigNumber {
        &self.n + BigNumber::one()
    }

    pub(crate) fn n_square(&self) -> BigNumber {
        &self.n * &self.n
    }

    pub(crate) fn q_cube(&self) -> BigNumber {
        &self.q * &self.q * &self.q
    }

    pub(crate) fn q_six(&self) -> BigNumber {
        self.q_cube() * self.q_cube()
    }

    pub(crate) fn q_eight(&self) -> BigNumber {
        self.q_six() * &self.q * &self.q
    }

    pub(crate) fn q_n_tilde(&self) -> BigNumber {
        &self.q * &self.n_tilde
    }

    pub(crate) fn q_cube_n_tilde(&self) -> BigNumber {
        self.q_cube() * &self.n_tilde
    }

    pub(crate) fn q_six_n_tilde(&self) -> BigNumber {
        self.q_six() * &self.n_tilde
    }

    pub(crate) fn q_eight_n_tilde(&self) -> BigNumber {
        self.q_eight() * &self.n_tilde
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe_primes::test_safe_primes_512;
    use crate::utils::{k256_order, testing::init_testing};

    #[test]
    fn generators_live_in_the_group() {
        let mut rng = init_testing();
        let primes = test_safe_primes_512();
        let paillier_modulus = &primes[0] * &primes[1];
        let params = PublicParameters::generate_from_safe_primes(
            &paillier_modulus,
            &primes[2],
            &primes[3],
            k256_order(),
            &mut rng,
        )
        .unwrap();

        assert!(params.h1 > BigNumber::zero() && params.h1 < params.n_tilde);
        assert!(params.h2 > BigNumber::zero() && params.h2 < params.n_tilde);
        assert_eq!(params.n_tilde, &primes[2] * &primes[3]);
    }

    #[test]
    fn identical_safe_primes_are_rejected() {
        let mut rng = init_testing();
        let primes = test_safe_primes_512();
        let paillier_modulus = &primes[0] * &primes[1];
        let result = PublicParameters::generate_from_safe_primes(
            &paillier_modulus,
            &primes[2],
            &primes[2],
            k256_order(),
            &mut rng,
        );
        assert!(matches!(result, Err(Error::ParameterGeneration(_))));
    }
}
