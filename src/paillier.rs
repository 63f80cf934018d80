//! Threshold Paillier cryptosystem backing the homomorphic operations of
//! the signing protocol.
//!
//! The scheme is additively homomorphic: multiplying two ciphertexts adds
//! their plaintexts, and raising a ciphertext to a scalar multiplies its
//! plaintext by that scalar. Decryption is shared: each member holds a share
//! of the decryption exponent and produces a partial decryption; any
//! `threshold` of those combine into the plaintext.
//!
//! Key generation works in an oracle mode — one dealer generates the safe
//! primes and distributes one [`ThresholdPrivateKey`] per member. How the
//! dealer output reaches the members is the deployment's concern.

use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::utils::discrete_exp;

/// Errors surfaced by the threshold Paillier cryptosystem.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PaillierError {
    /// Plaintexts must lie in `[0, N)`.
    #[error("plaintext is outside the allowed range [0, N)")]
    PlaintextOutOfRange,
    /// Fewer partial decryptions than the scheme's threshold were supplied.
    #[error("not enough partial decryptions: got {got}, need at least {needed}")]
    NotEnoughPartialDecryptions {
        /// Number of shares supplied.
        got: usize,
        /// The configured decryption threshold.
        needed: usize,
    },
    /// Partial decryption shares repeated or outside the group.
    #[error("partial decryption share identifiers must be unique and within the group")]
    MalformedDecryptionShares,
    /// A modular inverse required by the scheme does not exist.
    #[error("could not invert element modulo N")]
    NotInvertible,
    /// The dealer could not produce a key set.
    #[error("could not generate threshold keys: {0}")]
    KeyGeneration(String),
}

type Result<T> = std::result::Result<T, PaillierError>;

/// A Paillier ciphertext: an element of `Z*_{N^2}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ciphertext(pub(crate) BigNumber);

/// One member's contribution to a shared decryption.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialDecryption {
    pub(crate) id: usize,
    pub(crate) share: BigNumber,
}

/// One member's share of a threshold Paillier key.
///
/// All members hold the same public modulus `N`; the decryption exponent is
/// shared with a degree `threshold - 1` polynomial, so the key never exists
/// in one place after dealing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPrivateKey {
    n: BigNumber,
    id: usize,
    secret_share: BigNumber,
    group_size: usize,
    threshold: usize,
}

impl ThresholdPrivateKey {
    /// The public Paillier modulus `N`.
    pub fn n(&self) -> &BigNumber {
        &self.n
    }

    fn n_square(&self) -> BigNumber {
        &self.n * &self.n
    }

    /// Encrypt `plaintext` with a fresh nonce.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &BigNumber,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let nonce = self.random_nonce(rng);
        self.encrypt_with_nonce(plaintext, &nonce)
    }

    /// Encrypt `plaintext` with the caller-provided nonce `r ∈ Z*_N`:
    /// `c = (N+1)^plaintext * r^N mod N^2`.
    ///
    /// The range proofs about a ciphertext need the nonce it was built with,
    /// which is why it is taken explicitly here.
    pub fn encrypt_with_nonce(&self, plaintext: &BigNumber, r: &BigNumber) -> Result<Ciphertext> {
        if plaintext < &BigNumber::zero() || plaintext >= &self.n {
            return Err(PaillierError::PlaintextOutOfRange);
        }
        let nn = self.n_square();
        let g = &self.n + BigNumber::one();
        let a = g.modpow(plaintext, &nn);
        let b = r.modpow(&self.n, &nn);
        Ok(Ciphertext(a.modmul(&b, &nn)))
    }

    /// Homomorphically add the plaintexts of the given ciphertexts.
    pub fn add(&self, ciphertexts: &[&Ciphertext]) -> Ciphertext {
        let nn = self.n_square();
        Ciphertext(
            ciphertexts
                .iter()
                .fold(BigNumber::one(), |acc, c| acc.modmul(&c.0, &nn)),
        )
    }

    /// Homomorphically multiply the plaintext of `ciphertext` by `scalar`.
    pub fn mul(&self, ciphertext: &Ciphertext, scalar: &BigNumber) -> Ciphertext {
        let nn = self.n_square();
        Ciphertext(ciphertext.0.modpow(scalar, &nn))
    }

    /// Produce this member's partial decryption `c^{2Δs_i} mod N^2` of the
    /// given ciphertext, where `Δ = group_size!`.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> PartialDecryption {
        let exponent = BigNumber::from(2) * factorial(self.group_size) * &self.secret_share;
        PartialDecryption {
            id: self.id,
            share: ciphertext.0.modpow(&exponent, &self.n_square()),
        }
    }

    /// Combine at least `threshold` partial decryptions into the plaintext.
    ///
    /// The combination interpolates the shared decryption exponent in the
    /// ciphertext exponent: `c' = Π c_i^{2λ_i}` with `Δ`-scaled Lagrange
    /// coefficients `λ_i`, after which `c' = (1+N)^{4Δ²·plaintext}` and the
    /// plaintext is recovered as `L(c') / 4Δ² mod N`.
    pub fn combine_partial_decryptions(
        &self,
        partial_decryptions: &[PartialDecryption],
    ) -> Result<BigNumber> {
        if partial_decryptions.len() < self.threshold {
            return Err(PaillierError::NotEnoughPartialDecryptions {
                got: partial_decryptions.len(),
                needed: self.threshold,
            });
        }
        let ids: Vec<usize> = partial_decryptions.iter().map(|pd| pd.id).collect();
        let distinct: BTreeSet<_> = ids.iter().collect();
        if distinct.len() != ids.len() || ids.iter().any(|id| *id < 1 || *id > self.group_size) {
            return Err(PaillierError::MalformedDecryptionShares);
        }

        let nn = self.n_square();
        let delta = factorial(self.group_size);

        let mut combined = BigNumber::one();
        for pd in partial_decryptions {
            let lambda = lagrange_coefficient(&delta, pd.id, &ids);
            let exponent = BigNumber::from(2) * lambda;
            let factor = discrete_exp(&pd.share, &exponent, &nn)
                .map_err(|_| PaillierError::NotInvertible)?;
            combined = combined.modmul(&factor, &nn);
        }

        // combined = (1 + N)^{4Δ²·plaintext} = 1 + N·(4Δ²·plaintext) mod N^2
        let l_value = (combined - BigNumber::one()) / &self.n;
        let four_delta_sq = BigNumber::from(4) * &delta * &delta;
        let inv = four_delta_sq
            .invert(&self.n)
            .ok_or(PaillierError::NotInvertible)?;
        Ok(l_value.modmul(&inv, &self.n))
    }

    fn random_nonce<R: RngCore + CryptoRng>(&self, rng: &mut R) -> BigNumber {
        loop {
            let r = BigNumber::from_rng(&self.n, rng);
            if r != BigNumber::zero() && r.gcd(&self.n) == BigNumber::one() {
                return r;
            }
        }
    }
}

/// `Δ`-scaled Lagrange coefficient at zero: `λ_i = Δ · Π_{j≠i} j/(j−i)`.
///
/// With `Δ = group_size!` the quotient is always an integer; numerator and
/// denominator are accumulated separately with the sign tracked outside the
/// (unsigned-magnitude) division.
fn lagrange_coefficient(delta: &BigNumber, i: usize, ids: &[usize]) -> BigNumber {
    let mut numerator = delta.clone();
    let mut denominator = BigNumber::one();
    let mut negative = false;
    for &j in ids {
        if j == i {
            continue;
        }
        numerator = numerator * BigNumber::from(j as u64);
        let diff = if j > i {
            BigNumber::from((j - i) as u64)
        } else {
            negative = !negative;
            BigNumber::from((i - j) as u64)
        };
        denominator = denominator * diff;
    }
    let magnitude = numerator / denominator;
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn factorial(n: usize) -> BigNumber {
    (1..=n).fold(BigNumber::one(), |acc, i| acc * BigNumber::from(i as u64))
}

/// Dealer for a `(threshold, group_size)` sharing of a fresh Paillier key.
#[derive(Clone, Copy, Debug)]
pub struct ThresholdKeyGenerator {
    bit_length: usize,
    group_size: usize,
    threshold: usize,
}

impl ThresholdKeyGenerator {
    /// Configure a dealer for a modulus of `bit_length` bits shared among
    /// `group_size` members with decryption threshold `threshold`.
    pub fn new(bit_length: usize, group_size: usize, threshold: usize) -> Result<Self> {
        if threshold == 0 || threshold > group_size {
            return Err(PaillierError::KeyGeneration(format!(
                "threshold {} must be in [1, {}]",
                threshold, group_size,
            )));
        }
        if bit_length % 2 != 0 || bit_length < 32 {
            return Err(PaillierError::KeyGeneration(format!(
                "modulus bit length {} must be an even number of usable size",
                bit_length,
            )));
        }
        Ok(Self {
            bit_length,
            group_size,
            threshold,
        })
    }

    /// Generate the key set from freshly drawn safe primes. Slow: finding
    /// two safe primes of production size takes minutes.
    pub fn generate<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<Vec<ThresholdPrivateKey>> {
        let p = BigNumber::safe_prime(self.bit_length / 2);
        let q = loop {
            let candidate = BigNumber::safe_prime(self.bit_length / 2);
            if candidate != p {
                break candidate;
            }
        };
        self.generate_from_safe_primes(&p, &q, rng)
    }

    /// Generate the key set from caller-provided safe primes, e.g. a
    /// precomputed pool in tests.
    pub fn generate_from_safe_primes<R: RngCore + CryptoRng>(
        &self,
        p: &BigNumber,
        q: &BigNumber,
        rng: &mut R,
    ) -> Result<Vec<ThresholdPrivateKey>> {
        if p == q {
            return Err(PaillierError::KeyGeneration(
                "the two safe primes must be distinct".to_string(),
            ));
        }
        let n = p * q;
        let p_sub = (p - 1) / BigNumber::from(2);
        let q_sub = (q - 1) / BigNumber::from(2);
        let m = &p_sub * &q_sub;
        let nm = &n * &m;

        // d ≡ 1 (mod N) and d ≡ 0 (mod M) so that interpolation in the
        // exponent cancels all nonce contributions.
        let m_inv = m
            .invert(&n)
            .ok_or_else(|| PaillierError::KeyGeneration("M is not invertible mod N".to_string()))?;
        let d = &m * &m_inv;

        // Share d with a random polynomial of degree threshold - 1 over Z_{NM}.
        let mut coefficients = vec![d];
        for _ in 1..self.threshold {
            coefficients.push(BigNumber::from_rng(&nm, rng));
        }

        let keys = (1..=self.group_size)
            .map(|id| {
                let x = BigNumber::from(id as u64);
                let mut share = BigNumber::zero();
                for coefficient in coefficients.iter().rev() {
                    share = (share * &x + coefficient) % &nm;
                }
                ThresholdPrivateKey {
                    n: n.clone(),
                    id,
                    secret_share: share,
                    group_size: self.group_size,
                    threshold: self.threshold,
                }
            })
            .collect();
        Ok(keys)
    }
}
