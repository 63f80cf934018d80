//! Deployment-wide public parameters.
//!
//! The protocol runs over a fixed elliptic curve and a threshold Paillier
//! key of a fixed bit length. For all homomorphic operations over the
//! ciphertexts (which are modulo `N`) not to conflict with the operations
//! modulo `q` of the ECDSA algorithm, `N` must dominate `q^8`; with the
//! 256-bit secp256k1 order that means a Paillier modulus of at least
//! 2048 bits.

use crate::errors::{Error, Result};
use crate::utils::k256_order;
use libpaillier::unknown_order::BigNumber;
use serde::{Deserialize, Serialize};

/// The default Paillier key bit length used by deployments.
pub const DEFAULT_PAILLIER_KEY_BIT_LENGTH: usize = 2048;

/// Identifies the elliptic curve a key or signature belongs to.
///
/// The protocol itself is instantiated for secp256k1; the other variants
/// exist so that foreign key material is recognized and rejected at the
/// serialization boundary instead of producing corrupt bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CurveId {
    /// The Bitcoin/Ethereum curve used by this protocol.
    Secp256k1,
    /// NIST P-256, unsupported by the signing protocol.
    NistP256,
}

impl CurveId {
    /// The order of the curve's scalar field.
    pub(crate) fn order(&self) -> BigNumber {
        match self {
            CurveId::Secp256k1 => k256_order(),
            CurveId::NistP256 => BigNumber::from_slice(
                hex::decode("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551")
                    .expect("static hex"),
            ),
        }
    }
}

/// Public parameters of a T-ECDSA deployment: the curve used for key
/// generation and signing, and the bit length of the threshold Paillier key
/// backing the homomorphic operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicParameters {
    /// The elliptic curve used for all protocol arithmetic.
    pub curve: CurveId,
    /// Bit length of the Paillier public key modulus.
    pub paillier_key_bit_length: usize,
}

impl PublicParameters {
    /// Create public parameters, validating that the Paillier key is large
    /// enough for the curve: the modulus bit length must be at least eight
    /// times the curve order bit length so homomorphic intermediate values
    /// never wrap.
    pub fn new(curve: CurveId, paillier_key_bit_length: usize) -> Result<Self> {
        let order_bits = curve.order().to_bytes().len() * 8;
        if paillier_key_bit_length < 8 * order_bits {
            return Err(Error::ParameterGeneration(format!(
                "paillier key bit length {} is too small for a {}-bit curve order",
                paillier_key_bit_length, order_bits,
            )));
        }
        Ok(Self {
            curve,
            paillier_key_bit_length,
        })
    }

    /// The cardinality `q` of the configured curve.
    pub(crate) fn curve_order(&self) -> BigNumber {
        self.curve.order()
    }

    /// `q / 2`, used to test whether an `S` value is in the lower half of
    /// its range. BTC and ETH require `S` values at most this large.
    pub(crate) fn half_curve_order(&self) -> BigNumber {
        self.curve_order() / BigNumber::from(2)
    }
}

impl Default for PublicParameters {
    fn default() -> Self {
        Self {
            curve: CurveId::Secp256k1,
            paillier_key_bit_length: DEFAULT_PAILLIER_KEY_BIT_LENGTH,
        }
    }
}
