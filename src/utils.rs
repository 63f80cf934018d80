//! Numeric and curve helpers shared across the protocol.

use crate::errors::{Error, Result};
use generic_array::GenericArray;
use k256::{
    elliptic_curve::{
        bigint::Encoding, group::GroupEncoding, point::AffineCoordinates, Curve, PrimeField,
    },
    AffinePoint, FieldBytes, Scalar,
};
use libpaillier::unknown_order::BigNumber;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::error;

/// Number of attempts made by rejection-sampling loops before giving up.
pub(crate) const CRYPTOGRAPHIC_RETRY_MAX: usize = 500;

/// Wrapper around [`k256::ProjectivePoint`] so that we can define our own
/// byte encoding and serde implementation for it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CurvePoint(pub(crate) k256::ProjectivePoint);

impl CurvePoint {
    pub(crate) const GENERATOR: Self = CurvePoint(k256::ProjectivePoint::GENERATOR);
    pub(crate) const IDENTITY: Self = CurvePoint(k256::ProjectivePoint::IDENTITY);

    /// The x-coordinate of the point in affine representation.
    pub fn x_affine(&self) -> FieldBytes {
        self.0.to_affine().x()
    }

    /// The x-coordinate as an unsigned big integer.
    pub(crate) fn x_bn(&self) -> BigNumber {
        BigNumber::from_slice(self.x_affine())
    }

    /// Whether the y-coordinate of the affine representation is odd.
    pub(crate) fn y_is_odd(&self) -> bool {
        self.0.to_affine().y_is_odd().into()
    }

    /// Multiply `self` by a [`BigNumber`], which is first reduced into the
    /// secp256k1 scalar field.
    pub(crate) fn multiply_by_bignum(&self, scalar: &BigNumber) -> Result<Self> {
        Ok(Self(self.0 * bn_to_scalar(scalar)?))
    }

    /// Serialize the point as an affine-encoded SEC1 byte array.
    pub(crate) fn to_bytes(self) -> Vec<u8> {
        AffinePoint::from(self.0).to_bytes().to_vec()
    }

    pub(crate) fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        let fixed_len_bytes: [u8; 33] = bytes.try_into().map_err(|_| {
            error!("failed to decode bytes as a curve point");
            Error::Serialization
        })?;
        let point: Option<AffinePoint> = AffinePoint::from_bytes(&fixed_len_bytes.into()).into();
        match point {
            Some(point) => Ok(Self(point.into())),
            None => {
                error!("failed to decode bytes as a curve point");
                Err(Error::Serialization)
            }
        }
    }
}

impl std::ops::Add for CurvePoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Neg for CurvePoint {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Serialize for CurvePoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        AffinePoint::from(self.0).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CurvePoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let p = AffinePoint::deserialize(deserializer)?;
        Ok(Self(p.into()))
    }
}

/// The order `q` of the secp256k1 curve, as a [`BigNumber`].
pub(crate) fn k256_order() -> BigNumber {
    let order_bytes: [u8; 32] = k256::Secp256k1::ORDER.to_be_bytes();
    BigNumber::from_slice(order_bytes)
}

/// Convert a [`BigNumber`] to a secp256k1 scalar, reducing it mod `q`.
pub(crate) fn bn_to_scalar(x: &BigNumber) -> Result<Scalar> {
    let order = k256_order();
    let x_modded = x % order;

    let bytes = x_modded.to_bytes();
    let mut slice = vec![0u8; 32 - bytes.len()];
    slice.extend_from_slice(&bytes);
    let mut ret: Scalar = Option::from(Scalar::from_repr(GenericArray::clone_from_slice(&slice)))
        .ok_or_else(|| {
            error!("failed to convert BigNumber into k256::Scalar");
            Error::InternalInvariantFailed
        })?;

    // The reduction above drops the sign; restore it in the scalar field.
    if x < &BigNumber::zero() {
        ret = ret.negate();
    }
    Ok(ret)
}

/// Convert a secp256k1 scalar back to a [`BigNumber`].
pub(crate) fn scalar_to_bn(x: &Scalar) -> BigNumber {
    BigNumber::from_slice(x.to_repr())
}

/// Compute `a^e (mod n)`.
pub(crate) fn modpow(a: &BigNumber, e: &BigNumber, n: &BigNumber) -> BigNumber {
    a.modpow(e, n)
}

/// Compute `a^e (mod n)` where `e` may be negative, in which case `a` is
/// inverted modulo `n` first.
pub(crate) fn discrete_exp(a: &BigNumber, e: &BigNumber, n: &BigNumber) -> Result<BigNumber> {
    if e < &BigNumber::zero() {
        let inv = a.invert(n).ok_or_else(|| {
            error!("could not invert element while raising to a negative exponent");
            Error::InternalInvariantFailed
        })?;
        Ok(inv.modpow(&-e.clone(), n))
    } else {
        Ok(a.modpow(e, n))
    }
}

/// Returns `true` if `lower <= x < upper`.
pub(crate) fn is_in_range(x: &BigNumber, lower: &BigNumber, upper: &BigNumber) -> bool {
    x >= lower && x < upper
}

/// Sample a number uniformly at random from the range `[0, n)`.
pub(crate) fn random_positive_bn<R: RngCore + CryptoRng>(rng: &mut R, n: &BigNumber) -> BigNumber {
    BigNumber::from_rng(n, rng)
}

/// Sample a random element of the multiplicative group `Z*_n`.
///
/// `n` is a product of large primes here, so a draw that shares a factor with
/// `n` would reveal its factorization; the chance is negligible and such
/// draws are rejected anyway.
pub(crate) fn random_bn_in_z_star<R: RngCore + CryptoRng>(
    rng: &mut R,
    n: &BigNumber,
) -> Result<BigNumber> {
    std::iter::repeat_with(|| BigNumber::from_rng(n, rng))
        .take(CRYPTOGRAPHIC_RETRY_MAX)
        .find(|r| r != &BigNumber::zero() && r.gcd(n) == BigNumber::one())
        .ok_or_else(|| {
            Error::ParameterGeneration("could not sample an element of Z*_N".to_string())
        })
}

/// Derive a deterministic pseudorandom challenge in `[0, n)` from the
/// [`Transcript`].
///
/// Reducing transcript output mod `n` would bias small values, so values at
/// or above `n` are rejected and the transcript re-queried instead.
pub(crate) fn positive_challenge_from_transcript(
    transcript: &mut Transcript,
    n: &BigNumber,
) -> Result<BigNumber> {
    let len = n.to_bytes().len();
    let mut t = vec![0u8; len];
    for _ in 0..CRYPTOGRAPHIC_RETRY_MAX {
        transcript.challenge_bytes(b"sampling randomness", t.as_mut_slice());
        let b = BigNumber::from_slice(t.as_slice());
        if &b < n {
            return Ok(b);
        }
    }
    Err(Error::InternalInvariantFailed)
}
