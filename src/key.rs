//! Key material produced by the distributed key generation.

use crate::errors::{Error, Result};
use crate::paillier::{Ciphertext, ThresholdPrivateKey};
use crate::parameters::CurveId;
use crate::utils::CurvePoint;
use libpaillier::unknown_order::BigNumber;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One party's freshly drawn ECDSA key share, held only between the two
/// key-generation rounds.
#[derive(Clone)]
pub(crate) struct EcdsaKeyShare {
    /// Random element of `Z_q`.
    pub(crate) secret_key_share: BigNumber,
    /// `g^secret_key_share`.
    pub(crate) public_key_share: CurvePoint,
}

impl Debug for EcdsaKeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaKeyShare")
            .field("secret_key_share", &"[redacted]")
            .field("public_key_share", &self.public_key_share)
            .finish()
    }
}

/// A `(t, n)` threshold sharing of an ECDSA key.
///
/// The private key is never materialized: it exists only as the
/// homomorphic sum of all members' encrypted shares, decryptable solely
/// through threshold Paillier decryption. The public key is the matching
/// curve-point sum and is identical across all honest members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEcdsaKey {
    pub(crate) encrypted_secret_key: Ciphertext,
    pub(crate) public_key: CurvePoint,
    pub(crate) curve: CurveId,
}

impl ThresholdEcdsaKey {
    /// The combined public ECDSA key of the group.
    pub fn public_key(&self) -> &CurvePoint {
        &self.public_key
    }
}

/// The durable private state one group member must keep to take part in
/// signing: its threshold Paillier key share and the combined threshold
/// ECDSA key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivateKeyShare {
    pub(crate) paillier_key: ThresholdPrivateKey,
    pub(crate) key: ThresholdEcdsaKey,
}

impl PrivateKeyShare {
    /// Bundle a member's paillier key share with the group key.
    pub fn new(paillier_key: ThresholdPrivateKey, key: ThresholdEcdsaKey) -> Self {
        Self { paillier_key, key }
    }

    /// The threshold ECDSA key this share belongs to.
    pub fn key(&self) -> &ThresholdEcdsaKey {
        &self.key
    }

    /// Encode the key share for storage or transport.
    ///
    /// Fails with [`Error::IncompatibleCurve`] instead of silently encoding
    /// key material the signing protocol cannot use.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.key.curve != CurveId::Secp256k1 {
            return Err(Error::IncompatibleCurve);
        }
        serialize!(self)
    }

    /// Decode a key share previously encoded with [`PrivateKeyShare::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let share: Self = deserialize!(bytes)?;
        if share.key.curve != CurveId::Secp256k1 {
            return Err(Error::IncompatibleCurve);
        }
        Ok(share)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::ThresholdKeyGenerator;
    use crate::safe_primes::test_safe_primes_512;
    use crate::utils::{k256_order, random_positive_bn, testing::init_testing};

    fn sample_share(curve: CurveId) -> PrivateKeyShare {
        let mut rng = init_testing();
        let primes = test_safe_primes_512();
        let paillier_key = ThresholdKeyGenerator::new(1024, 3, 2)
            .unwrap()
            .generate_from_safe_primes(&primes[0], &primes[1], &mut rng)
            .unwrap()
            .remove(0);
        let secret = random_positive_bn(&mut rng, &k256_order());
        let encrypted_secret_key = paillier_key.encrypt(&secret, &mut rng).unwrap();
        let public_key = CurvePoint::GENERATOR.multiply_by_bignum(&secret).unwrap();
        PrivateKeyShare::new(
            paillier_key,
            ThresholdEcdsaKey {
                encrypted_secret_key,
                public_key,
                curve,
            },
        )
    }

    #[test]
    fn key_share_roundtrips_through_bytes() {
        let share = sample_share(CurveId::Secp256k1);
        let bytes = share.to_bytes().unwrap();
        let roundtrip = PrivateKeyShare::from_bytes(&bytes).unwrap();
        assert_eq!(share.key, roundtrip.key);
        assert_eq!(bytes, roundtrip.to_bytes().unwrap());
    }

    #[test]
    fn incompatible_curve_is_rejected() {
        let share = sample_share(CurveId::NistP256);
        assert_eq!(share.to_bytes(), Err(Error::IncompatibleCurve));

        // Foreign bytes are rejected on the way in as well.
        let bytes = bincode::serialize(&share).unwrap();
        assert_eq!(PrivateKeyShare::from_bytes(&bytes), Err(Error::IncompatibleCurve));
    }
}
