use crate::curve::CurveId;
use crate::error::{EcdhError, KeyGenerationCause};
use elliptic_curve::sec1::ToEncodedPoint;
use elliptic_curve::{CurveArithmetic, FieldBytes, SecretKey};
use rand_core::{CryptoRngCore, OsRng};
use std::fmt;
use tracing::{debug, trace};
use zeroize::Zeroize;

/// Draws of random field bytes before giving up on finding a scalar in `[1, n)`.
///
/// For P-256 a single draw is rejected with probability below 2^-32.
const MAX_SCALAR_DRAWS: usize = 16;

/// Secret scalar of one party. Zeroized on drop, never serialized.
pub enum PrivateKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

impl PrivateKey {
    pub fn curve(&self) -> CurveId {
        match self {
            PrivateKey::P256(_) => CurveId::Prime256v1,
            PrivateKey::P384(_) => CurveId::Secp384r1,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::P256(secret) => PublicKey::P256(secret.public_key()),
            PrivateKey::P384(secret) => PublicKey::P384(secret.public_key()),
        }
    }

    #[cfg(test)]
    pub(crate) fn scalar_bytes(&self) -> Vec<u8> {
        match self {
            PrivateKey::P256(secret) => secret.to_bytes().to_vec(),
            PrivateKey::P384(secret) => secret.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

/// Curve point of one party. Carries no secret and may be copied freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
}

impl PublicKey {
    pub fn curve(&self) -> CurveId {
        match self {
            PublicKey::P256(_) => CurveId::Prime256v1,
            PublicKey::P384(_) => CurveId::Secp384r1,
        }
    }

    /// SEC1 uncompressed form, `0x04 || X || Y`.
    pub fn to_uncompressed_point(&self) -> Vec<u8> {
        match self {
            PublicKey::P256(public) => public.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::P384(public) => public.to_encoded_point(false).as_bytes().to_vec(),
        }
    }
}

/// A private key together with its public image under base-point multiplication.
#[derive(Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Imports a big-endian scalar, e.g. for known-answer tests.
    pub fn from_secret_bytes(curve: CurveId, secret: &[u8]) -> Result<Self, EcdhError> {
        if secret.len() != curve.field_size() {
            return Err(KeyGenerationCause::InvalidScalar(curve).into());
        }
        let private = match curve {
            CurveId::Prime256v1 => p256::SecretKey::from_slice(secret).map(PrivateKey::P256),
            CurveId::Secp384r1 => p384::SecretKey::from_slice(secret).map(PrivateKey::P384),
        }
        .map_err(|_| KeyGenerationCause::InvalidScalar(curve))?;
        Ok(Self::from_private(private))
    }

    fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    pub fn curve(&self) -> CurveId {
        self.private.curve()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn into_parts(self) -> (PrivateKey, PublicKey) {
        (self.private, self.public)
    }
}

/// Produces fresh key pairs on one named curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPairGenerator {
    curve: CurveId,
}

impl KeyPairGenerator {
    pub fn new(curve: CurveId) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> CurveId {
        self.curve
    }

    /// Generates a key pair from the operating system's CSPRNG.
    pub fn generate(&self) -> Result<KeyPair, EcdhError> {
        self.generate_with_rng(&mut OsRng)
    }

    pub fn generate_with_rng(&self, rng: &mut impl CryptoRngCore) -> Result<KeyPair, EcdhError> {
        let private = match self.curve {
            CurveId::Prime256v1 => PrivateKey::P256(random_secret(self.curve, rng)?),
            CurveId::Secp384r1 => PrivateKey::P384(random_secret(self.curve, rng)?),
        };
        debug!(curve = %self.curve, "generated key pair");
        Ok(KeyPair::from_private(private))
    }
}

fn random_secret<C>(
    curve: CurveId,
    rng: &mut impl CryptoRngCore,
) -> Result<SecretKey<C>, KeyGenerationCause>
where
    C: CurveArithmetic,
{
    let mut candidate = FieldBytes::<C>::default();
    let mut result = Err(KeyGenerationCause::ScalarOutOfRange {
        curve,
        attempts: MAX_SCALAR_DRAWS,
    });
    for attempt in 1..=MAX_SCALAR_DRAWS {
        if let Err(err) = rng.try_fill_bytes(&mut candidate) {
            result = Err(KeyGenerationCause::RandomSource(err));
            break;
        }
        match SecretKey::<C>::from_bytes(&candidate) {
            Ok(secret) => {
                result = Ok(secret);
                break;
            }
            Err(_) => trace!(%curve, attempt, "scalar out of range, redrawing"),
        }
    }
    let spent: &mut [u8] = &mut candidate;
    spent.zeroize();
    result
}
