//! DER SubjectPublicKeyInfo encoding of EC public keys (RFC 5480).
//!
//! This is the only form in which public key material leaves a party. The
//! encoding always names the curve by OID and carries the point uncompressed,
//! so it is byte-for-byte what OpenSSL's `i2d_PUBKEY` produces.

use crate::curve::{CurveId, ID_EC_PUBLIC_KEY};
use crate::error::{EcdhError, EncodingCause};
use crate::keypair::PublicKey;
use der::pem::LineEnding;
use spki::{EncodePublicKey, SubjectPublicKeyInfoRef};
use std::fmt;
use tracing::{debug, warn};

const PEM_LABEL: &str = "PUBLIC KEY";

const UNCOMPRESSED_TAG: u8 = 0x04;

/// DER bytes of a SubjectPublicKeyInfo.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncodedPublicKey(Vec<u8>);

impl EncodedPublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl AsRef<[u8]> for EncodedPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for EncodedPublicKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for EncodedPublicKey {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for EncodedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncodedPublicKey").field(&self.to_hex()).finish()
    }
}

/// Encodes and decodes public keys bound to one expected curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicKeyCodec {
    curve: CurveId,
}

impl PublicKeyCodec {
    pub fn new(curve: CurveId) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> CurveId {
        self.curve
    }

    pub fn encode(&self, public: &PublicKey) -> Result<EncodedPublicKey, EcdhError> {
        if public.curve() != self.curve {
            return Err(EcdhError::CurveMismatch {
                local: self.curve,
                remote: public.curve(),
            });
        }
        let document = match public {
            PublicKey::P256(key) => key.to_public_key_der(),
            PublicKey::P384(key) => key.to_public_key_der(),
        }
        .map_err(EncodingCause::Serialize)?;
        debug!(curve = %self.curve, len = document.as_bytes().len(), "encoded public key");
        Ok(EncodedPublicKey(document.into_vec()))
    }

    /// Parses a SubjectPublicKeyInfo and validates the point against the expected curve.
    ///
    /// Trailing bytes, a different curve, compressed or hybrid points and
    /// points that do not satisfy the curve equation are all rejected.
    pub fn decode(&self, encoded: impl AsRef<[u8]>) -> Result<PublicKey, EcdhError> {
        self.decode_der(encoded.as_ref()).map_err(|cause| {
            warn!(curve = %self.curve, %cause, "rejected encoded public key");
            EcdhError::InvalidEncoding(cause)
        })
    }

    fn decode_der(&self, bytes: &[u8]) -> Result<PublicKey, EncodingCause> {
        let spki = SubjectPublicKeyInfoRef::try_from(bytes).map_err(EncodingCause::Malformed)?;

        if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
            return Err(EncodingCause::UnexpectedAlgorithm(spki.algorithm.oid));
        }
        let curve_oid = spki
            .algorithm
            .parameters_oid()
            .map_err(|_| EncodingCause::MissingCurve)?;
        if curve_oid != self.curve.oid() {
            return Err(EncodingCause::UnexpectedCurve {
                expected: self.curve,
                found: curve_oid,
            });
        }

        let point = spki
            .subject_public_key
            .as_bytes()
            .ok_or(EncodingCause::UnsupportedPointForm)?;
        if point.len() != self.curve.uncompressed_point_size()
            || point.first() != Some(&UNCOMPRESSED_TAG)
        {
            return Err(EncodingCause::UnsupportedPointForm);
        }

        let public = match self.curve {
            CurveId::Prime256v1 => p256::PublicKey::from_sec1_bytes(point).map(PublicKey::P256),
            CurveId::Secp384r1 => p384::PublicKey::from_sec1_bytes(point).map(PublicKey::P384),
        }
        .map_err(|_| EncodingCause::PointNotOnCurve)?;

        debug!(curve = %self.curve, len = bytes.len(), "decoded public key");
        Ok(public)
    }

    pub fn encode_pem(&self, public: &PublicKey) -> Result<String, EcdhError> {
        let encoded = self.encode(public)?;
        der::pem::encode_string(PEM_LABEL, LineEnding::LF, encoded.as_bytes())
            .map_err(|err| EncodingCause::Serialize(pem_error(err)).into())
    }

    pub fn decode_pem(&self, pem: &str) -> Result<PublicKey, EcdhError> {
        let (label, bytes) = der::pem::decode_vec(pem.as_bytes())
            .map_err(|err| EncodingCause::Malformed(pem_error(err)))?;
        if label != PEM_LABEL {
            return Err(EncodingCause::UnexpectedPemLabel(label.to_owned()).into());
        }
        self.decode(bytes)
    }
}

fn pem_error(err: der::pem::Error) -> spki::Error {
    spki::Error::Asn1(err.into())
}
