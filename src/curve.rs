use der::asn1::ObjectIdentifier;
use std::fmt;

/// `id-ecPublicKey` from RFC 5480, the algorithm of every EC SubjectPublicKeyInfo.
pub const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

pub const PRIME256V1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

pub const SECP384R1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

/// Named curves a key pair can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CurveId {
    /// NIST P-256, a.k.a. secp256r1.
    #[default]
    Prime256v1,
    /// NIST P-384.
    Secp384r1,
}

impl CurveId {
    pub const ALL: [CurveId; 2] = [CurveId::Prime256v1, CurveId::Secp384r1];

    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            CurveId::Prime256v1 => PRIME256V1_OID,
            CurveId::Secp384r1 => SECP384R1_OID,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.oid() == oid)
    }

    /// Size of a field element (and of the ECDH x-coordinate) in bytes.
    pub const fn field_size(self) -> usize {
        match self {
            CurveId::Prime256v1 => 32,
            CurveId::Secp384r1 => 48,
        }
    }

    /// Length of an uncompressed SEC1 point, `0x04 || X || Y`.
    pub const fn uncompressed_point_size(self) -> usize {
        2 * self.field_size() + 1
    }

    pub const fn name(self) -> &'static str {
        match self {
            CurveId::Prime256v1 => "prime256v1",
            CurveId::Secp384r1 => "secp384r1",
        }
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
