use crate::curve::CurveId;
use crate::exchange::{Party, Step};
use der::asn1::ObjectIdentifier;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcdhError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(#[from] KeyGenerationCause),
    #[error("Invalid public key encoding: {0}")]
    InvalidEncoding(#[from] EncodingCause),
    #[error("Curve mismatch: local key is on {local}, remote key is on {remote}.")]
    CurveMismatch { local: CurveId, remote: CurveId },
    #[error("Secret derivation failed: {0}")]
    Derivation(#[from] DerivationCause),
}

#[derive(Debug, Error)]
pub enum KeyGenerationCause {
    #[error("random source failed")]
    RandomSource(#[source] rand_core::Error),
    #[error("no valid {curve} scalar after {attempts} draws")]
    ScalarOutOfRange { curve: CurveId, attempts: usize },
    #[error("imported bytes are not a valid {0} scalar")]
    InvalidScalar(CurveId),
}

#[derive(Debug, Error)]
pub enum EncodingCause {
    #[error("malformed SubjectPublicKeyInfo")]
    Malformed(#[source] spki::Error),
    #[error("algorithm {0} is not id-ecPublicKey")]
    UnexpectedAlgorithm(ObjectIdentifier),
    #[error("missing named curve parameters")]
    MissingCurve,
    #[error("expected curve {expected}, found {found}")]
    UnexpectedCurve {
        expected: CurveId,
        found: ObjectIdentifier,
    },
    #[error("point is not in uncompressed form")]
    UnsupportedPointForm,
    #[error("point is not on the curve")]
    PointNotOnCurve,
    #[error("expected PEM label `PUBLIC KEY`, found `{0}`")]
    UnexpectedPemLabel(String),
    #[error("public key could not be serialized")]
    Serialize(#[source] spki::Error),
}

#[derive(Debug, Error)]
pub enum DerivationCause {
    #[error("output length {requested} is outside 1..={max} bytes")]
    UnsupportedOutputLength { requested: usize, max: usize },
    #[error("shared secret is empty")]
    EmptySharedSecret,
    #[error("KDF input could not be encoded")]
    OtherInfo(#[source] der::Error),
}

/// Failure of one step of a two-party exchange.
#[derive(Debug, Error)]
#[error("{step} failed{}", party_suffix(.party))]
pub struct ExchangeError {
    pub step: Step,
    pub party: Option<Party>,
    #[source]
    pub source: EcdhError,
}

fn party_suffix(party: &Option<Party>) -> String {
    party.map(|p| format!(" for party {p}")).unwrap_or_default()
}

impl ExchangeError {
    pub(crate) fn new(step: Step, party: Option<Party>, source: impl Into<EcdhError>) -> Self {
        Self {
            step,
            party,
            source: source.into(),
        }
    }
}
