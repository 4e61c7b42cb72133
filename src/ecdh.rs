use crate::KeyExchange;
use crate::error::EcdhError;
use crate::kdf::{KdfDigest, KekAlgorithm, X942Kdf};
use crate::keypair::{KeyPair, PrivateKey, PublicKey};
use elliptic_curve::{CurveArithmetic, SecretKey};
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

pub const DEFAULT_OUTPUT_LENGTH: usize = 30;

/// Whether the ECDH x-coordinate keeps its fixed field width before the KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Padding {
    /// Left-padded with zeros to the field size.
    #[default]
    On,
    /// Leading zero bytes stripped.
    Off,
}

/// Parameters of the key-derivation step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeriveParams {
    pub output_length: usize,
    pub padding: Padding,
    pub digest: KdfDigest,
    pub kek: KekAlgorithm,
    pub ukm: Option<Vec<u8>>,
}

impl Default for DeriveParams {
    fn default() -> Self {
        Self {
            output_length: DEFAULT_OUTPUT_LENGTH,
            padding: Padding::default(),
            digest: KdfDigest::default(),
            kek: KekAlgorithm::default(),
            ukm: None,
        }
    }
}

impl DeriveParams {
    pub fn with_output_length(mut self, output_length: usize) -> Self {
        self.output_length = output_length;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_digest(mut self, digest: KdfDigest) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_kek(mut self, kek: KekAlgorithm) -> Self {
        self.kek = kek;
        self
    }

    pub fn with_ukm(mut self, ukm: impl Into<Vec<u8>>) -> Self {
        self.ukm = Some(ukm.into());
        self
    }

    pub fn kdf(&self) -> X942Kdf {
        X942Kdf::new(self.digest, self.kek)
    }
}

/// Secret bytes agreed by both parties. Zeroized on drop, compared in constant time.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl ConstantTimeEq for SharedSecret {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.as_bytes().ct_eq(other.as_bytes())
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Computes the ECDH shared point of `local` and `remote` and runs its
/// x-coordinate through the X9.42 KDF.
///
/// Deterministic: the same keys and parameters always give the same bytes.
pub fn derive(
    local: &PrivateKey,
    remote: &PublicKey,
    params: &DeriveParams,
) -> Result<SharedSecret, EcdhError> {
    let shared_x = derive_raw(local, remote)?;
    let zz = match params.padding {
        Padding::On => shared_x.as_bytes(),
        Padding::Off => strip_leading_zeros(shared_x.as_bytes()),
    };
    let okm = params
        .kdf()
        .derive(zz, params.ukm.as_deref(), params.output_length)?;
    debug!(
        curve = %local.curve(),
        output_length = params.output_length,
        padding = ?params.padding,
        "derived shared secret"
    );
    Ok(SharedSecret(okm))
}

/// The x-coordinate of the shared point, without any post-processing.
pub fn derive_raw(local: &PrivateKey, remote: &PublicKey) -> Result<SharedSecret, EcdhError> {
    let shared_x = match (local, remote) {
        (PrivateKey::P256(secret), PublicKey::P256(public)) => shared_x_coordinate(secret, public),
        (PrivateKey::P384(secret), PublicKey::P384(public)) => shared_x_coordinate(secret, public),
        _ => {
            return Err(EcdhError::CurveMismatch {
                local: local.curve(),
                remote: remote.curve(),
            });
        }
    };
    Ok(SharedSecret(shared_x))
}

fn shared_x_coordinate<C>(
    secret: &SecretKey<C>,
    public: &elliptic_curve::PublicKey<C>,
) -> Zeroizing<Vec<u8>>
where
    C: CurveArithmetic,
{
    let shared =
        elliptic_curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Zeroizing::new(shared.raw_secret_bytes().to_vec())
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

impl KeyExchange for PrivateKey {
    type Error = EcdhError;

    fn key_exchange(
        &self,
        peer: &PublicKey,
        params: &DeriveParams,
    ) -> Result<SharedSecret, EcdhError> {
        derive(self, peer, params)
    }
}

impl KeyExchange for KeyPair {
    type Error = EcdhError;

    fn key_exchange(
        &self,
        peer: &PublicKey,
        params: &DeriveParams,
    ) -> Result<SharedSecret, EcdhError> {
        derive(self.private_key(), peer, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveId;
    use crate::error::DerivationCause;
    use crate::keypair::KeyPairGenerator;
    use hex_literal::hex;

    const P256_A: [u8; 32] = hex!("c88f01f510d9ac3f70a292daa2316de544e9aab8afe84049c62a9c57862d1433");
    const P256_B: [u8; 32] = hex!("c6ef9c5d78ae012a011164acb397ce2088685d8f06bf9be0b283ab46476bee53");

    fn p256_pair(secret: &[u8]) -> Result<KeyPair, EcdhError> {
        KeyPair::from_secret_bytes(CurveId::Prime256v1, secret)
    }

    #[test]
    fn symmetric_on_every_curve() -> Result<(), EcdhError> {
        let params = DeriveParams::default();
        for curve in CurveId::ALL {
            let generator = KeyPairGenerator::new(curve);
            let alice = generator.generate()?;
            let bob = generator.generate()?;
            let by_alice = alice.key_exchange(bob.public_key(), &params)?;
            let by_bob = bob.key_exchange(alice.public_key(), &params)?;
            assert_eq!(by_alice, by_bob);
            assert_eq!(by_alice.len(), DEFAULT_OUTPUT_LENGTH);
        }
        Ok(())
    }

    #[test]
    fn deterministic() -> Result<(), EcdhError> {
        let alice = p256_pair(&P256_A)?;
        let bob = p256_pair(&P256_B)?;
        let params = DeriveParams::default();
        let first = derive(alice.private_key(), bob.public_key(), &params)?;
        let second = derive(alice.private_key(), bob.public_key(), &params)?;
        assert_eq!(first, second);
        Ok(())
    }

    // Shared x-coordinate from an independent ECDH implementation, KDF output from OpenSSL.
    #[test]
    fn p256_known_answer() -> Result<(), EcdhError> {
        let alice = p256_pair(&P256_A)?;
        let bob = p256_pair(&P256_B)?;
        assert_eq!(
            derive_raw(alice.private_key(), bob.public_key())?.as_bytes(),
            hex!("d6840f6b42f6edafd13116e0e12565202fef8e9ece7dce03812464d04b9442de")
        );
        let secret = derive(alice.private_key(), bob.public_key(), &DeriveParams::default())?;
        assert_eq!(
            secret.as_bytes(),
            hex!("4fb7a6d8f3a3b7647fb03db0ccfca68f843d27fd159221900aba34676af0")
        );
        Ok(())
    }

    #[test]
    fn p384_known_answer() -> Result<(), EcdhError> {
        let alice = KeyPair::from_secret_bytes(
            CurveId::Secp384r1,
            &hex!("c88f01f510d9ac3f70a292daa2316de544e9aab8afe84049c62a9c57862d143377777777777777777777777777777777"),
        )?;
        let bob = KeyPair::from_secret_bytes(
            CurveId::Secp384r1,
            &hex!("c6ef9c5d78ae012a011164acb397ce2088685d8f06bf9be0b283ab46476bee5333333333333333333333333333333333"),
        )?;
        assert_eq!(
            derive_raw(bob.private_key(), alice.public_key())?.as_bytes(),
            hex!("3e9e240cf62918f47beb92e7bc4595046f51e57db1dd4b76af8de49694c1d7240dc0027d042a4bc05807cc4460d16c58")
        );
        let secret = derive(alice.private_key(), bob.public_key(), &DeriveParams::default())?;
        assert_eq!(
            secret.as_bytes(),
            hex!("f7889cb6284ca0ec3019562484b5f4ad215308ac30159a3f1d50746fd5f7")
        );
        Ok(())
    }

    #[test]
    fn sixteen_byte_output_is_prefix_of_thirty() -> Result<(), EcdhError> {
        let alice = p256_pair(&P256_A)?;
        let bob = p256_pair(&P256_B)?;
        let short = derive(
            alice.private_key(),
            bob.public_key(),
            &DeriveParams::default().with_output_length(16),
        )?;
        assert_eq!(short.as_bytes(), hex!("4fb7a6d8f3a3b7647fb03db0ccfca68f"));
        let long = derive(bob.private_key(), alice.public_key(), &DeriveParams::default())?;
        assert_eq!(short.as_bytes(), &long.as_bytes()[..16]);
        Ok(())
    }

    #[test]
    fn padding_changes_output_when_x_has_leading_zero() -> Result<(), EcdhError> {
        let alice = p256_pair(&P256_A)?;
        let mut scalar = [0u8; 32];
        scalar[30..].copy_from_slice(&[0x01, 0x37]);
        let bob = p256_pair(&scalar)?;

        let raw = derive_raw(alice.private_key(), bob.public_key())?;
        assert_eq!(
            raw.as_bytes(),
            hex!("0046ca4f92457c842b7992451c88fe61e833773a46384393b8346a280b2358aa")
        );

        let padded = derive(alice.private_key(), bob.public_key(), &DeriveParams::default())?;
        assert_eq!(
            padded.as_bytes(),
            hex!("532330e3569a870022922ca64a3a71a5063e9982a2bc4c566d983c1f7a47")
        );
        let unpadded = derive(
            alice.private_key(),
            bob.public_key(),
            &DeriveParams::default().with_padding(Padding::Off),
        )?;
        assert_eq!(
            unpadded.as_bytes(),
            hex!("d79ca0d42260b6b7004d9f30acbbd28040fe3eb0dc170e7f91d5b64a1cb2")
        );
        Ok(())
    }

    #[test]
    fn curve_mismatch() -> Result<(), EcdhError> {
        let p256 = KeyPairGenerator::new(CurveId::Prime256v1).generate()?;
        let p384 = KeyPairGenerator::new(CurveId::Secp384r1).generate()?;
        let params = DeriveParams::default();
        assert!(matches!(
            derive(p256.private_key(), p384.public_key(), &params),
            Err(EcdhError::CurveMismatch {
                local: CurveId::Prime256v1,
                remote: CurveId::Secp384r1,
            })
        ));
        assert!(matches!(
            p384.key_exchange(p256.public_key(), &params),
            Err(EcdhError::CurveMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn unsupported_output_length() -> Result<(), EcdhError> {
        let alice = p256_pair(&P256_A)?;
        let bob = p256_pair(&P256_B)?;
        for length in [0, 255 * 32 + 1] {
            assert!(matches!(
                derive(
                    alice.private_key(),
                    bob.public_key(),
                    &DeriveParams::default().with_output_length(length),
                ),
                Err(EcdhError::Derivation(DerivationCause::UnsupportedOutputLength { .. }))
            ));
        }
        Ok(())
    }

    #[test]
    fn ukm_and_digest_are_honoured() -> Result<(), EcdhError> {
        let alice = p256_pair(&P256_A)?;
        let bob = p256_pair(&P256_B)?;
        let base = derive(alice.private_key(), bob.public_key(), &DeriveParams::default())?;
        let with_ukm = derive(
            alice.private_key(),
            bob.public_key(),
            &DeriveParams::default().with_ukm(b"session-1".to_vec()),
        )?;
        let with_sha512 = derive(
            alice.private_key(),
            bob.public_key(),
            &DeriveParams::default().with_digest(KdfDigest::Sha512),
        )?;
        assert_ne!(base, with_ukm);
        assert_ne!(base, with_sha512);
        Ok(())
    }

    #[test]
    fn debug_output_hides_secret() -> Result<(), EcdhError> {
        let alice = p256_pair(&P256_A)?;
        let bob = p256_pair(&P256_B)?;
        let secret = derive(alice.private_key(), bob.public_key(), &DeriveParams::default())?;
        let rendered = format!("{secret:?}");
        assert!(rendered.contains("len: 30"));
        assert!(!rendered.contains(&secret.to_hex()));
        Ok(())
    }

    #[test]
    fn strips_only_leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 0]), [1, 0]);
        assert_eq!(strip_leading_zeros(&[1, 2]), [1, 2]);
        assert!(strip_leading_zeros(&[0, 0]).is_empty());
    }
}
