//! ANSI X9.42 key derivation with ASN.1 `OtherInfo` (RFC 2631, section 2.1.2).
//!
//! Output matches OpenSSL's `X942KDF-ASN1`: each block is
//! `H(ZZ || DER(OtherInfo))` with a 32-bit big-endian block counter starting at 1,
//! and `suppPubInfo` carries the key length of the wrapping algorithm in bits.
//! As a consequence outputs of different lengths for the same inputs share a prefix.

use crate::error::DerivationCause;
use der::asn1::{ObjectIdentifier, OctetStringRef};
use der::{Encode, Sequence};
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::{Zeroize, Zeroizing};

/// Upper bound on the number of digest blocks one derivation may produce.
pub const MAX_OUTPUT_BLOCKS: usize = 255;

/// Hash function driving the KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum KdfDigest {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl KdfDigest {
    pub const fn output_size(self) -> usize {
        match self {
            KdfDigest::Sha256 => 32,
            KdfDigest::Sha384 => 48,
            KdfDigest::Sha512 => 64,
        }
    }
}

/// Key-wrap algorithm named in `KeySpecificInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum KekAlgorithm {
    Aes128Wrap,
    Aes192Wrap,
    #[default]
    Aes256Wrap,
}

impl KekAlgorithm {
    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            KekAlgorithm::Aes128Wrap => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.5"),
            KekAlgorithm::Aes192Wrap => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.25"),
            KekAlgorithm::Aes256Wrap => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.45"),
        }
    }

    pub const fn key_bits(self) -> u32 {
        match self {
            KekAlgorithm::Aes128Wrap => 128,
            KekAlgorithm::Aes192Wrap => 192,
            KekAlgorithm::Aes256Wrap => 256,
        }
    }
}

#[derive(Sequence)]
struct KeySpecificInfo<'a> {
    algorithm: ObjectIdentifier,
    counter: OctetStringRef<'a>,
}

#[derive(Sequence)]
struct OtherInfo<'a> {
    key_info: KeySpecificInfo<'a>,
    #[asn1(context_specific = "0", optional = "true")]
    party_a_info: Option<OctetStringRef<'a>>,
    #[asn1(context_specific = "2")]
    supp_pub_info: OctetStringRef<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct X942Kdf {
    digest: KdfDigest,
    kek: KekAlgorithm,
}

impl X942Kdf {
    pub fn new(digest: KdfDigest, kek: KekAlgorithm) -> Self {
        Self { digest, kek }
    }

    pub fn max_output_len(&self) -> usize {
        self.digest.output_size() * MAX_OUTPUT_BLOCKS
    }

    /// Derives `output_len` bytes from the shared value `zz`.
    ///
    /// `ukm` is optional user keying material, placed in `partyAInfo`.
    pub fn derive(
        &self,
        zz: &[u8],
        ukm: Option<&[u8]>,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, DerivationCause> {
        let max = self.max_output_len();
        if output_len == 0 || output_len > max {
            return Err(DerivationCause::UnsupportedOutputLength {
                requested: output_len,
                max,
            });
        }
        if zz.is_empty() {
            return Err(DerivationCause::EmptySharedSecret);
        }
        match self.digest {
            KdfDigest::Sha256 => expand::<Sha256>(zz, self.kek, ukm, output_len),
            KdfDigest::Sha384 => expand::<Sha384>(zz, self.kek, ukm, output_len),
            KdfDigest::Sha512 => expand::<Sha512>(zz, self.kek, ukm, output_len),
        }
    }
}

fn other_info(kek: KekAlgorithm, counter: u32, ukm: Option<&[u8]>) -> der::Result<Vec<u8>> {
    let counter = counter.to_be_bytes();
    let key_bits = kek.key_bits().to_be_bytes();
    OtherInfo {
        key_info: KeySpecificInfo {
            algorithm: kek.oid(),
            counter: OctetStringRef::new(&counter)?,
        },
        party_a_info: ukm.map(OctetStringRef::new).transpose()?,
        supp_pub_info: OctetStringRef::new(&key_bits)?,
    }
    .to_der()
}

fn expand<D: Digest>(
    zz: &[u8],
    kek: KekAlgorithm,
    ukm: Option<&[u8]>,
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, DerivationCause> {
    let mut output = Zeroizing::new(Vec::with_capacity(output_len));
    let mut counter = 1u32;
    while output.len() < output_len {
        let info = other_info(kek, counter, ukm).map_err(DerivationCause::OtherInfo)?;
        let mut block = D::new().chain_update(zz).chain_update(&info).finalize();
        let take = (output_len - output.len()).min(block.len());
        output.extend_from_slice(&block[..take]);
        let spent: &mut [u8] = &mut block;
        spent.zeroize();
        counter += 1;
    }
    Ok(output)
}
