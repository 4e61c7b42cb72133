//! Ephemeral elliptic-curve Diffie-Hellman over named NIST curves.
//!
//! Public keys travel as DER `SubjectPublicKeyInfo`, and the raw shared
//! x-coordinate is run through the ANSI X9.42 KDF before use.

pub mod codec;
pub mod curve;
pub mod ecdh;
pub mod error;
pub mod exchange;
pub mod kdf;
pub mod keypair;
#[cfg(test)]
mod testkit;

pub use codec::{EncodedPublicKey, PublicKeyCodec};
pub use curve::CurveId;
pub use ecdh::{DEFAULT_OUTPUT_LENGTH, DeriveParams, Padding, SharedSecret};
pub use error::{EcdhError, ExchangeError};
pub use exchange::{
    Exchange, ExchangeConfig, ExchangeOutcome, ExchangeState, Party, Step, run_exchange,
};
pub use keypair::{KeyPair, KeyPairGenerator, PrivateKey, PublicKey};

pub trait KeyExchange {
    type Error;

    fn key_exchange(
        &self,
        peer: &PublicKey,
        params: &DeriveParams,
    ) -> Result<SharedSecret, Self::Error>;
}
