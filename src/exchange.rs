//! Two-party exchange driver.
//!
//! Runs both sides of an unauthenticated ephemeral ECDH exchange in process:
//! generate, encode, hand the encodings over, decode the peer's key, derive.
//! The first failing step aborts the run and no partial outcome is returned.

use crate::KeyExchange;
use crate::codec::{EncodedPublicKey, PublicKeyCodec};
use crate::curve::CurveId;
use crate::ecdh::{DeriveParams, SharedSecret};
use crate::error::ExchangeError;
use crate::keypair::{KeyPair, KeyPairGenerator, PublicKey};
use rand_core::{CryptoRngCore, OsRng};
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    A,
    B,
}

impl Party {
    pub fn peer(self) -> Party {
        match self {
            Party::A => Party::B,
            Party::B => Party::A,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::A => f.write_str("A"),
            Party::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    GenerateKeys,
    EncodeKeys,
    ExchangeKeys,
    DeriveSecrets,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::GenerateKeys => "key generation",
            Step::EncodeKeys => "public key encoding",
            Step::ExchangeKeys => "public key exchange",
            Step::DeriveSecrets => "secret derivation",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    KeysGenerated,
    KeysEncoded,
    KeysExchanged,
    SecretsDerived,
    Done,
    Failed { step: Step, party: Option<Party> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExchangeConfig {
    pub curve: CurveId,
    pub derive: DeriveParams,
}

impl ExchangeConfig {
    pub fn with_curve(mut self, curve: CurveId) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_derive(mut self, derive: DeriveParams) -> Self {
        self.derive = derive;
        self
    }
}

/// What one party sent and what it ended up with.
#[derive(Debug)]
pub struct PartyOutcome {
    pub encoded_public: EncodedPublicKey,
    pub peer_public: PublicKey,
    pub secret: SharedSecret,
}

#[derive(Debug)]
pub struct ExchangeOutcome {
    party_a: PartyOutcome,
    party_b: PartyOutcome,
}

impl ExchangeOutcome {
    pub fn party(&self, party: Party) -> &PartyOutcome {
        match party {
            Party::A => &self.party_a,
            Party::B => &self.party_b,
        }
    }

    pub fn secrets_match(&self) -> bool {
        self.party_a.secret.ct_eq(&self.party_b.secret).into()
    }

    pub fn into_secrets(self) -> (SharedSecret, SharedSecret) {
        (self.party_a.secret, self.party_b.secret)
    }
}

#[derive(Debug)]
pub struct Exchange {
    config: ExchangeConfig,
    state: ExchangeState,
}

impl Exchange {
    pub fn new(config: ExchangeConfig) -> Self {
        Self {
            config,
            state: ExchangeState::Idle,
        }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn run(&mut self) -> Result<ExchangeOutcome, ExchangeError> {
        self.run_with_rng(&mut OsRng)
    }

    pub fn run_with_rng(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<ExchangeOutcome, ExchangeError> {
        self.run_with(rng, |_, encoded| encoded)
    }

    /// Runs a fresh exchange, passing each encoded public key through `transmit`
    /// on its way from the sending party to its peer.
    #[instrument(skip_all, fields(curve = %self.config.curve))]
    pub fn run_with<T>(
        &mut self,
        rng: &mut impl CryptoRngCore,
        transmit: T,
    ) -> Result<ExchangeOutcome, ExchangeError>
    where
        T: FnMut(Party, EncodedPublicKey) -> EncodedPublicKey,
    {
        self.state = ExchangeState::Idle;
        let result = self.drive(rng, transmit);
        match &result {
            Ok(_) => self.advance(ExchangeState::Done),
            Err(err) => {
                warn!(
                    step = %err.step,
                    party = ?err.party,
                    error = %err.source,
                    "exchange aborted"
                );
                self.state = ExchangeState::Failed {
                    step: err.step,
                    party: err.party,
                };
            }
        }
        result
    }

    fn advance(&mut self, next: ExchangeState) {
        debug!(from = ?self.state, to = ?next, "exchange state");
        self.state = next;
    }

    fn drive<T>(
        &mut self,
        rng: &mut impl CryptoRngCore,
        mut transmit: T,
    ) -> Result<ExchangeOutcome, ExchangeError>
    where
        T: FnMut(Party, EncodedPublicKey) -> EncodedPublicKey,
    {
        let curve = self.config.curve;
        let generator = KeyPairGenerator::new(curve);
        let alice = generator
            .generate_with_rng(&mut *rng)
            .map_err(|err| ExchangeError::new(Step::GenerateKeys, Some(Party::A), err))?;
        let bob = generator
            .generate_with_rng(&mut *rng)
            .map_err(|err| ExchangeError::new(Step::GenerateKeys, Some(Party::B), err))?;
        self.advance(ExchangeState::KeysGenerated);

        let codec = PublicKeyCodec::new(curve);
        let encode = |party, pair: &KeyPair| {
            codec
                .encode(pair.public_key())
                .map_err(|err| ExchangeError::new(Step::EncodeKeys, Some(party), err))
        };
        let alice_encoded = encode(Party::A, &alice)?;
        let bob_encoded = encode(Party::B, &bob)?;
        self.advance(ExchangeState::KeysEncoded);

        // Each side only ever sees the bytes its peer sent.
        let decode = |party, received: &EncodedPublicKey| {
            codec
                .decode(received)
                .map_err(|err| ExchangeError::new(Step::ExchangeKeys, Some(party), err))
        };
        let received_by_alice = transmit(Party::B, bob_encoded.clone());
        let received_by_bob = transmit(Party::A, alice_encoded.clone());
        let bob_public = decode(Party::A, &received_by_alice)?;
        let alice_public = decode(Party::B, &received_by_bob)?;
        self.advance(ExchangeState::KeysExchanged);

        let params = &self.config.derive;
        let derive = |party, pair: &KeyPair, peer: &PublicKey| {
            pair.key_exchange(peer, params)
                .map_err(|err| ExchangeError::new(Step::DeriveSecrets, Some(party), err))
        };
        let alice_secret = derive(Party::A, &alice, &bob_public)?;
        let bob_secret = derive(Party::B, &bob, &alice_public)?;
        self.advance(ExchangeState::SecretsDerived);

        Ok(ExchangeOutcome {
            party_a: PartyOutcome {
                encoded_public: alice_encoded,
                peer_public: bob_public,
                secret: alice_secret,
            },
            party_b: PartyOutcome {
                encoded_public: bob_encoded,
                peer_public: alice_public,
                secret: bob_secret,
            },
        })
    }
}

/// Runs one exchange with the operating system's CSPRNG.
pub fn run_exchange(config: &ExchangeConfig) -> Result<ExchangeOutcome, ExchangeError> {
    Exchange::new(config.clone()).run()
}
