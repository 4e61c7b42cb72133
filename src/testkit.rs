//! Deterministic random sources for exercising failure paths.

use rand_core::{CryptoRng, Error, RngCore};

/// An RNG whose every request fails, as when the OS entropy source is unavailable.
pub(crate) struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), Error> {
        Err(Error::new("entropy source unavailable"))
    }
}

impl CryptoRng for FailingRng {}

/// An RNG that only ever yields zero bytes, which is never a valid scalar.
pub(crate) struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        dest.fill(0);
        Ok(())
    }
}

impl CryptoRng for ZeroRng {}

/// Fails once `remaining` successful fills have been handed out.
pub(crate) struct ExhaustingRng<R> {
    pub(crate) inner: R,
    pub(crate) remaining: usize,
}

impl<R: RngCore> RngCore for ExhaustingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        if self.remaining == 0 {
            return Err(Error::new("entropy source exhausted"));
        }
        self.remaining -= 1;
        self.inner.try_fill_bytes(dest)
    }
}

impl<R: CryptoRng> CryptoRng for ExhaustingRng<R> {}
