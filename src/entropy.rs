//! Randomness for key generation
//!
//! Keys are drawn from the operating system CSPRNG (`getrandom`). The wrapper
//! exists so the source is checked once at start-up instead of failing deep
//! inside a key generation call.

use rand_core::{CryptoRng, OsRng, RngCore};

use crate::error::StoreError;

/// OS-backed random number generator
#[derive(Debug)]
pub struct SystemRng {
    // Zero-sized - all state lives in the kernel
    _private: (),
}

impl SystemRng {
    /// Open the OS random source
    ///
    /// Reads a test value first so a broken source surfaces as
    /// [`StoreError::HardwareUnavailable`] here rather than at keygen time.
    pub fn new() -> Result<Self, StoreError> {
        let mut test = [0u8; 8];
        OsRng
            .try_fill_bytes(&mut test)
            .map_err(|e| StoreError::HardwareUnavailable(format!("OS random source: {e}")))?;

        // All zeros would indicate a dead source
        if test == [0u8; 8] {
            return Err(StoreError::HardwareUnavailable(
                "OS random source sanity check failed - returned all zeros".into(),
            ));
        }

        Ok(Self { _private: () })
    }

    /// Fill a buffer with random bytes
    pub fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

impl RngCore for SystemRng {
    fn next_u32(&mut self) -> u32 {
        OsRng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        OsRng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        SystemRng::fill_bytes(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

impl CryptoRng for SystemRng {}

// Shared references are enough to draw randomness, so a store can hold one
// generator and use it from `&self`
impl RngCore for &SystemRng {
    fn next_u32(&mut self) -> u32 {
        OsRng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        OsRng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        SystemRng::fill_bytes(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

impl CryptoRng for &SystemRng {}
