//! Process-wide CSPRNG.
//!
//! The generator is seeded from OS entropy on first use and shared behind a
//! mutex; embedders that need deterministic teardown call [`deinitialize`]
//! once at shutdown. A later call to [`fill_random`] simply re-seeds.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::CryptoError;

static RNG: Mutex<Option<StdRng>> = Mutex::new(None);

/// Fill `out` with cryptographically secure random bytes.
///
/// # Errors
///
/// Fails only when the generator mutex has been poisoned.
pub fn fill_random(out: &mut [u8]) -> Result<(), CryptoError> {
    let mut guard = RNG.lock().map_err(|_| CryptoError::RngUnavailable)?;
    let rng = guard.get_or_insert_with(StdRng::from_entropy);
    rng.fill_bytes(out);
    Ok(())
}

/// Release the process-wide generator.
pub fn deinitialize() {
    if let Ok(mut guard) = RNG.lock() {
        *guard = None;
    }
}
