//! Process-global instrumented randomness source.
//!
//! The source is a ChaCha20 CSPRNG seeded once from OS entropy. Two
//! instrumentations are provided for observability and testing:
//!
//! - monotonic begin/end counters incremented around each draw, letting
//!   callers detect draws that block on entropy;
//! - at most one *interceptor* that observes every drawn byte block
//!   (testing only). Installing a second interceptor is a hard error;
//!   removal is idempotent.

use once_cell::sync::Lazy;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, OsRng, RngCore, SeedableRng};

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
};

/// Observer of drawn random bytes. Used only for testing.
pub type Interceptor = Box<dyn FnMut(&[u8]) + Send>;

struct GlobalState {
    core: ChaCha20Rng,
    interceptor: Option<Interceptor>,
}

static DRAWS_BEGUN: AtomicU64 = AtomicU64::new(0);
static DRAWS_FINISHED: AtomicU64 = AtomicU64::new(0);

static STATE: Lazy<Mutex<GlobalState>> = Lazy::new(|| {
    let mut seed = [0_u8; 32];
    OsRng.fill_bytes(&mut seed);
    Mutex::new(GlobalState {
        core: ChaCha20Rng::from_seed(seed),
        interceptor: None,
    })
});

fn lock_state() -> MutexGuard<'static, GlobalState> {
    // A panic while holding the lock cannot leave the generator in a
    // partial state, so poisoning is recoverable.
    STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Error returned when installing an interceptor while one is already
/// installed.
#[derive(Debug)]
pub struct InterceptorInstalled;

impl fmt::Display for InterceptorInstalled {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a randomness interceptor is already installed")
    }
}

impl std::error::Error for InterceptorInstalled {}

/// Installs an interceptor observing every drawn byte block.
///
/// # Errors
///
/// Returns an error if an interceptor is already installed.
pub fn install_interceptor(interceptor: Interceptor) -> Result<(), InterceptorInstalled> {
    let mut state = lock_state();
    if state.interceptor.is_some() {
        return Err(InterceptorInstalled);
    }
    state.interceptor = Some(interceptor);
    Ok(())
}

/// Removes the installed interceptor, if any. Idempotent.
pub fn remove_interceptor() {
    lock_state().interceptor = None;
}

/// Returns the `(begun, finished)` draw counters. A persistent gap between
/// the two indicates a draw blocked on the underlying entropy source.
pub fn draw_counters() -> (u64, u64) {
    (
        DRAWS_BEGUN.load(Ordering::SeqCst),
        DRAWS_FINISHED.load(Ordering::SeqCst),
    )
}

/// Handle to the process-global randomness source.
///
/// The handle is a zero-sized value; all state lives in the process-global
/// generator. It implements [`RngCore`] and [`CryptoRng`] and can be
/// passed to any API in this crate expecting an RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl SystemRandom {
    /// Creates a handle to the global source.
    pub fn new() -> Self {
        Self
    }
}

impl RngCore for SystemRandom {
    fn next_u32(&mut self) -> u32 {
        let mut buffer = [0_u8; 4];
        self.fill_bytes(&mut buffer);
        u32::from_be_bytes(buffer)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buffer = [0_u8; 8];
        self.fill_bytes(&mut buffer);
        u64::from_be_bytes(buffer)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        DRAWS_BEGUN.fetch_add(1, Ordering::SeqCst);
        let mut state = lock_state();
        state.core.fill_bytes(dest);
        if let Some(interceptor) = state.interceptor.as_mut() {
            interceptor(dest);
        }
        drop(state);
        DRAWS_FINISHED.fetch_add(1, Ordering::SeqCst);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for SystemRandom {}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn counters_advance_in_step() {
        let (begun_before, finished_before) = draw_counters();
        let mut rng = SystemRandom::new();
        let mut buffer = [0_u8; 16];
        rng.fill_bytes(&mut buffer);
        let (begun_after, finished_after) = draw_counters();
        assert!(begun_after > begun_before);
        assert!(finished_after > finished_before);
    }

    #[test]
    fn draws_are_not_constant() {
        let mut rng = SystemRandom::new();
        assert_ne!(rng.next_u64(), rng.next_u64());
    }

    #[test]
    fn interceptor_lifecycle() {
        // Single test covers the whole lifecycle: the interceptor slot is
        // process-global, so splitting would race with parallel tests.
        remove_interceptor();
        remove_interceptor(); // removal is idempotent

        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        install_interceptor(Box::new(move |bytes| {
            sink.lock().unwrap().push(bytes.to_vec());
        }))
        .unwrap();

        assert!(
            install_interceptor(Box::new(|_| ())).is_err(),
            "second install must be rejected"
        );

        let mut rng = SystemRandom::new();
        let mut buffer = [0_u8; 8];
        rng.fill_bytes(&mut buffer);
        remove_interceptor();

        let observed = observed.lock().unwrap();
        assert!(observed.iter().any(|block| block[..] == buffer[..]));
    }
}
