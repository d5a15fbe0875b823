//! Signing primitives and the rate-limited signing context.
//!
//! `Hash1` models a rate-limited upstream signer: at most one call may be in
//! flight across the whole process. `Hash2` has no concurrency restriction.
//! Both are deterministic and slow.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::semaphore::Semaphore;

/// A pair of deterministic hash primitives.
pub trait Signer: Send + Sync {
    /// Rate-limited primitive. Callers must hold the global rate token.
    fn hash1(&self, data: &str) -> String;

    /// Unrestricted primitive.
    fn hash2(&self, data: &str) -> String;
}

/// Latency settings for [`DataSigner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerConfig {
    pub hash1_latency: Duration,
    pub hash2_latency: Duration,
    /// Extra delay imposed on a `hash1` call that overlaps another one
    pub overheat_penalty: Duration,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            hash1_latency: Duration::from_millis(10),
            hash2_latency: Duration::from_secs(1),
            overheat_penalty: Duration::from_secs(1),
        }
    }
}

impl SignerConfig {
    /// No artificial latency (tests, benchmarks)
    pub const fn instant() -> Self {
        Self {
            hash1_latency: Duration::ZERO,
            hash2_latency: Duration::ZERO,
            overheat_penalty: Duration::ZERO,
        }
    }
}

/// Production signer: blake3 hex for `hash1`, CRC-32 decimal for `hash2`.
///
/// Tracks `hash1` calls in flight. An overlapping call is an overheat: it is
/// counted, logged, and delayed by the configured penalty.
#[derive(Debug, Default)]
pub struct DataSigner {
    config: SignerConfig,
    in_flight: AtomicUsize,
    overheats: AtomicUsize,
}

impl DataSigner {
    pub fn new(config: SignerConfig) -> Self {
        Self {
            config,
            in_flight: AtomicUsize::new(0),
            overheats: AtomicUsize::new(0),
        }
    }

    /// Number of overlapping `hash1` calls observed so far
    pub fn overheats(&self) -> usize {
        self.overheats.load(Ordering::Relaxed)
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}

impl Signer for DataSigner {
    fn hash1(&self, data: &str) -> String {
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst);
        if concurrent > 0 {
            self.overheats.fetch_add(1, Ordering::Relaxed);
            log::warn!("hash1 overheat: {} calls in flight", concurrent + 1);
            pause(self.config.overheat_penalty);
        }
        pause(self.config.hash1_latency);
        let digest = blake3::hash(data.as_bytes()).to_hex().to_string();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        digest
    }

    fn hash2(&self, data: &str) -> String {
        pause(self.config.hash2_latency);
        crc32fast::hash(data.as_bytes()).to_string()
    }
}

/// A signer paired with the global rate token guarding its `hash1`.
///
/// Cloning shares both the signer and the token, so every clone is serialized
/// against every other on `hash1`.
#[derive(Clone)]
pub struct SigningContext {
    signer: Arc<dyn Signer>,
    token: Arc<Semaphore>,
}

impl SigningContext {
    /// Context with a fresh token of its own
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self::with_token(signer, Arc::new(Semaphore::token()))
    }

    /// Context sharing an existing token (e.g. across independent pipelines)
    pub fn with_token(signer: Arc<dyn Signer>, token: Arc<Semaphore>) -> Self {
        Self { signer, token }
    }

    pub fn token(&self) -> &Arc<Semaphore> {
        &self.token
    }

    /// `Hash1` under the rate token. The permit is held for this call only.
    pub fn hash1(&self, data: &str) -> String {
        let _permit = self.token.acquire();
        self.signer.hash1(data)
    }

    pub fn hash2(&self, data: &str) -> String {
        self.signer.hash2(data)
    }
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
