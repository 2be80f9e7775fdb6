//! Nullable clock and height source — deterministic time for testing.

use agora_adapters::{Clock, HeightSource};
use agora_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic clock. Time only advances when you tell it to.
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_secs),
        }
    }

    /// Advance time by a number of seconds.
    pub fn advance(&self, secs: u64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, secs: u64) {
        self.current.store(secs, Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.load(Ordering::SeqCst))
    }
}

/// A deterministic block-height source.
pub struct NullHeightSource {
    current: AtomicU64,
}

impl NullHeightSource {
    pub fn new(initial: u64) -> Self {
        Self {
            current: AtomicU64::new(initial),
        }
    }

    /// Advance the height by `blocks`.
    pub fn advance(&self, blocks: u64) {
        self.current.fetch_add(blocks, Ordering::SeqCst);
    }

    pub fn set(&self, height: u64) {
        self.current.store(height, Ordering::SeqCst);
    }
}

impl HeightSource for NullHeightSource {
    fn height(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}
