//! Clock and height sources.
//!
//! The core never reads the system clock or counts blocks itself; the host
//! pins a consistent `(now, height)` pair per block and hands it down
//! through these traits.

use agora_types::Timestamp;

/// Monotone wall-clock source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Monotone block-height source.
pub trait HeightSource: Send + Sync {
    fn height(&self) -> u64;
}
