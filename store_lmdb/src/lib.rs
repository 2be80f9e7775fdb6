//! LMDB storage backend for the Agora governance subsystem.
//!
//! Implements the storage traits from `agora-store` using the `heed` LMDB
//! bindings. Each record family maps to one named database within a single
//! environment; composite keys are big-endian so LMDB's lexicographic key
//! order equals ascending proposal id.

pub mod environment;
pub mod error;
pub mod governance;
pub mod meta;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use governance::LmdbGovernanceStore;
pub use meta::LmdbMetaStore;
