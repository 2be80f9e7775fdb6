//! Abstract storage traits for the Agora governance subsystem.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the workspace depends only on the traits, never on a
//! concrete backend.

pub mod error;
pub mod governance;
pub mod meta;

pub use error::StoreError;
pub use governance::GovernanceStore;
pub use meta::{MetaStore, NEXT_ID_META_KEY, PARAMS_META_KEY};
