//! Metadata storage trait.

use crate::StoreError;

/// Trait for storing database metadata (schema version, the governance
/// parameters record, the proposal id sequence).
///
/// This is a generic key-value store for internal bookkeeping that doesn't
/// belong in any domain-specific store.
pub trait MetaStore: Send + Sync {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value. `None` if absent.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete a metadata entry.
    fn delete_meta(&self, key: &str) -> Result<(), StoreError>;

    /// Get the current database schema version (convenience wrapper).
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    /// Set the database schema version (convenience wrapper).
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}

/// Meta key of the single governance parameters record.
pub const PARAMS_META_KEY: &str = "gov_params";

/// Meta key of the proposal id sequence (next id to assign).
pub const NEXT_ID_META_KEY: &str = "gov_next_proposal_id";
