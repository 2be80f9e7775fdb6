use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        Self::Heed(e.to_string())
    }
}

impl From<LmdbError> for agora_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(what) => agora_store::StoreError::NotFound(what),
            LmdbError::MalformedKey(what) => agora_store::StoreError::Corruption(what),
            other => agora_store::StoreError::Backend(other.to_string()),
        }
    }
}
