use agora_types::AccountId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("insufficient funds in {account}: have {available}, need {needed}")]
    InsufficientFunds {
        account: AccountId,
        needed: u128,
        available: u128,
    },

    #[error("unknown parameter {subspace}/{key}")]
    UnknownParameter { subspace: String, key: String },

    #[error("upgrade {0} already scheduled")]
    UpgradeExists(String),

    #[error("no scheduled upgrade named {0}")]
    UpgradeNotFound(String),

    #[error("adapter backend error: {0}")]
    Backend(String),
}
