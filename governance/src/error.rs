use agora_adapters::AdapterError;
use agora_store::StoreError;
use agora_types::{AccountId, ProposalId};
use thiserror::Error;

use crate::proposal::ProposalStatus;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {id} is in {status} and cannot accept this operation")]
    WrongPhase {
        id: ProposalId,
        status: ProposalStatus,
    },

    #[error("deposit window for proposal {0} has closed")]
    DepositWindowClosed(ProposalId),

    #[error("insufficient funds: have {available}, need {needed}")]
    InsufficientFunds { needed: u128, available: u128 },

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("invalid vote option index {0}")]
    InvalidOption(u8),

    #[error("voter {0} is not in the electorate of this proposal")]
    NotEligible(AccountId),

    #[error("tally deadline exceeded")]
    TimedOut,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("state adapter failure: {0}")]
    Adapter(AdapterError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

impl From<AdapterError> for GovernanceError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::InsufficientFunds {
                needed, available, ..
            } => Self::InsufficientFunds { needed, available },
            other => Self::Adapter(other),
        }
    }
}
