//! Fundamental types for the Agora governance subsystem.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: account identifiers, proposal ids, timestamps, and the exact
//! rational type used for quorum/threshold arithmetic.

pub mod address;
pub mod id;
pub mod ratio;
pub mod time;

pub use address::AccountId;
pub use id::ProposalId;
pub use ratio::{Ratio, RatioError};
pub use time::Timestamp;
