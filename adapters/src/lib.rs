//! Adapter port — the uniform boundary between the governance core and the
//! rest of the node.
//!
//! The core consumes these traits and nothing else: the validator set for
//! electorate snapshots, the transactional state adapter for every monetary
//! or parameter mutation, the upgrade scheduler for software-upgrade
//! proposals, and a pinned clock/height pair from the host. Concrete
//! implementations live in the node (production) and in `agora-nullables`
//! (deterministic tests).

pub mod error;
pub mod state;
pub mod time;
pub mod upgrade;
pub mod validator;

pub use error::AdapterError;
pub use state::{StateAdapter, StateTx};
pub use time::{Clock, HeightSource};
pub use upgrade::UpgradeScheduler;
pub use validator::{Validator, ValidatorSetAdapter};
