//! Upgrade scheduler adapter.

use crate::AdapterError;

/// Registers binary upgrades for the node to perform at a target height.
///
/// The governance core only registers and cancels; the actual binary swap
/// is the node's concern.
pub trait UpgradeScheduler: Send + Sync {
    /// Register an upgrade to activate at `height`.
    fn schedule(&self, name: &str, height: u64, info: &str) -> Result<(), AdapterError>;

    /// Cancel a previously scheduled upgrade.
    fn cancel(&self, name: &str) -> Result<(), AdapterError>;
}
