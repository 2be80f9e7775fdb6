//! Nullable upgrade scheduler.

use agora_adapters::{AdapterError, UpgradeScheduler};
use std::collections::HashMap;
use std::sync::Mutex;

/// Records scheduled upgrades in memory for inspection by tests.
pub struct NullUpgradeScheduler {
    scheduled: Mutex<HashMap<String, (u64, String)>>,
}

impl NullUpgradeScheduler {
    pub fn new() -> Self {
        Self {
            scheduled: Mutex::new(HashMap::new()),
        }
    }

    /// The `(height, info)` of a scheduled upgrade, if any.
    pub fn scheduled(&self, name: &str) -> Option<(u64, String)> {
        self.scheduled.lock().unwrap().get(name).cloned()
    }
}

impl Default for NullUpgradeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl UpgradeScheduler for NullUpgradeScheduler {
    fn schedule(&self, name: &str, height: u64, info: &str) -> Result<(), AdapterError> {
        let mut scheduled = self.scheduled.lock().unwrap();
        if scheduled.contains_key(name) {
            return Err(AdapterError::UpgradeExists(name.to_string()));
        }
        scheduled.insert(name.to_string(), (height, info.to_string()));
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<(), AdapterError> {
        self.scheduled
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AdapterError::UpgradeNotFound(name.to_string()))
    }
}
