//! Nullable validator set.

use agora_adapters::{AdapterError, Validator, ValidatorSetAdapter};
use agora_types::AccountId;
use std::sync::Mutex;

/// An in-memory validator set, fixed until a test mutates it.
pub struct NullValidatorSet {
    validators: Mutex<Vec<Validator>>,
}

impl NullValidatorSet {
    pub fn new(validators: Vec<Validator>) -> Self {
        Self {
            validators: Mutex::new(validators),
        }
    }

    /// Convenience constructor from `(address, stake)` pairs.
    pub fn from_stakes(stakes: &[(AccountId, u128)]) -> Self {
        Self::new(
            stakes
                .iter()
                .map(|(address, stake)| Validator {
                    address: *address,
                    stake: *stake,
                })
                .collect(),
        )
    }

    /// Replace the whole set (models a staking epoch boundary).
    pub fn replace(&self, validators: Vec<Validator>) {
        *self.validators.lock().unwrap() = validators;
    }
}

impl ValidatorSetAdapter for NullValidatorSet {
    fn active_at(&self, _height: u64) -> Result<Vec<Validator>, AdapterError> {
        Ok(self.validators.lock().unwrap().clone())
    }

    fn contains(&self, address: &AccountId) -> bool {
        self.validators
            .lock()
            .unwrap()
            .iter()
            .any(|v| v.address == *address)
    }
}
