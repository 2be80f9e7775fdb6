//! Nullable transactional state adapter.
//!
//! Balances and chain parameters live in one mutex-guarded map; a
//! transaction stages absolute values in an overlay and applies them on
//! commit. Reads inside a transaction observe the overlay first
//! (read-your-writes).

use agora_adapters::{AdapterError, StateAdapter, StateTx};
use agora_types::AccountId;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ChainState {
    balances: BTreeMap<AccountId, u128>,
    params: BTreeMap<(String, String), Vec<u8>>,
}

/// An in-memory chain state with transactional semantics.
pub struct NullStateAdapter {
    chain: Arc<Mutex<ChainState>>,
    fail_next_commit: AtomicBool,
}

impl NullStateAdapter {
    pub fn new() -> Self {
        Self {
            chain: Arc::new(Mutex::new(ChainState::default())),
            fail_next_commit: AtomicBool::new(false),
        }
    }

    /// Seed an account balance outside any transaction.
    pub fn set_balance(&self, account: AccountId, amount: u128) {
        self.chain.lock().unwrap().balances.insert(account, amount);
    }

    /// Committed balance of an account (0 if never seen).
    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.chain
            .lock()
            .unwrap()
            .balances
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    /// Committed chain parameter.
    pub fn param_of(&self, subspace: &str, key: &str) -> Option<Vec<u8>> {
        self.chain
            .lock()
            .unwrap()
            .params
            .get(&(subspace.to_string(), key.to_string()))
            .cloned()
    }

    /// Make the next `commit` fail with a backend error. Used by tests to
    /// exercise the rollback-and-retry path.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl Default for NullStateAdapter {
    fn default() -> Self {
        Self::new()
    }
}

struct NullStateTx {
    chain: Arc<Mutex<ChainState>>,
    staged_balances: BTreeMap<AccountId, u128>,
    staged_params: BTreeMap<(String, String), Vec<u8>>,
}

impl NullStateTx {
    fn read_balance(&self, account: &AccountId) -> u128 {
        if let Some(staged) = self.staged_balances.get(account) {
            return *staged;
        }
        self.chain
            .lock()
            .unwrap()
            .balances
            .get(account)
            .copied()
            .unwrap_or(0)
    }
}

impl StateTx for NullStateTx {
    fn balance(&self, address: &AccountId) -> Result<u128, AdapterError> {
        Ok(self.read_balance(address))
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AdapterError> {
        let from_balance = self.read_balance(from);
        if from_balance < amount {
            return Err(AdapterError::InsufficientFunds {
                account: *from,
                needed: amount,
                available: from_balance,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self.read_balance(to);
        self.staged_balances.insert(*from, from_balance - amount);
        self.staged_balances
            .insert(*to, to_balance.saturating_add(amount));
        Ok(())
    }

    fn burn(&mut self, from: &AccountId, amount: u128) -> Result<(), AdapterError> {
        let from_balance = self.read_balance(from);
        if from_balance < amount {
            return Err(AdapterError::InsufficientFunds {
                account: *from,
                needed: amount,
                available: from_balance,
            });
        }
        self.staged_balances.insert(*from, from_balance - amount);
        Ok(())
    }

    fn get_param(&self, subspace: &str, key: &str) -> Result<Option<Vec<u8>>, AdapterError> {
        let lookup = (subspace.to_string(), key.to_string());
        if let Some(staged) = self.staged_params.get(&lookup) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.chain.lock().unwrap().params.get(&lookup).cloned())
    }

    fn set_param(&mut self, subspace: &str, key: &str, value: &[u8]) -> Result<(), AdapterError> {
        self.staged_params
            .insert((subspace.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl StateAdapter for NullStateAdapter {
    fn begin(&self) -> Result<Box<dyn StateTx>, AdapterError> {
        Ok(Box::new(NullStateTx {
            chain: Arc::clone(&self.chain),
            staged_balances: BTreeMap::new(),
            staged_params: BTreeMap::new(),
        }))
    }

    fn commit(&self, tx: Box<dyn StateTx>) -> Result<(), AdapterError> {
        let tx = tx
            .into_any()
            .downcast::<NullStateTx>()
            .map_err(|_| AdapterError::Backend("foreign transaction type".to_string()))?;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(AdapterError::Backend("injected commit failure".to_string()));
        }
        let mut chain = self.chain.lock().unwrap();
        for (account, balance) in tx.staged_balances {
            chain.balances.insert(account, balance);
        }
        for (key, value) in tx.staged_params {
            chain.params.insert(key, value);
        }
        Ok(())
    }

    fn rollback(&self, tx: Box<dyn StateTx>) {
        drop(tx);
    }
}
