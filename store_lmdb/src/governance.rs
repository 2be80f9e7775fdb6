//! LMDB implementation of the governance store.
//!
//! Key layout:
//! - `proposals`:  `id (8, BE)`                → proposal record
//! - `votes`:      `id (8, BE) ++ voter (20)`  → vote record
//! - `deposits`:   `id (8, BE) ++ depositor`   → deposit record
//! - `status_idx`: `[tag] ++ id (8, BE)`       → empty
//!
//! Big-endian ids make every prefix scan yield ascending proposal order.

use std::sync::Arc;

use agora_store::{GovernanceStore, StoreError};
use agora_types::{AccountId, ProposalId};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

pub struct LmdbGovernanceStore {
    env: Arc<LmdbEnvironment>,
}

impl LmdbGovernanceStore {
    pub fn new(env: Arc<LmdbEnvironment>) -> Self {
        Self { env }
    }
}

fn sub_key(id: ProposalId, account: &AccountId) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + AccountId::LEN);
    key.extend_from_slice(&id.to_key_bytes());
    key.extend_from_slice(account.as_bytes());
    key
}

fn status_key(status_tag: u8, id: ProposalId) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(status_tag);
    key.extend_from_slice(&id.to_key_bytes());
    key
}

fn parse_sub_key(key: &[u8]) -> Result<AccountId, LmdbError> {
    if key.len() != 8 + AccountId::LEN {
        return Err(LmdbError::MalformedKey(format!(
            "sub-record key of {} bytes",
            key.len()
        )));
    }
    let mut account = [0u8; AccountId::LEN];
    account.copy_from_slice(&key[8..]);
    Ok(AccountId::new(account))
}

impl GovernanceStore for LmdbGovernanceStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        self.env
            .proposals_db
            .put(&mut wtxn, &id.to_key_bytes(), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let val = self
            .env
            .proposals_db
            .get(&rtxn, &id.to_key_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("proposal {id}")))?;
        Ok(val.to_vec())
    }

    fn delete_proposal(&self, id: ProposalId) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        self.env
            .proposals_db
            .delete(&mut wtxn, &id.to_key_bytes())
            .map_err(LmdbError::from)?;
        for db in [&self.env.votes_db, &self.env.deposits_db] {
            let keys: Vec<Vec<u8>> = {
                let iter = db
                    .prefix_iter(&wtxn, &id.to_key_bytes())
                    .map_err(LmdbError::from)?;
                let mut keys = Vec::new();
                for entry in iter {
                    let (key, _) = entry.map_err(LmdbError::from)?;
                    keys.push(key.to_vec());
                }
                keys
            };
            for key in keys {
                db.delete(&mut wtxn, &key).map_err(LmdbError::from)?;
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn list_proposals(&self) -> Result<Vec<ProposalId>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        let iter = self.env.proposals_db.iter(&rtxn).map_err(LmdbError::from)?;
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let bytes: [u8; 8] = key
                .try_into()
                .map_err(|_| LmdbError::MalformedKey(format!("proposal key of {} bytes", key.len())))?;
            ids.push(ProposalId::from_key_bytes(bytes));
        }
        Ok(ids)
    }

    fn put_vote(&self, id: ProposalId, voter: &AccountId, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        self.env
            .votes_db
            .put(&mut wtxn, &sub_key(id, voter), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn iter_votes(&self, id: ProposalId) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let iter = self
            .env
            .votes_db
            .prefix_iter(&rtxn, &id.to_key_bytes())
            .map_err(LmdbError::from)?;
        let mut votes = Vec::new();
        for entry in iter {
            let (key, value) = entry.map_err(LmdbError::from)?;
            votes.push((parse_sub_key(key)?, value.to_vec()));
        }
        Ok(votes)
    }

    fn put_deposit(
        &self,
        id: ProposalId,
        depositor: &AccountId,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        self.env
            .deposits_db
            .put(&mut wtxn, &sub_key(id, depositor), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn iter_deposits(&self, id: ProposalId) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let iter = self
            .env
            .deposits_db
            .prefix_iter(&rtxn, &id.to_key_bytes())
            .map_err(LmdbError::from)?;
        let mut deposits = Vec::new();
        for entry in iter {
            let (key, value) = entry.map_err(LmdbError::from)?;
            deposits.push((parse_sub_key(key)?, value.to_vec()));
        }
        Ok(deposits)
    }

    fn put_status_index(&self, status_tag: u8, id: ProposalId) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        self.env
            .status_db
            .put(&mut wtxn, &status_key(status_tag, id), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_status_index(&self, status_tag: u8, id: ProposalId) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        self.env
            .status_db
            .delete(&mut wtxn, &status_key(status_tag, id))
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn iter_status(&self, status_tag: u8) -> Result<Vec<ProposalId>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let iter = self
            .env
            .status_db
            .prefix_iter(&rtxn, &[status_tag])
            .map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            if key.len() != 9 {
                return Err(LmdbError::MalformedKey(format!(
                    "status key of {} bytes",
                    key.len()
                ))
                .into());
            }
            let bytes: [u8; 8] = key[1..].try_into().expect("checked length");
            ids.push(ProposalId::from_key_bytes(bytes));
        }
        Ok(ids)
    }
}
