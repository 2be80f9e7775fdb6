//! In-memory governance store — thread-safe, ordered, for testing and
//! embedding without a disk backend.

use agora_store::{GovernanceStore, MetaStore, StoreError};
use agora_types::{AccountId, ProposalId};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-memory implementation of the governance storage traits.
///
/// BTreeMaps keep key order identical to the LMDB backend, so index scans
/// yield proposals in ascending id here too.
pub struct MemoryGovernanceStore {
    proposals: Mutex<BTreeMap<u64, Vec<u8>>>,
    votes: Mutex<BTreeMap<u64, BTreeMap<AccountId, Vec<u8>>>>,
    deposits: Mutex<BTreeMap<u64, BTreeMap<AccountId, Vec<u8>>>>,
    status_index: Mutex<BTreeMap<(u8, u64), ()>>,
    meta: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryGovernanceStore {
    pub fn new() -> Self {
        Self {
            proposals: Mutex::new(BTreeMap::new()),
            votes: Mutex::new(BTreeMap::new()),
            deposits: Mutex::new(BTreeMap::new()),
            status_index: Mutex::new(BTreeMap::new()),
            meta: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryGovernanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GovernanceStore for MemoryGovernanceStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        self.proposals
            .lock()
            .unwrap()
            .insert(id.raw(), data.to_vec());
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError> {
        self.proposals
            .lock()
            .unwrap()
            .get(&id.raw())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("proposal {id}")))
    }

    fn delete_proposal(&self, id: ProposalId) -> Result<(), StoreError> {
        self.proposals.lock().unwrap().remove(&id.raw());
        self.votes.lock().unwrap().remove(&id.raw());
        self.deposits.lock().unwrap().remove(&id.raw());
        Ok(())
    }

    fn list_proposals(&self) -> Result<Vec<ProposalId>, StoreError> {
        Ok(self
            .proposals
            .lock()
            .unwrap()
            .keys()
            .map(|raw| ProposalId::new(*raw))
            .collect())
    }

    fn put_vote(&self, id: ProposalId, voter: &AccountId, data: &[u8]) -> Result<(), StoreError> {
        self.votes
            .lock()
            .unwrap()
            .entry(id.raw())
            .or_default()
            .insert(*voter, data.to_vec());
        Ok(())
    }

    fn iter_votes(&self, id: ProposalId) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .get(&id.raw())
            .map(|m| m.iter().map(|(k, v)| (*k, v.clone())).collect())
            .unwrap_or_default())
    }

    fn put_deposit(
        &self,
        id: ProposalId,
        depositor: &AccountId,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.deposits
            .lock()
            .unwrap()
            .entry(id.raw())
            .or_default()
            .insert(*depositor, data.to_vec());
        Ok(())
    }

    fn iter_deposits(&self, id: ProposalId) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        Ok(self
            .deposits
            .lock()
            .unwrap()
            .get(&id.raw())
            .map(|m| m.iter().map(|(k, v)| (*k, v.clone())).collect())
            .unwrap_or_default())
    }

    fn put_status_index(&self, status_tag: u8, id: ProposalId) -> Result<(), StoreError> {
        self.status_index
            .lock()
            .unwrap()
            .insert((status_tag, id.raw()), ());
        Ok(())
    }

    fn delete_status_index(&self, status_tag: u8, id: ProposalId) -> Result<(), StoreError> {
        self.status_index
            .lock()
            .unwrap()
            .remove(&(status_tag, id.raw()));
        Ok(())
    }

    fn iter_status(&self, status_tag: u8) -> Result<Vec<ProposalId>, StoreError> {
        Ok(self
            .status_index
            .lock()
            .unwrap()
            .range((status_tag, 0)..=(status_tag, u64::MAX))
            .map(|((_, raw), _)| ProposalId::new(*raw))
            .collect())
    }
}

impl MetaStore for MemoryGovernanceStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.meta.lock().unwrap().remove(key);
        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta("schema_version")? {
            Some(bytes) if bytes.len() == 4 => {
                let arr: [u8; 4] = bytes.try_into().expect("checked length");
                Ok(u32::from_le_bytes(arr))
            }
            Some(_) => Err(StoreError::Corruption(
                "schema_version has unexpected byte length".to_string(),
            )),
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta("schema_version", &version.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> AccountId {
        AccountId::new([n; 20])
    }

    #[test]
    fn test_proposal_roundtrip() {
        let store = MemoryGovernanceStore::new();
        let id = ProposalId::new(1);
        store.put_proposal(id, b"record").unwrap();
        assert_eq!(store.get_proposal(id).unwrap(), b"record");
        assert!(store.get_proposal(ProposalId::new(2)).is_err());
    }

    #[test]
    fn test_vote_overwrite_is_last_write_wins() {
        let store = MemoryGovernanceStore::new();
        let id = ProposalId::new(1);
        store.put_vote(id, &addr(1), b"yes").unwrap();
        store.put_vote(id, &addr(1), b"no").unwrap();
        let votes = store.iter_votes(id).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].1, b"no");
    }

    #[test]
    fn test_status_index_orders_by_id() {
        let store = MemoryGovernanceStore::new();
        store.put_status_index(1, ProposalId::new(30)).unwrap();
        store.put_status_index(1, ProposalId::new(2)).unwrap();
        store.put_status_index(0, ProposalId::new(7)).unwrap();
        let bucket = store.iter_status(1).unwrap();
        assert_eq!(bucket, vec![ProposalId::new(2), ProposalId::new(30)]);
    }

    #[test]
    fn test_delete_proposal_cascades() {
        let store = MemoryGovernanceStore::new();
        let id = ProposalId::new(1);
        store.put_proposal(id, b"p").unwrap();
        store.put_vote(id, &addr(1), b"v").unwrap();
        store.put_deposit(id, &addr(1), b"d").unwrap();
        store.delete_proposal(id).unwrap();
        assert!(store.get_proposal(id).is_err());
        assert!(store.iter_votes(id).unwrap().is_empty());
        assert!(store.iter_deposits(id).unwrap().is_empty());
    }

    #[test]
    fn test_schema_version_roundtrip() {
        let store = MemoryGovernanceStore::new();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }
}
