//! Backend-level persistence tests: key ordering, prefix isolation, and
//! cascade deletes against a real LMDB environment.

use std::sync::Arc;

use agora_store::{GovernanceStore, MetaStore};
use agora_store_lmdb::{LmdbEnvironment, LmdbGovernanceStore, LmdbMetaStore};
use agora_types::{AccountId, ProposalId};

fn temp_env() -> (tempfile::TempDir, Arc<LmdbEnvironment>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 8, 16 * 1024 * 1024).expect("open env");
    (dir, Arc::new(env))
}

fn addr(n: u8) -> AccountId {
    AccountId::new([n; 20])
}

#[test]
fn proposal_write_read_roundtrip() {
    let (_dir, env) = temp_env();
    let store = LmdbGovernanceStore::new(env);
    let id = ProposalId::new(1);

    store.put_proposal(id, b"record-bytes").unwrap();
    assert_eq!(store.get_proposal(id).unwrap(), b"record-bytes");
    assert!(store.get_proposal(ProposalId::new(2)).is_err());
}

#[test]
fn proposals_list_in_ascending_id_order() {
    let (_dir, env) = temp_env();
    let store = LmdbGovernanceStore::new(env);

    // Insert out of order; big-endian keys must sort them.
    for raw in [300u64, 2, 1000, 45] {
        store.put_proposal(ProposalId::new(raw), b"p").unwrap();
    }
    let ids: Vec<u64> = store
        .list_proposals()
        .unwrap()
        .into_iter()
        .map(|id| id.raw())
        .collect();
    assert_eq!(ids, vec![2, 45, 300, 1000]);
}

#[test]
fn votes_are_scoped_to_their_proposal() {
    let (_dir, env) = temp_env();
    let store = LmdbGovernanceStore::new(env);
    let a = ProposalId::new(1);
    let b = ProposalId::new(2);

    store.put_vote(a, &addr(1), b"vote-a1").unwrap();
    store.put_vote(a, &addr(2), b"vote-a2").unwrap();
    store.put_vote(b, &addr(1), b"vote-b1").unwrap();

    let votes_a = store.iter_votes(a).unwrap();
    assert_eq!(votes_a.len(), 2);
    assert_eq!(votes_a[0], (addr(1), b"vote-a1".to_vec()));
    assert_eq!(votes_a[1], (addr(2), b"vote-a2".to_vec()));

    let votes_b = store.iter_votes(b).unwrap();
    assert_eq!(votes_b, vec![(addr(1), b"vote-b1".to_vec())]);
}

#[test]
fn vote_overwrite_is_last_write_wins() {
    let (_dir, env) = temp_env();
    let store = LmdbGovernanceStore::new(env);
    let id = ProposalId::new(7);

    store.put_vote(id, &addr(1), b"yes").unwrap();
    store.put_vote(id, &addr(1), b"no").unwrap();
    let votes = store.iter_votes(id).unwrap();
    assert_eq!(votes, vec![(addr(1), b"no".to_vec())]);
}

#[test]
fn status_bucket_scans_ascending() {
    let (_dir, env) = temp_env();
    let store = LmdbGovernanceStore::new(env);

    store.put_status_index(1, ProposalId::new(30)).unwrap();
    store.put_status_index(1, ProposalId::new(2)).unwrap();
    store.put_status_index(1, ProposalId::new(500)).unwrap();
    store.put_status_index(0, ProposalId::new(9)).unwrap();

    let bucket: Vec<u64> = store
        .iter_status(1)
        .unwrap()
        .into_iter()
        .map(|id| id.raw())
        .collect();
    assert_eq!(bucket, vec![2, 30, 500]);

    store.delete_status_index(1, ProposalId::new(30)).unwrap();
    let bucket: Vec<u64> = store
        .iter_status(1)
        .unwrap()
        .into_iter()
        .map(|id| id.raw())
        .collect();
    assert_eq!(bucket, vec![2, 500]);
}

#[test]
fn delete_proposal_cascades_to_votes_and_deposits() {
    let (_dir, env) = temp_env();
    let store = LmdbGovernanceStore::new(env);
    let id = ProposalId::new(1);
    let neighbour = ProposalId::new(2);

    store.put_proposal(id, b"p1").unwrap();
    store.put_proposal(neighbour, b"p2").unwrap();
    store.put_vote(id, &addr(1), b"v").unwrap();
    store.put_deposit(id, &addr(1), b"d").unwrap();
    store.put_vote(neighbour, &addr(1), b"kept").unwrap();

    store.delete_proposal(id).unwrap();

    assert!(store.get_proposal(id).is_err());
    assert!(store.iter_votes(id).unwrap().is_empty());
    assert!(store.iter_deposits(id).unwrap().is_empty());
    // The neighbouring proposal's records are untouched.
    assert_eq!(store.get_proposal(neighbour).unwrap(), b"p2");
    assert_eq!(
        store.iter_votes(neighbour).unwrap(),
        vec![(addr(1), b"kept".to_vec())]
    );
}

#[test]
fn meta_roundtrip_and_schema_version() {
    let (_dir, env) = temp_env();
    let meta = LmdbMetaStore::new(env);

    assert_eq!(meta.get_meta("missing").unwrap(), None);
    meta.put_meta("gov_params", b"encoded").unwrap();
    assert_eq!(meta.get_meta("gov_params").unwrap(), Some(b"encoded".to_vec()));
    meta.delete_meta("gov_params").unwrap();
    assert_eq!(meta.get_meta("gov_params").unwrap(), None);

    assert_eq!(meta.get_schema_version().unwrap(), 0);
    meta.set_schema_version(2).unwrap();
    assert_eq!(meta.get_schema_version().unwrap(), 2);
}

#[test]
fn data_survives_environment_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let env = Arc::new(LmdbEnvironment::open(dir.path(), 8, 16 * 1024 * 1024).unwrap());
        let store = LmdbGovernanceStore::new(env);
        store.put_proposal(ProposalId::new(1), b"durable").unwrap();
        store.put_status_index(0, ProposalId::new(1)).unwrap();
    }
    let env = Arc::new(LmdbEnvironment::open(dir.path(), 8, 16 * 1024 * 1024).unwrap());
    let store = LmdbGovernanceStore::new(env);
    assert_eq!(store.get_proposal(ProposalId::new(1)).unwrap(), b"durable");
    assert_eq!(store.iter_status(0).unwrap(), vec![ProposalId::new(1)]);
}
