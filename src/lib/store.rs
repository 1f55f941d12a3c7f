use std::{fs, path::PathBuf};

use chrono::Utc;
use im::{HashMap, OrdMap, Vector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::types::{
    DocKey, LobbyFilter, Month, PartitionKey, SfaId, StoredTransaction, TransactionWrite,
    UserRecord,
};
use crate::utils::Upsert;

/// Writes the hosted store accepts in one atomic batch.
pub const MAX_BATCH_WRITES: usize = 500;

/// Filter for transaction reads. All present predicates must hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionQuery {
    pub lobby: LobbyFilter,
    pub month: Option<Month>,
    pub year: Option<String>,
    pub sfa_id: Option<SfaId>,
}

impl TransactionQuery {
    pub fn new(lobby: LobbyFilter) -> Self {
        Self {
            lobby,
            month: None,
            year: None,
            sfa_id: None,
        }
    }

    /// Every payment made by `sfa_id`, in any lobby.
    pub fn for_member(sfa_id: SfaId) -> Self {
        Self {
            sfa_id: Some(sfa_id),
            ..Self::new(LobbyFilter::All)
        }
    }

    pub fn in_month(self, month: Month) -> Self {
        Self {
            month: Some(month),
            ..self
        }
    }

    pub fn in_year(self, year: impl Into<String>) -> Self {
        Self {
            year: Some(year.into()),
            ..self
        }
    }

    pub fn in_partition(self, partition: &PartitionKey) -> Self {
        self.in_month(partition.month).in_year(partition.year.clone())
    }

    pub fn matches(&self, tx: &StoredTransaction) -> bool {
        self.lobby.matches(&tx.lobby)
            && self.month.map_or(true, |m| m == tx.month)
            && self.year.as_ref().map_or(true, |y| *y == tx.year)
            && self.sfa_id.as_ref().map_or(true, |id| *id == tx.sfa_id)
    }
}

/// Boundary to the hosted document database.
///
/// Each `commit_*` call is atomic: either every write in the batch lands or
/// the store is left as it was.
pub trait DocumentStore {
    fn commit_transactions(&mut self, writes: Vec<TransactionWrite>) -> Result<(), StoreError>;

    fn commit_users(&mut self, users: Vec<UserRecord>) -> Result<(), StoreError>;

    /// Matching transactions in insertion order.
    fn query_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<StoredTransaction>, StoreError>;

    /// Whether a transaction document already sits at `key` in `partition`.
    fn contains_transaction(
        &self,
        partition: &PartitionKey,
        key: &DocKey,
    ) -> Result<bool, StoreError>;

    /// Users found for `sfa_ids`. Unknown ids are simply absent.
    fn get_users(&self, sfa_ids: &[SfaId]) -> Result<Vec<UserRecord>, StoreError>;

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}

type Address = (PartitionKey, DocKey);

fn check_batch(size: usize) -> Result<(), StoreError> {
    if size > MAX_BATCH_WRITES {
        return Err(StoreError::BatchTooLarge {
            size,
            limit: MAX_BATCH_WRITES,
        });
    }
    Ok(())
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('/') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// In-process store on persistent collections, so a batch is applied to a
/// copy and swapped in only once every write has been accepted.
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    transactions: Vector<(DocKey, StoredTransaction)>,
    positions: HashMap<Address, usize>,
    users: OrdMap<SfaId, UserRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn with_transaction(&self, key: DocKey, transaction: StoredTransaction) -> Self {
        let address = (transaction.partition(), key.clone());
        let (transactions, positions) =
            (self.transactions.clone(), self.positions.clone()).upsert(address, (key, transaction));
        Self {
            transactions,
            positions,
            ..self.clone()
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        let with_txs = snapshot
            .transactions
            .into_iter()
            .fold(Self::default(), |acc, entry| {
                acc.with_transaction(entry.key, entry.transaction)
            });
        Self {
            users: snapshot
                .users
                .into_iter()
                .map(|u| (u.sfa_id.clone(), u))
                .collect(),
            ..with_txs
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            transactions: self
                .transactions
                .iter()
                .map(|(key, transaction)| SnapshotEntry {
                    key: key.clone(),
                    transaction: transaction.clone(),
                })
                .collect(),
            users: self.users.values().cloned().collect(),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn commit_transactions(&mut self, writes: Vec<TransactionWrite>) -> Result<(), StoreError> {
        check_batch(writes.len())?;
        for write in &writes {
            check_key(write.key.value())?;
        }

        let created_at = Utc::now();
        let size = writes.len();
        *self = writes.into_iter().fold(self.clone(), |acc, write| {
            let transaction = StoredTransaction {
                created_at: Some(created_at),
                ..write.transaction
            };
            acc.with_transaction(write.key, transaction)
        });
        debug!(size, total = self.transactions.len(), "committed transaction batch");
        Ok(())
    }

    fn commit_users(&mut self, users: Vec<UserRecord>) -> Result<(), StoreError> {
        check_batch(users.len())?;
        for user in &users {
            check_key(user.sfa_id.value())?;
        }

        let size = users.len();
        self.users = users
            .into_iter()
            .fold(self.users.clone(), |acc, user| acc.update(user.sfa_id.clone(), user));
        debug!(size, total = self.users.len(), "committed user batch");
        Ok(())
    }

    fn query_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<StoredTransaction>, StoreError> {
        Ok(self
            .transactions
            .iter()
            .filter(|(_, tx)| query.matches(tx))
            .map(|(_, tx)| tx.clone())
            .collect())
    }

    fn contains_transaction(
        &self,
        partition: &PartitionKey,
        key: &DocKey,
    ) -> Result<bool, StoreError> {
        Ok(self
            .positions
            .contains_key(&(partition.clone(), key.clone())))
    }

    fn get_users(&self, sfa_ids: &[SfaId]) -> Result<Vec<UserRecord>, StoreError> {
        Ok(sfa_ids
            .iter()
            .filter_map(|id| self.users.get(id).cloned())
            .collect())
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.users.values().cloned().collect())
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    key: DocKey,
    #[serde(flatten)]
    transaction: StoredTransaction,
}

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    transactions: Vec<SnapshotEntry>,
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// A [`MemoryStore`] saved to a JSON file after every commit.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Loads `path`, or starts empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let inner = if path.exists() {
            let text = fs::read_to_string(&path)?;
            MemoryStore::from_snapshot(serde_json::from_str(&text)?)
        } else {
            MemoryStore::default()
        };
        debug!(path = %path.display(), transactions = inner.transaction_count(), "opened store");
        Ok(Self { path, inner })
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    fn persist(&self, state: &MemoryStore) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&state.snapshot())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn commit_with<F>(&mut self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MemoryStore) -> Result<(), StoreError>,
    {
        let mut next = self.inner.clone();
        apply(&mut next)?;
        self.persist(&next)?;
        self.inner = next;
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn commit_transactions(&mut self, writes: Vec<TransactionWrite>) -> Result<(), StoreError> {
        self.commit_with(|store| store.commit_transactions(writes))
    }

    fn commit_users(&mut self, users: Vec<UserRecord>) -> Result<(), StoreError> {
        self.commit_with(|store| store.commit_users(users))
    }

    fn query_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<StoredTransaction>, StoreError> {
        self.inner.query_transactions(query)
    }

    fn contains_transaction(
        &self,
        partition: &PartitionKey,
        key: &DocKey,
    ) -> Result<bool, StoreError> {
        self.inner.contains_transaction(partition, key)
    }

    fn get_users(&self, sfa_ids: &[SfaId]) -> Result<Vec<UserRecord>, StoreError> {
        self.inner.get_users(sfa_ids)
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.inner.list_users()
    }
}
