//! Mock Registry Store
//!
//! In-memory collections for citizens, documents and grievances, plus the
//! shared block counter and append-only transaction log. Each collection has
//! its own lock. Blocks are allocated under the log lock.

use crate::domain::{
    allocate_id, Citizen, CollectionSizes, Document, DocumentStatus, EmulationSnapshot,
    EmulationStats, Grievance, GrievanceStatus, DOCUMENT_ID_BASE, GRIEVANCE_ID_BASE,
};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use shared_types::{unix_now, Address, TransactionReceipt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One keyed collection.
pub struct Collection<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord + Clone, V: Clone> Collection<K, V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Insert, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.entries.write().insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().remove(key)
    }

    /// Mutate an entry in place. `None` if absent.
    pub fn update<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.entries.write().get_mut(key).map(f)
    }

    /// Exclusive access for check-then-mutate sequences.
    pub fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<K, V>> {
        self.entries.write()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All values in key order.
    pub fn values(&self) -> Vec<V> {
        self.entries.read().values().cloned().collect()
    }

    /// Keys whose value matches `pred`, in key order.
    pub fn keys_where(&self, pred: impl Fn(&V) -> bool) -> Vec<K> {
        self.entries
            .read()
            .iter()
            .filter(|(_, v)| pred(v))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Count values matching `pred`.
    pub fn count_where(&self, pred: impl Fn(&V) -> bool) -> usize {
        self.entries.read().values().filter(|v| pred(v)).count()
    }

    /// Replace every entry.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (K, V)>) {
        *self.entries.write() = entries.into_iter().collect();
    }
}

/// Shared emulation state.
pub struct EmulatedStore {
    pub citizens: Collection<Address, Citizen>,
    pub documents: Collection<u64, Document>,
    pub grievances: Collection<u64, Grievance>,
    block_number: AtomicU64,
    transactions: Mutex<Vec<TransactionReceipt>>,
}

impl EmulatedStore {
    /// Empty store whose first synthetic block is `initial_block + 1`.
    pub fn new(initial_block: u64) -> Self {
        Self {
            citizens: Collection::new(),
            documents: Collection::new(),
            grievances: Collection::new(),
            block_number: AtomicU64::new(initial_block),
            transactions: Mutex::new(Vec::new()),
        }
    }

    /// Advance the block counter and return the new height.
    pub fn next_block(&self) -> u64 {
        self.block_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current block height.
    pub fn block_number(&self) -> u64 {
        self.block_number.load(Ordering::SeqCst)
    }

    /// Allocate the next block and append the receipt `build` makes for it.
    ///
    /// The log lock is held across both steps so the log stays in block order.
    pub fn append_transaction(
        &self,
        build: impl FnOnce(u64) -> TransactionReceipt,
    ) -> TransactionReceipt {
        let mut log = self.transactions.lock();
        let receipt = build(self.next_block());
        log.push(receipt.clone());
        receipt
    }

    /// Transaction log in append order.
    pub fn transactions(&self) -> Vec<TransactionReceipt> {
        self.transactions.lock().clone()
    }

    /// Next free document id. Call with the documents write guard held.
    pub fn next_document_id(documents: &BTreeMap<u64, Document>) -> u64 {
        allocate_id(DOCUMENT_ID_BASE, documents.len(), |id| {
            documents.contains_key(&id)
        })
    }

    /// Next free grievance id. Call with the grievances write guard held.
    pub fn next_grievance_id(grievances: &BTreeMap<u64, Grievance>) -> u64 {
        allocate_id(GRIEVANCE_ID_BASE, grievances.len(), |id| {
            grievances.contains_key(&id)
        })
    }

    pub fn sizes(&self) -> CollectionSizes {
        CollectionSizes {
            citizens: self.citizens.len(),
            documents: self.documents.len(),
            grievances: self.grievances.len(),
            transactions: self.transactions.lock().len(),
        }
    }

    pub fn stats(&self) -> EmulationStats {
        EmulationStats {
            total_citizens: self.citizens.len(),
            verified_citizens: self.citizens.count_where(|c| c.verified),
            total_documents: self.documents.len(),
            verified_documents: self
                .documents
                .count_where(|d| d.status == DocumentStatus::Verified),
            total_grievances: self.grievances.len(),
            resolved_grievances: self
                .grievances
                .count_where(|g| g.status == GrievanceStatus::Resolved),
            total_transactions: self.transactions.lock().len(),
            current_block: self.block_number(),
        }
    }

    /// Copy out every collection.
    pub fn snapshot(&self) -> EmulationSnapshot {
        EmulationSnapshot {
            citizens: self.citizens.values(),
            documents: self.documents.values(),
            grievances: self.grievances.values(),
            transactions: self.transactions(),
            block_number: self.block_number(),
            exported_at: unix_now(),
        }
    }

    /// Replace every collection with the snapshot's contents.
    ///
    /// The block counter never moves backwards.
    pub fn restore(&self, snapshot: EmulationSnapshot) {
        self.citizens
            .replace_all(snapshot.citizens.into_iter().map(|c| (c.address, c)));
        self.documents
            .replace_all(snapshot.documents.into_iter().map(|d| (d.id, d)));
        self.grievances
            .replace_all(snapshot.grievances.into_iter().map(|g| (g.id, g)));
        *self.transactions.lock() = snapshot.transactions;
        self.block_number
            .fetch_max(snapshot.block_number, Ordering::SeqCst);
    }

    /// Drop every record and the transaction log.
    pub fn clear(&self) {
        self.citizens.replace_all([]);
        self.documents.replace_all([]);
        self.grievances.replace_all([]);
        self.transactions.lock().clear();
    }
}
