use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    thread::sleep,
    time::{Duration, Instant},
};

use log::debug;

use crate::{error::DbError, storage::page_id::HeapPageID, transaction::Transaction, types::DbResult};

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 100;

// Wall-clock time one page request may spend waiting for a lock before
// the transaction is presumed deadlocked.
static LOCK_TIMEOUT_MS: AtomicU64 = AtomicU64::new(DEFAULT_LOCK_TIMEOUT_MS);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::Shared,
            Permission::ReadWrite => Lock::Exclusive,
        }
    }
}

struct LockEntry {
    tx: Transaction,
    lock: Lock,
}

/// Page-granularity strict two-phase locking. Per page the table holds the
/// ordered list of (transaction, mode) entries; an exclusive holder is
/// always the sole entry. Every method body is one critical section.
pub struct LockTable {
    entries: Mutex<HashMap<HeapPageID, Vec<LockEntry>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_lock_timeout(ms: u64) {
        LOCK_TIMEOUT_MS.store(ms, Ordering::Relaxed);
    }

    pub fn get_lock_timeout() -> u64 {
        LOCK_TIMEOUT_MS.load(Ordering::Relaxed)
    }

    /// Blocking acquisition. Retries until the lock is granted or the
    /// deadlock-detection deadline passes, in which case the caller's
    /// transaction is dead and must be reissued.
    pub fn acquire(&self, tx: &Transaction, lock: Lock, pid: &HeapPageID) -> DbResult {
        let start = Instant::now();
        let timeout = Duration::from_millis(Self::get_lock_timeout());
        loop {
            if self.try_acquire(tx, lock, pid) {
                debug!("lock acquired, tx: {}, lock: {:?}, pid: {}", tx, lock, pid);
                return Ok(());
            }
            if start.elapsed() >= timeout {
                debug!("lock wait timed out, tx: {}, lock: {:?}, pid: {}", tx, lock, pid);
                return Err(DbError::transaction_aborted(&format!(
                    "{} timed out waiting for {:?} on {}",
                    tx, lock, pid
                )));
            }
            sleep(Duration::from_millis(2));
        }
    }

    /// One grant attempt. Returns false on denial; the caller retries.
    fn try_acquire(&self, tx: &Transaction, lock: Lock, pid: &HeapPageID) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let holders = entries.entry(*pid).or_insert_with(Vec::new);

        if holders.is_empty() {
            holders.push(LockEntry { tx: *tx, lock });
            return true;
        }

        if let Some(pos) = holders.iter().position(|e| e.tx == *tx) {
            let held = holders[pos].lock;
            if held == lock || held == Lock::Exclusive {
                // reentrant, or an exclusive hold covering a shared request
                return true;
            }
            if holders.len() == 1 {
                // sole shared holder, upgrade in place
                holders[pos].lock = Lock::Exclusive;
                return true;
            }
            return false;
        }

        if holders.iter().any(|e| e.lock == Lock::Exclusive) {
            return false;
        }
        if lock == Lock::Shared {
            holders.push(LockEntry { tx: *tx, lock });
            return true;
        }
        false
    }

    /// Releases one (tx, pid) entry. Exposed for recovery paths; regular
    /// completion goes through `release_by_tx`.
    pub fn release(&self, tx: &Transaction, pid: &HeapPageID) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(holders) = entries.get_mut(pid) {
            holders.retain(|e| e.tx != *tx);
            if holders.is_empty() {
                entries.remove(pid);
            }
        }
    }

    /// Releases every lock held by the transaction. Called only at
    /// transaction completion (strict 2PL).
    pub fn release_by_tx(&self, tx: &Transaction) {
        let mut entries = self.entries.lock().unwrap();
        for holders in entries.values_mut() {
            holders.retain(|e| e.tx != *tx);
        }
        entries.retain(|_, holders| !holders.is_empty());
        debug!("released all locks of {}", tx);
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        let entries = self.entries.lock().unwrap();
        entries
            .get(pid)
            .map_or(false, |holders| holders.iter().any(|e| e.tx == *tx))
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> HeapPageID {
        HeapPageID::new(1, 0)
    }

    #[test]
    fn test_shared_locks_coexist() {
        let table = LockTable::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(table.try_acquire(&t1, Lock::Shared, &pid()));
        assert!(table.try_acquire(&t2, Lock::Shared, &pid()));
        assert!(table.holds_lock(&t1, &pid()));
        assert!(table.holds_lock(&t2, &pid()));
    }

    #[test]
    fn test_exclusive_excludes_everyone() {
        let table = LockTable::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(table.try_acquire(&t1, Lock::Exclusive, &pid()));
        assert!(!table.try_acquire(&t2, Lock::Shared, &pid()));
        assert!(!table.try_acquire(&t2, Lock::Exclusive, &pid()));
        // reentrant for the holder, shared covered by exclusive
        assert!(table.try_acquire(&t1, Lock::Exclusive, &pid()));
        assert!(table.try_acquire(&t1, Lock::Shared, &pid()));
    }

    #[test]
    fn test_upgrade_only_as_sole_holder() {
        let table = LockTable::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(table.try_acquire(&t1, Lock::Shared, &pid()));
        assert!(table.try_acquire(&t1, Lock::Exclusive, &pid()));
        assert!(!table.try_acquire(&t2, Lock::Shared, &pid()));

        table.release_by_tx(&t1);
        assert!(table.try_acquire(&t2, Lock::Shared, &pid()));
    }

    #[test]
    fn test_upgrade_denied_with_other_holders() {
        let table = LockTable::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(table.try_acquire(&t1, Lock::Shared, &pid()));
        assert!(table.try_acquire(&t2, Lock::Shared, &pid()));
        assert!(!table.try_acquire(&t1, Lock::Exclusive, &pid()));
        assert!(!table.try_acquire(&t2, Lock::Exclusive, &pid()));

        table.release(&t2, &pid());
        assert!(table.try_acquire(&t1, Lock::Exclusive, &pid()));
    }

    #[test]
    fn test_shared_denied_while_exclusive_holder_present() {
        let table = LockTable::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(table.try_acquire(&t2, Lock::Shared, &pid()));
        assert!(table.try_acquire(&t1, Lock::Shared, &pid()));
        table.release_by_tx(&t2);
        assert!(table.try_acquire(&t1, Lock::Exclusive, &pid()));
        assert!(!table.try_acquire(&t2, Lock::Shared, &pid()));
    }

    #[test]
    fn test_release_by_tx_clears_everything() {
        let table = LockTable::new();
        let t1 = Transaction::new();
        let other = HeapPageID::new(1, 7);

        assert!(table.try_acquire(&t1, Lock::Shared, &pid()));
        assert!(table.try_acquire(&t1, Lock::Exclusive, &other));
        table.release_by_tx(&t1);
        assert!(!table.holds_lock(&t1, &pid()));
        assert!(!table.holds_lock(&t1, &other));
    }
}
