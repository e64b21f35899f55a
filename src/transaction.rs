use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{database::Database, types::DbResult};

pub type TransactionID = u64;

// increases monotonically, never reused within a process
static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// A transaction token. Allocated on `new`, consumed by `commit` or
/// `abort`; after completion the token must not be used again.
#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct Transaction {
    id: TransactionID,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get_id(&self) -> TransactionID {
        self.id
    }

    /// Writes the start record. Optional; completion works either way.
    pub fn start(&self, db: &Database) -> DbResult {
        db.mut_log_manager().log_start(self)
    }

    pub fn commit(&self, db: &Database) -> DbResult {
        self.complete(db, true)
    }

    pub fn abort(&self, db: &Database) -> DbResult {
        self.complete(db, false)
    }

    fn complete(&self, db: &Database, commit: bool) -> DbResult {
        db.buffer_pool().transaction_complete(db, self, commit)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
