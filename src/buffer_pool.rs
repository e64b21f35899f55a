use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use log::{debug, error};
use rand::Rng;

use crate::{
    database::Database,
    error::DbError,
    lock_table::Permission,
    storage::{heap_page::HeapPage, page_id::HeapPageID, tuple::Tuple},
    transaction::Transaction,
    types::{ConcurrentHashMap, DbResult, Pod, ResultPod},
    utils::HandyRwLock,
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_PAGES: usize = 50;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// The single gateway to pages. Every access is mediated by the lock
/// table, dirty pages are tracked per transaction, and eviction never
/// touches a dirty page (NO-STEAL), which is what makes rollback by cache
/// discard sound.
pub struct BufferPool {
    buffer: ConcurrentHashMap<HeapPageID, Pod<HeapPage>>,
    capacity: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PAGES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: ConcurrentHashMap::new(),
            capacity,
        }
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Retrieve the specified page with the associated permissions. Blocks
    /// while the lock is held incompatibly elsewhere and aborts the
    /// transaction when the deadlock-detection deadline passes.
    ///
    /// The page is served from the cache when present; otherwise it is
    /// loaded from its table's file, evicting a clean page first when the
    /// pool is full.
    pub fn get_page(
        &self,
        db: &Database,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        db.lock_table().acquire(tx, perm.to_lock(), pid)?;

        if let Some(page_pod) = self.buffer.get(pid) {
            return Ok(page_pod);
        }

        let table = db.catalog().get_table(pid.table_id)?;

        let mut buffer = self.buffer.get_inner_wl();
        // another thread may have loaded it while we fetched the table
        if let Some(page_pod) = buffer.get(pid) {
            return Ok(page_pod.clone());
        }

        while buffer.len() >= self.capacity {
            Self::evict_page(db, &mut buffer)?;
        }

        let page = table.read_page(pid)?;
        let page_pod: Pod<HeapPage> = Arc::new(RwLock::new(page));
        buffer.insert(*pid, page_pod.clone());
        debug!("page {} loaded into the buffer pool", pid);
        Ok(page_pod)
    }

    /// Picks a clean victim by random sampling, flushes and drops it.
    /// Fails when every cached page has been observed dirty, since
    /// evicting any of them would break NO-STEAL.
    fn evict_page(db: &Database, buffer: &mut HashMap<HeapPageID, Pod<HeapPage>>) -> DbResult {
        let mut dirty_sampled: HashSet<HeapPageID> = HashSet::new();
        let mut rng = rand::thread_rng();

        loop {
            let keys: Vec<HeapPageID> = buffer.keys().cloned().collect();
            if keys.is_empty() {
                return Err(DbError::database("buffer pool is empty, nothing to evict"));
            }

            let victim = keys[rng.gen_range(0..keys.len())];
            let victim_pod = buffer.get(&victim).unwrap().clone();

            if victim_pod.rl().dirtier().is_some() {
                dirty_sampled.insert(victim);
                if dirty_sampled.len() >= buffer.len() {
                    return Err(DbError::database(
                        "buffer pool exhausted: every cached page is dirty",
                    ));
                }
                continue;
            }

            Self::flush_pod(db, &victim_pod)?;
            buffer.remove(&victim);
            debug!("page {} evicted", victim);
            return Ok(());
        }
    }

    /// Writes the page's before/after images to the log, forces the log,
    /// then writes the page to its file and clears the dirty mark. The
    /// log-before-data order is mandatory. Clean pages are left alone.
    fn flush_pod(db: &Database, page_pod: &Pod<HeapPage>) -> DbResult {
        let dirtier = page_pod.rl().dirtier();
        let tx = match dirtier {
            Some(tx) => tx,
            None => return Ok(()),
        };

        let (pid, before, after) = {
            let page = page_pod.rl();
            (page.get_pid(), page.get_before_image(), page.get_page_data())
        };

        {
            let mut log_manager = db.mut_log_manager();
            log_manager.log_write(&tx, &pid, &before, &after)?;
            log_manager.force()?;
        }

        let table = db.catalog().get_table(pid.table_id)?;
        table.write_page(&page_pod.rl())?;
        page_pod.wl().mark_dirty(None);
        debug!("page {} flushed", pid);
        Ok(())
    }

    /// Flushes one page if it is cached and dirty.
    pub fn flush_page(&self, db: &Database, pid: &HeapPageID) -> DbResult {
        if let Some(page_pod) = self.buffer.get(pid) {
            Self::flush_pod(db, &page_pod)?;
        }
        Ok(())
    }

    /// Writes every currently dirty page to disk. Breaks NO-STEAL when
    /// live transactions hold dirty pages, so this is a testing hook.
    pub fn flush_all_pages(&self, db: &Database) -> DbResult {
        for pid in self.buffer.keys() {
            self.flush_page(db, &pid)?;
        }
        Ok(())
    }

    /// Writes every page dirtied by the transaction to disk.
    pub fn flush_pages(&self, db: &Database, tx: &Transaction) -> DbResult {
        for pid in self.buffer.keys() {
            if let Some(page_pod) = self.buffer.get(&pid) {
                if page_pod.rl().dirtier() == Some(*tx) {
                    Self::flush_pod(db, &page_pod)?;
                }
            }
        }
        Ok(())
    }

    /// Routes the tuple to the table's file and attributes every dirtied
    /// page to the transaction.
    pub fn insert_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        table_id: u32,
        tuple: &Tuple,
    ) -> DbResult {
        let table = db.catalog().get_table(table_id)?;
        let dirtied = table.insert_tuple(db, tx, tuple)?;
        for page_pod in dirtied {
            page_pod.wl().mark_dirty(Some(*tx));
        }
        Ok(())
    }

    /// Deletes through the tuple's record id and attributes the dirtied
    /// page to the transaction.
    pub fn delete_tuple(&self, db: &Database, tx: &Transaction, tuple: &Tuple) -> DbResult {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::database("tuple has no record id, cannot delete"))?;
        let table = db.catalog().get_table(rid.pid.table_id)?;
        let dirtied = table.delete_tuple(db, tx, tuple)?;
        for page_pod in dirtied {
            page_pod.wl().mark_dirty(Some(*tx));
        }
        Ok(())
    }

    /// Commit or abort the transaction and release all its locks.
    ///
    /// Commit flushes every page the transaction dirtied and refreshes
    /// their before images so a later abort rolls back to this commit.
    /// Abort discards the dirtied pages; the next reader reloads the
    /// committed copy from disk, which is safe because dirty pages are
    /// never evicted before commit.
    pub fn transaction_complete(&self, db: &Database, tx: &Transaction, commit: bool) -> DbResult {
        if commit {
            for pid in self.buffer.keys() {
                if let Some(page_pod) = self.buffer.get(&pid) {
                    if page_pod.rl().dirtier() == Some(*tx) {
                        Self::flush_pod(db, &page_pod)?;
                        page_pod.wl().set_before_image();
                    }
                }
            }
            db.mut_log_manager().log_commit(tx)?;
        } else {
            for pid in self.buffer.keys() {
                if let Some(page_pod) = self.buffer.get(&pid) {
                    if page_pod.rl().dirtier() == Some(*tx) {
                        self.discard_page(&pid);
                    }
                }
            }
            if let Err(e) = db.mut_log_manager().log_abort(tx) {
                // the abort itself must not be masked by log trouble
                error!("failed to log abort of {}: {}", tx, e);
            }
        }

        db.lock_table().release_by_tx(tx);
        debug!("{} completed, commit: {}", tx, commit);
        Ok(())
    }

    pub fn holds_lock(&self, db: &Database, tx: &Transaction, pid: &HeapPageID) -> bool {
        db.lock_table().holds_lock(tx, pid)
    }

    /// Releases one lock early. Unsafe to call arbitrarily; exposed for
    /// recovery paths.
    pub fn release_page(&self, db: &Database, tx: &Transaction, pid: &HeapPageID) {
        db.lock_table().release(tx, pid);
    }

    /// Drops the page from the cache without flushing.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.buffer.remove(pid);
    }

    pub fn clear(&self) {
        self.buffer.clear();
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}
