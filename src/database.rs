use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    buffer_pool::{BufferPool, DEFAULT_PAGES},
    catalog::Catalog,
    error::DbError,
    lock_table::LockTable,
    stats::table_stats::TableStats,
    tx_log::LogManager,
    utils::HandyRwLock,
};

/// The collaborator hub: buffer pool, catalog, lock table, log manager and
/// statistics registry of one database instance. There is deliberately no
/// process-wide singleton; callers (and tests) create their own context
/// and share it as `Arc<Database>`.
pub struct Database {
    dir: PathBuf,

    buffer_pool: BufferPool,
    catalog: RwLock<Catalog>,
    lock_table: LockTable,
    log_manager: Mutex<LogManager>,
    stats: RwLock<HashMap<String, Arc<TableStats>>>,
}

impl Database {
    pub fn new(dir: impl AsRef<Path>) -> Result<Database, DbError> {
        Self::with_buffer_capacity(dir, DEFAULT_PAGES)
    }

    pub fn with_buffer_capacity(dir: impl AsRef<Path>, capacity: usize) -> Result<Database, DbError> {
        fs::create_dir_all(dir.as_ref())?;
        let log_manager = LogManager::new(dir.as_ref().join("wal.log"))?;

        Ok(Database {
            dir: dir.as_ref().to_path_buf(),
            buffer_pool: BufferPool::with_capacity(capacity),
            catalog: RwLock::new(Catalog::new()),
            lock_table: LockTable::new(),
            log_manager: Mutex::new(log_manager),
            stats: RwLock::new(HashMap::new()),
        })
    }

    pub fn get_dir(&self) -> &Path {
        &self.dir
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn lock_table(&self) -> &LockTable {
        &self.lock_table
    }

    pub fn catalog(&self) -> RwLockReadGuard<Catalog> {
        self.catalog.rl()
    }

    pub fn mut_catalog(&self) -> RwLockWriteGuard<Catalog> {
        self.catalog.wl()
    }

    pub fn mut_log_manager(&self) -> MutexGuard<LogManager> {
        self.log_manager.lock().unwrap()
    }

    pub fn get_table_stats(&self, table_name: &str) -> Option<Arc<TableStats>> {
        self.stats.rl().get(table_name).cloned()
    }

    pub fn set_table_stats(&self, table_name: &str, stats: Arc<TableStats>) {
        self.stats.wl().insert(table_name.to_string(), stats);
    }

    /// Drops every computed statistic. The explicit replacement for the
    /// original's reach-into-the-private-map reset.
    pub fn reset_stats(&self) {
        self.stats.wl().clear();
    }
}
