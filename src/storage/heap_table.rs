use std::{
    collections::hash_map::DefaultHasher,
    fs::{File, OpenOptions},
    hash::{Hash, Hasher},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::debug;

use crate::{
    buffer_pool::BufferPool,
    database::Database,
    error::DbError,
    lock_table::Permission,
    storage::{
        heap_page::HeapPage,
        page_id::HeapPageID,
        schema::Schema,
        tuple::Tuple,
    },
    transaction::Transaction,
    types::{DbResult, Pod},
    utils::HandyRwLock,
};

/// Tuples of a single schema stored in an unordered sequence of fixed-size
/// pages. The table never writes on its own initiative except when
/// extending the file; all regular page traffic goes through the buffer
/// pool.
pub struct HeapTable {
    file: Mutex<File>,
    file_path: PathBuf,
    table_id: u32,
    schema: Schema,
}

impl HeapTable {
    /// Opens (or creates) the backing file. The table id is a hash of the
    /// canonical file path, so the same file always yields the same id.
    pub fn new(path: impl AsRef<Path>, schema: &Schema) -> Result<HeapTable, DbError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        let file_path = path.as_ref().canonicalize()?;

        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Ok(HeapTable {
            file: Mutex::new(file),
            file_path,
            table_id,
            schema: schema.clone(),
        })
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn num_pages(&self) -> usize {
        let len = self
            .file
            .lock()
            .unwrap()
            .metadata()
            .expect("io error")
            .len() as usize;
        let page_size = BufferPool::get_page_size();
        (len + page_size - 1) / page_size
    }

    /// Reads exactly one page worth of bytes from the file, bypassing the
    /// buffer pool. Fails when the page lies beyond the end of file.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, DbError> {
        let page_size = BufferPool::get_page_size();
        let start = pid.page_index as usize * page_size;

        let mut file = self.file.lock().unwrap();
        let len = file.metadata()?.len() as usize;
        if start + page_size > len {
            return Err(DbError::illegal_argument(&format!(
                "page {} is beyond the end of the file ({} bytes)",
                pid, len
            )));
        }

        file.seek(SeekFrom::Start(start as u64))?;
        let mut buf = vec![0; page_size];
        file.read_exact(&mut buf)?;
        HeapPage::new(*pid, &buf, &self.schema)
    }

    /// Writes the page's bytes at its position. The buffer pool decides
    /// when this happens.
    pub fn write_page(&self, page: &HeapPage) -> DbResult {
        let page_size = BufferPool::get_page_size();
        let start = page.get_pid().page_index as usize * page_size;

        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(start as u64))?;
        file.write_all(&page.get_page_data())?;
        Ok(())
    }

    /// Appends one zeroed page to the file and returns its index. This is
    /// the only write that bypasses the buffer pool.
    fn extend_file(&self) -> Result<u32, DbError> {
        let mut file = self.file.lock().unwrap();
        let len = file.metadata()?.len();
        file.seek(SeekFrom::Start(len))?;
        file.write_all(&HeapPage::empty_page_data())?;
        let new_index = len as usize / BufferPool::get_page_size();
        debug!("table {} extended to page {}", self.table_id, new_index);
        Ok(new_index as u32)
    }

    /// Visits pages in order with write permission and inserts into the
    /// first one with room; extends the file when every page is full.
    /// Returns exactly the page(s) modified.
    pub fn insert_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        for i in 0..self.num_pages() {
            let pid = HeapPageID::new(self.table_id, i as u32);
            let page_pod = db
                .buffer_pool()
                .get_page(db, tx, Permission::ReadWrite, &pid)?;

            let has_room = page_pod.rl().empty_slots_count() > 0;
            if has_room {
                page_pod.wl().insert_tuple(tuple)?;
                return Ok(vec![page_pod]);
            }
        }

        let pid = HeapPageID::new(self.table_id, self.extend_file()?);
        let page_pod = db
            .buffer_pool()
            .get_page(db, tx, Permission::ReadWrite, &pid)?;
        page_pod.wl().insert_tuple(tuple)?;
        Ok(vec![page_pod])
    }

    /// Resolves the tuple's record id and clears that slot. Returns the
    /// page modified.
    pub fn delete_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::database("tuple has no record id, cannot delete"))?;

        let page_pod = db
            .buffer_pool()
            .get_page(db, tx, Permission::ReadWrite, &rid.pid)?;
        page_pod.wl().delete_tuple(&rid)?;
        Ok(vec![page_pod])
    }
}

/// Yields every occupied tuple, pages in file order and slots in slot
/// order. Each page visited is acquired with read permission.
pub struct HeapTableIterator {
    db: Arc<Database>,
    tx: Transaction,
    table: Arc<HeapTable>,

    current_page: usize,
    tuples: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl HeapTableIterator {
    pub fn new(db: Arc<Database>, tx: Transaction, table: Arc<HeapTable>) -> Self {
        Self {
            db,
            tx,
            table,
            current_page: 0,
            tuples: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    fn load_page(&mut self, page_index: usize) -> DbResult {
        let pid = HeapPageID::new(self.table.get_id(), page_index as u32);
        let page_pod =
            self.db
                .buffer_pool()
                .get_page(&self.db, &self.tx, Permission::ReadOnly, &pid)?;
        self.tuples = page_pod.rl().stored_tuples();
        self.cursor = 0;
        Ok(())
    }

    pub fn open(&mut self) -> DbResult {
        self.current_page = 0;
        self.cursor = 0;
        self.tuples.clear();
        if self.table.num_pages() > 0 {
            self.load_page(0)?;
        }
        self.opened = true;
        Ok(())
    }

    pub fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.opened {
            return Ok(false);
        }
        loop {
            if self.cursor < self.tuples.len() {
                return Ok(true);
            }
            let next_page = self.current_page + 1;
            if next_page >= self.table.num_pages() {
                return Ok(false);
            }
            self.current_page = next_page;
            self.load_page(next_page)?;
        }
    }

    pub fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::no_such_element("scan exhausted"));
        }
        let tuple = self.tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(tuple)
    }

    pub fn rewind(&mut self) -> DbResult {
        self.open()
    }

    pub fn close(&mut self) {
        self.tuples.clear();
        self.opened = false;
    }
}
