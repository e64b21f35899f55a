#![allow(dead_code)]

use std::sync::Arc;

use mini_db::{
    buffer_pool::DEFAULT_PAGE_SIZE,
    int_schema,
    lock_table::DEFAULT_LOCK_TIMEOUT_MS,
    operator::{OpIterator, SeqScan},
    utils, BufferPool, Database, Field, HeapTable, LockTable, Transaction, Tuple,
};
use tempfile::TempDir;

/// Fresh database context over a temporary directory, default page size.
pub fn setup() -> (Arc<Database>, TempDir) {
    utils::init_log();
    BufferPool::set_page_size(DEFAULT_PAGE_SIZE);
    LockTable::set_lock_timeout(DEFAULT_LOCK_TIMEOUT_MS);

    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Arc::new(Database::new(dir.path()).expect("create database"));
    (db, dir)
}

/// Same as `setup` but with 1 KiB pages, so multi-page tables stay small.
/// Every test in a binary must agree on the page size.
pub fn setup_small_pages() -> (Arc<Database>, TempDir) {
    utils::init_log();
    BufferPool::set_page_size(1024);
    LockTable::set_lock_timeout(DEFAULT_LOCK_TIMEOUT_MS);

    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Arc::new(Database::new(dir.path()).expect("create database"));
    (db, dir)
}

/// Small-page database with a bounded buffer pool, for eviction tests.
pub fn setup_small_pages_with_capacity(capacity: usize) -> (Arc<Database>, TempDir) {
    utils::init_log();
    BufferPool::set_page_size(1024);
    LockTable::set_lock_timeout(DEFAULT_LOCK_TIMEOUT_MS);

    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Arc::new(
        Database::with_buffer_capacity(dir.path(), capacity).expect("create database"),
    );
    (db, dir)
}

/// Creates an empty int table and registers it in the catalog.
pub fn create_int_table(db: &Arc<Database>, name: &str, columns: usize) -> Arc<HeapTable> {
    let schema = int_schema(columns, name);
    let table = Arc::new(
        HeapTable::new(db.get_dir().join(format!("{}.dat", name)), &schema)
            .expect("create table file"),
    );
    db.mut_catalog().add_table(table.clone(), name, "");
    table
}

/// A tuple with one int field per entry of `values`.
pub fn int_tuple(values: &[i32]) -> Tuple {
    let schema = int_schema(values.len(), "row");
    Tuple::new(schema, values.iter().map(|v| Field::Int(*v)).collect())
}

/// Inserts one `width`-column tuple per value, all columns set to the
/// value.
pub fn insert_values(
    db: &Arc<Database>,
    tx: &Transaction,
    table_id: u32,
    values: &[i32],
    columns: usize,
) {
    for &v in values {
        db.buffer_pool()
            .insert_tuple(db, tx, table_id, &Tuple::new_int_tuple(v, columns))
            .expect("insert tuple");
    }
}

/// Full sequential scan, returning every tuple in page and slot order.
pub fn scan_all(db: &Arc<Database>, tx: &Transaction, table_id: u32) -> Vec<Tuple> {
    let mut scan = SeqScan::new(db.clone(), tx, table_id, "scan").expect("create scan");
    scan.open().expect("open scan");
    let mut rows = Vec::new();
    while scan.has_next().expect("scan has_next") {
        rows.push(scan.next().expect("scan next"));
    }
    scan.close();
    rows
}
