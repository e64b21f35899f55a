mod test_utils;

use mini_db::{lock_table::Permission, ErrorKind, HeapPageID, Transaction};

/// Three committed pages of two-column rows (126 per 1 KiB page).
fn build_three_page_table(
    db: &std::sync::Arc<mini_db::Database>,
    name: &str,
) -> std::sync::Arc<mini_db::HeapTable> {
    let table = test_utils::create_int_table(db, name, 2);
    let mut next = 0;
    for count in [126, 126, 10] {
        let tx = Transaction::new();
        let values: Vec<i32> = (next..next + count).collect();
        test_utils::insert_values(db, &tx, table.get_id(), &values, 2);
        tx.commit(db).unwrap();
        next += count;
    }
    assert_eq!(table.num_pages(), 3);
    table
}

#[test]
fn test_cache_never_exceeds_capacity() {
    let (db, _dir) = test_utils::setup_small_pages_with_capacity(2);
    let table = build_three_page_table(&db, "bounded");

    let tx = Transaction::new();
    let rows = test_utils::scan_all(&db, &tx, table.get_id());
    tx.commit(&db).unwrap();

    assert_eq!(rows.len(), 262);
    assert!(db.buffer_pool().size() <= 2);
}

#[test]
fn test_eviction_fails_when_every_page_is_dirty() {
    let (db, _dir) = test_utils::setup_small_pages_with_capacity(2);
    let table = build_three_page_table(&db, "exhausted");

    let tx = Transaction::new();
    let rows = test_utils::scan_all(&db, &tx, table.get_id());

    // dirty one tuple on page 0 and one on page 1
    for page_index in [0, 1] {
        let victim = rows
            .iter()
            .find(|t| t.get_record_id().unwrap().pid.page_index == page_index)
            .unwrap();
        db.buffer_pool().delete_tuple(&db, &tx, victim).unwrap();
    }

    let err = db
        .buffer_pool()
        .get_page(
            &db,
            &tx,
            Permission::ReadOnly,
            &HeapPageID::new(table.get_id(), 2),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Database);
    assert!(err.details().contains("exhausted"));

    // dirty pages survived the failed eviction
    assert_eq!(db.buffer_pool().size(), 2);
    tx.abort(&db).unwrap();
}

#[test]
fn test_aborted_dirt_is_invisible_after_reload() {
    let (db, _dir) = test_utils::setup_small_pages_with_capacity(2);
    let table = build_three_page_table(&db, "reload");

    let tx = Transaction::new();
    let rows = test_utils::scan_all(&db, &tx, table.get_id());
    let victim = rows
        .iter()
        .find(|t| t.get_record_id().unwrap().pid.page_index == 0)
        .unwrap();
    db.buffer_pool().delete_tuple(&db, &tx, victim).unwrap();
    tx.abort(&db).unwrap();

    let tx = Transaction::new();
    let rows = test_utils::scan_all(&db, &tx, table.get_id());
    tx.commit(&db).unwrap();
    assert_eq!(rows.len(), 262);
}

#[test]
fn test_flush_all_pages_writes_through() {
    let (db, _dir) = test_utils::setup_small_pages();
    let table = test_utils::create_int_table(&db, "flush_all", 2);

    let tx = Transaction::new();
    test_utils::insert_values(&db, &tx, table.get_id(), &[1, 2, 3], 2);
    db.buffer_pool().flush_all_pages(&db).unwrap();

    // the on-disk page now has the rows even before commit
    let page = table.read_page(&HeapPageID::new(table.get_id(), 0)).unwrap();
    assert_eq!(page.tuples_count(), 3);

    let pid = HeapPageID::new(table.get_id(), 0);
    let page_pod = db
        .buffer_pool()
        .get_page(&db, &tx, Permission::ReadOnly, &pid)
        .unwrap();
    assert!(page_pod.read().unwrap().dirtier().is_none());
    tx.commit(&db).unwrap();
}

#[test]
fn test_discard_page_drops_without_flushing() {
    let (db, _dir) = test_utils::setup_small_pages();
    let table = test_utils::create_int_table(&db, "discard", 2);

    let tx = Transaction::new();
    test_utils::insert_values(&db, &tx, table.get_id(), &[7], 2);
    let pid = HeapPageID::new(table.get_id(), 0);
    assert!(db.buffer_pool().size() >= 1);

    db.buffer_pool().discard_page(&pid);
    assert_eq!(db.buffer_pool().size(), 0);

    // the uncommitted insert never reached the file
    let page = table.read_page(&pid).unwrap();
    assert_eq!(page.tuples_count(), 0);
    tx.abort(&db).unwrap();
}

#[test]
fn test_release_page_lets_another_writer_in() {
    let (db, _dir) = test_utils::setup_small_pages();
    let table = test_utils::create_int_table(&db, "release", 2);

    let setup_tx = Transaction::new();
    test_utils::insert_values(&db, &setup_tx, table.get_id(), &[1], 2);
    setup_tx.commit(&db).unwrap();

    let pid = HeapPageID::new(table.get_id(), 0);
    let t1 = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &t1, Permission::ReadWrite, &pid)
        .unwrap();

    db.buffer_pool().release_page(&db, &t1, &pid);
    assert!(!db.buffer_pool().holds_lock(&db, &t1, &pid));

    let t2 = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &t2, Permission::ReadWrite, &pid)
        .unwrap();
    t2.commit(&db).unwrap();
    t1.abort(&db).unwrap();
}
