mod test_utils;

use std::thread;

use mini_db::{lock_table::Permission, ErrorKind, HeapPageID, Transaction, Tuple};

fn table_with_one_row(
    db: &std::sync::Arc<mini_db::Database>,
    name: &str,
) -> (u32, HeapPageID) {
    let table = test_utils::create_int_table(db, name, 2);
    let tx = Transaction::new();
    test_utils::insert_values(db, &tx, table.get_id(), &[1], 2);
    tx.commit(db).unwrap();
    (table.get_id(), HeapPageID::new(table.get_id(), 0))
}

#[test]
fn test_write_request_times_out_while_readers_hold_the_page() {
    let (db, _dir) = test_utils::setup();
    let (_, pid) = table_with_one_row(&db, "two_readers");

    let t1 = Transaction::new();
    let t2 = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &t1, Permission::ReadOnly, &pid)
        .unwrap();
    db.buffer_pool()
        .get_page(&db, &t2, Permission::ReadOnly, &pid)
        .unwrap();

    // upgrade is impossible while another reader holds the page
    let err = db
        .buffer_pool()
        .get_page(&db, &t1, Permission::ReadWrite, &pid)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionAborted);

    t1.abort(&db).unwrap();
    t2.commit(&db).unwrap();
}

#[test]
fn test_sole_reader_upgrades_and_blocks_later_readers() {
    let (db, _dir) = test_utils::setup();
    let (_, pid) = table_with_one_row(&db, "upgrade");

    let t1 = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &t1, Permission::ReadOnly, &pid)
        .unwrap();
    db.buffer_pool()
        .get_page(&db, &t1, Permission::ReadWrite, &pid)
        .unwrap();

    let t2 = Transaction::new();
    let err = db
        .buffer_pool()
        .get_page(&db, &t2, Permission::ReadOnly, &pid)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionAborted);
    t2.abort(&db).unwrap();

    t1.commit(&db).unwrap();

    // a fresh transaction sees the page once the writer is gone
    let t3 = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &t3, Permission::ReadOnly, &pid)
        .unwrap();
    t3.commit(&db).unwrap();
}

#[test]
fn test_commit_releases_locks_and_cleans_pages() {
    let (db, _dir) = test_utils::setup();
    let table = test_utils::create_int_table(&db, "clean_commit", 2);
    let pid = HeapPageID::new(table.get_id(), 0);

    let t1 = Transaction::new();
    test_utils::insert_values(&db, &t1, table.get_id(), &[5], 2);
    assert!(db.lock_table().holds_lock(&t1, &pid));
    t1.commit(&db).unwrap();
    assert!(!db.lock_table().holds_lock(&t1, &pid));

    let t2 = Transaction::new();
    let page_pod = db
        .buffer_pool()
        .get_page(&db, &t2, Permission::ReadOnly, &pid)
        .unwrap();
    assert!(page_pod.read().unwrap().dirtier().is_none());
    t2.commit(&db).unwrap();
}

#[test]
fn test_reads_resume_after_writer_commits() {
    let (db, _dir) = test_utils::setup();
    let (table_id, pid) = table_with_one_row(&db, "handoff");

    let writer = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &writer, Permission::ReadWrite, &pid)
        .unwrap();

    let reader_db = db.clone();
    let reader = thread::spawn(move || {
        // retry until the writer commits, the way a client reissues an
        // aborted transaction
        loop {
            let tx = Transaction::new();
            match reader_db
                .buffer_pool()
                .get_page(&reader_db, &tx, Permission::ReadOnly, &pid)
            {
                Ok(_) => {
                    let rows = test_utils::scan_all(&reader_db, &tx, table_id);
                    tx.commit(&reader_db).unwrap();
                    return rows.len();
                }
                Err(e) => {
                    assert_eq!(e.kind(), ErrorKind::TransactionAborted);
                    tx.abort(&reader_db).unwrap();
                }
            }
        }
    });

    thread::sleep(std::time::Duration::from_millis(30));
    writer.commit(&db).unwrap();
    assert_eq!(reader.join().unwrap(), 1);
}

#[test]
fn test_concurrent_inserts_with_client_retry() {
    let (db, _dir) = test_utils::setup();
    let table = test_utils::create_int_table(&db, "concurrent", 2);
    let table_id = table.get_id();

    let (sender, receiver) = crossbeam::channel::unbounded();
    let mut workers = Vec::new();
    for worker in 0..8 {
        let db = db.clone();
        let sender = sender.clone();
        workers.push(thread::spawn(move || {
            for i in 0..25 {
                let value = worker * 100 + i;
                let tuple = Tuple::new_int_tuple(value, 2);
                loop {
                    let tx = Transaction::new();
                    match db.buffer_pool().insert_tuple(&db, &tx, table_id, &tuple) {
                        Ok(()) => {
                            tx.commit(&db).unwrap();
                            sender.send(value).unwrap();
                            break;
                        }
                        Err(e) => {
                            assert_eq!(e.kind(), ErrorKind::TransactionAborted);
                            tx.abort(&db).unwrap();
                        }
                    }
                }
            }
        }));
    }
    for handle in workers {
        handle.join().unwrap();
    }
    drop(sender);

    let inserted: Vec<i32> = receiver.iter().collect();
    assert_eq!(inserted.len(), 200);

    let tx = Transaction::new();
    let rows = test_utils::scan_all(&db, &tx, table_id);
    tx.commit(&db).unwrap();
    assert_eq!(rows.len(), 200);
}
