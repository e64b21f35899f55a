use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    error::DbError,
    storage::page_id::HeapPageID,
    transaction::{Transaction, TransactionID},
    types::DbResult,
};

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum RecordType {
    Abort = 0,
    Commit = 1,
    Update = 2,
    Start = 3,
    Checkpoint = 4,
}

/// Append-only write-ahead log collaborator. The buffer pool hands it
/// before/after images of dirty pages and forces it before any page write;
/// replaying the records after a crash is outside this crate.
pub struct LogManager {
    file: File,
    file_path: PathBuf,

    // byte position of each live transaction's start record
    tx_start_position: HashMap<TransactionID, u64>,

    current_offset: u64,
    total_records: usize,
}

impl LogManager {
    pub fn new(path: impl AsRef<Path>) -> Result<LogManager, DbError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;

        Ok(LogManager {
            file,
            file_path: path.as_ref().to_path_buf(),
            tx_start_position: HashMap::new(),
            current_offset: 0,
            total_records: 0,
        })
    }

    /// Truncates the log file and forgets all in-memory positions.
    pub fn reset(&mut self) -> DbResult {
        self.file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.file_path)?;
        self.tx_start_position.clear();
        self.current_offset = 0;
        self.total_records = 0;
        Ok(())
    }

    pub fn records_count(&self) -> usize {
        self.total_records
    }

    fn finish_record(&mut self) -> DbResult {
        self.file.write_all(&self.current_offset.to_be_bytes())?;
        self.current_offset = self.file.seek(SeekFrom::Current(0))?;
        self.total_records += 1;
        Ok(())
    }

    pub fn log_start(&mut self, tx: &Transaction) -> DbResult {
        self.file.write_all(&[RecordType::Start as u8])?;
        self.file.write_all(&tx.get_id().to_be_bytes())?;
        self.tx_start_position.insert(tx.get_id(), self.current_offset);
        self.finish_record()
    }

    /// Records one page update as a (before image, after image) pair.
    pub fn log_write(
        &mut self,
        tx: &Transaction,
        pid: &HeapPageID,
        before: &[u8],
        after: &[u8],
    ) -> DbResult {
        self.file.write_all(&[RecordType::Update as u8])?;
        self.file.write_all(&tx.get_id().to_be_bytes())?;
        self.file.write_all(&pid.table_id.to_be_bytes())?;
        self.file.write_all(&pid.page_index.to_be_bytes())?;
        self.file.write_all(&(before.len() as u32).to_be_bytes())?;
        self.file.write_all(before)?;
        self.file.write_all(&(after.len() as u32).to_be_bytes())?;
        self.file.write_all(after)?;
        debug!("logged update of {} by {}", pid, tx);
        self.finish_record()
    }

    pub fn log_commit(&mut self, tx: &Transaction) -> DbResult {
        self.file.write_all(&[RecordType::Commit as u8])?;
        self.file.write_all(&tx.get_id().to_be_bytes())?;
        self.finish_record()?;
        self.force()?;
        self.tx_start_position.remove(&tx.get_id());
        Ok(())
    }

    pub fn log_abort(&mut self, tx: &Transaction) -> DbResult {
        self.file.write_all(&[RecordType::Abort as u8])?;
        self.file.write_all(&tx.get_id().to_be_bytes())?;
        self.finish_record()?;
        self.force()?;
        self.tx_start_position.remove(&tx.get_id());
        Ok(())
    }

    /// Writes a checkpoint record naming the live transactions and their
    /// start positions.
    pub fn log_checkpoint(&mut self) -> DbResult {
        self.force()?;
        self.file.write_all(&[RecordType::Checkpoint as u8])?;
        self.file
            .write_all(&(self.tx_start_position.len() as u32).to_be_bytes())?;
        let entries: Vec<(TransactionID, u64)> = self
            .tx_start_position
            .iter()
            .map(|(id, pos)| (*id, *pos))
            .collect();
        for (id, pos) in entries {
            self.file.write_all(&id.to_be_bytes())?;
            self.file.write_all(&pos.to_be_bytes())?;
        }
        self.finish_record()?;
        self.force()
    }

    /// Durably persists every record appended so far.
    pub fn force(&mut self) -> DbResult {
        self.file.sync_all()?;
        Ok(())
    }
}
