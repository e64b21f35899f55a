use bit_vec::BitVec;
use log::debug;

use crate::{
    buffer_pool::BufferPool,
    error::DbError,
    storage::{
        page_id::{HeapPageID, RecordId},
        schema::Schema,
        tuple::Tuple,
    },
    transaction::Transaction,
    types::DbResult,
};

/// One fixed-size heap page: a header bitmap of occupied slots followed by
/// the tuple bodies. The page remembers which transaction last dirtied it
/// and keeps a before-image snapshot for rollback.
#[derive(Debug)]
pub struct HeapPage {
    pid: HeapPageID,
    schema: Schema,

    slot_count: usize,

    // slot status, true means occupied
    header: BitVec,
    // all slots, empty ones hold a zero tuple
    tuples: Vec<Tuple>,

    dirtier: Option<Transaction>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Maximum number of tuples a page of the current page size can hold:
    /// each tuple costs its body plus one header bit.
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        BufferPool::get_page_size() * 8 / bits_per_tuple_including_header
    }

    /// Header size in bytes for a page with the given number of slots.
    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// Interprets one page worth of bytes. The bytes become the page's
    /// initial before image.
    pub fn new(pid: HeapPageID, bytes: &[u8], schema: &Schema) -> Result<HeapPage, DbError> {
        if bytes.len() != BufferPool::get_page_size() {
            return Err(DbError::illegal_argument(&format!(
                "page {} has {} bytes, expected {}",
                pid,
                bytes.len(),
                BufferPool::get_page_size()
            )));
        }

        let slot_count = Self::calculate_slots_count(schema);
        let header_size = Self::calculate_header_size(slot_count);
        let header = BitVec::from_bytes(&bytes[..header_size]);
        let tuple_size = schema.get_size();

        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            if header[i] {
                let start = header_size + i * tuple_size;
                let mut tuple = Tuple::from_bytes(schema, &bytes[start..start + tuple_size])?;
                tuple.set_record_id(Some(RecordId::new(pid, i)));
                tuples.push(tuple);
            } else {
                tuples.push(Tuple::empty(schema));
            }
        }

        Ok(HeapPage {
            pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            dirtier: None,
            before_image: bytes.to_vec(),
        })
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header[slot]
    }

    fn mark_slot_status(&mut self, slot: usize, used: bool) {
        self.header.set(slot, used);
    }

    pub fn empty_slots_count(&self) -> usize {
        (0..self.slot_count).filter(|i| !self.is_slot_used(*i)).count()
    }

    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    /// Serializes the page back to its byte layout: header bitmap, then
    /// every slot body (zeros for empty slots), padded to the page size.
    pub fn get_page_data(&self) -> Vec<u8> {
        let page_size = BufferPool::get_page_size();
        let header_size = Self::calculate_header_size(self.slot_count);
        let tuple_size = self.schema.get_size();

        let mut data = self.header.to_bytes();
        data.truncate(header_size);
        data.resize(header_size, 0);

        for i in 0..self.slot_count {
            if self.is_slot_used(i) {
                data.append(&mut self.tuples[i].to_bytes());
            } else {
                data.extend(std::iter::repeat(0).take(tuple_size));
            }
        }

        data.resize(page_size, 0);
        data
    }

    /// Places the tuple into the first empty slot and stamps its record id.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> DbResult {
        if !tuple.get_schema().compatible(&self.schema) {
            return Err(DbError::database(&format!(
                "tuple schema {} does not match page schema {}",
                tuple.get_schema(),
                self.schema
            )));
        }

        let slot = (0..self.slot_count)
            .find(|i| !self.is_slot_used(*i))
            .ok_or_else(|| DbError::database(&format!("page {} has no empty slot", self.pid)))?;

        let mut stored = tuple.clone();
        stored.set_record_id(Some(RecordId::new(self.pid, slot)));
        self.tuples[slot] = stored;
        self.mark_slot_status(slot, true);
        debug!("inserted tuple into {} slot {}", self.pid, slot);
        Ok(())
    }

    /// Clears the slot named by the record id.
    pub fn delete_tuple(&mut self, rid: &RecordId) -> DbResult {
        if rid.pid != self.pid {
            return Err(DbError::database(&format!(
                "record {} does not belong to page {}",
                rid, self.pid
            )));
        }
        if rid.slot >= self.slot_count || !self.is_slot_used(rid.slot) {
            return Err(DbError::database(&format!("slot {} is not occupied", rid.slot)));
        }

        self.tuples[rid.slot] = Tuple::empty(&self.schema);
        self.mark_slot_status(rid.slot, false);
        Ok(())
    }

    pub fn get_tuple(&self, slot: usize) -> Option<Tuple> {
        if slot < self.slot_count && self.is_slot_used(slot) {
            return Some(self.tuples[slot].clone());
        }
        None
    }

    /// All occupied tuples in slot order, record ids attached.
    pub fn stored_tuples(&self) -> Vec<Tuple> {
        (0..self.slot_count)
            .filter(|i| self.is_slot_used(*i))
            .map(|i| self.tuples[i].clone())
            .collect()
    }

    pub fn dirtier(&self) -> Option<Transaction> {
        self.dirtier
    }

    pub fn mark_dirty(&mut self, dirtier: Option<Transaction>) {
        self.dirtier = dirtier;
    }

    /// Refreshes the rollback snapshot to the current bytes. Called at
    /// load time implicitly and at commit boundaries explicitly.
    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }

    pub fn get_before_image(&self) -> Vec<u8> {
        self.before_image.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::int_schema;

    #[test]
    fn test_slot_math() {
        let schema = int_schema(2, "t");
        let slots = HeapPage::calculate_slots_count(&schema);
        // 8 bytes per tuple, one header bit each
        assert_eq!(slots, BufferPool::get_page_size() * 8 / 65);
        assert_eq!(HeapPage::calculate_header_size(slots), (slots + 7) / 8);
    }

    #[test]
    fn test_serialization_round_trip() {
        let schema = int_schema(2, "t");
        let pid = HeapPageID::new(1, 0);
        let mut page = HeapPage::new(pid, &HeapPage::empty_page_data(), &schema).unwrap();

        for v in 0..5 {
            page.insert_tuple(&Tuple::new_int_tuple(v, 2)).unwrap();
        }
        assert_eq!(page.tuples_count(), 5);

        let reloaded = HeapPage::new(pid, &page.get_page_data(), &schema).unwrap();
        assert_eq!(reloaded.tuples_count(), 5);
        assert_eq!(reloaded.get_page_data(), page.get_page_data());
        let rid = reloaded.stored_tuples()[0].get_record_id().unwrap();
        assert_eq!(rid.pid, pid);
    }

    #[test]
    fn test_delete_clears_slot() {
        let schema = int_schema(2, "t");
        let pid = HeapPageID::new(1, 0);
        let mut page = HeapPage::new(pid, &HeapPage::empty_page_data(), &schema).unwrap();

        page.insert_tuple(&Tuple::new_int_tuple(9, 2)).unwrap();
        let rid = page.stored_tuples()[0].get_record_id().unwrap();
        page.delete_tuple(&rid).unwrap();

        assert_eq!(page.tuples_count(), 0);
        assert!(page.delete_tuple(&rid).is_err());
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let schema = int_schema(2, "t");
        let pid = HeapPageID::new(1, 0);
        let mut page = HeapPage::new(pid, &HeapPage::empty_page_data(), &schema).unwrap();
        assert!(page.insert_tuple(&Tuple::new_int_tuple(1, 3)).is_err());
    }
}
