use std::fmt;

/// Identifier of one heap page: the owning table plus the page's position
/// in the backing file. Stable across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapPageID {
    pub table_id: u32,
    pub page_index: u32,
}

impl HeapPageID {
    pub fn new(table_id: u32, page_index: u32) -> Self {
        Self {
            table_id,
            page_index,
        }
    }
}

impl fmt::Display for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "table_{}_page_{}", self.table_id, self.page_index)
    }
}

/// Identifier of one tuple: the page it lives on plus its slot there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub pid: HeapPageID,
    pub slot: usize,
}

impl RecordId {
    pub fn new(pid: HeapPageID, slot: usize) -> Self {
        Self { pid, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_slot_{}", self.pid, self.slot)
    }
}
