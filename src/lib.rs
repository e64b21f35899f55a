pub mod buffer_pool;
pub mod catalog;
pub mod database;
pub mod error;
pub mod lock_table;
pub mod operator;
pub mod stats;
pub mod storage;
pub mod transaction;
pub mod tx_log;
pub mod types;
pub mod utils;

pub use buffer_pool::BufferPool;
pub use catalog::Catalog;
pub use database::Database;
pub use error::{DbError, ErrorKind};
pub use lock_table::{Lock, LockTable, Permission};
pub use storage::{
    field::Field,
    heap_page::HeapPage,
    heap_table::HeapTable,
    page_id::{HeapPageID, RecordId},
    schema::{int_schema, FieldItem, Schema, Type},
    tuple::Tuple,
};
pub use transaction::Transaction;
