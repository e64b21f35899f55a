use std::sync::Arc;

use crate::{
    database::Database,
    error::DbError,
    operator::{not_open_error, OpIterator},
    storage::{
        heap_table::{HeapTable, HeapTableIterator},
        schema::{FieldItem, Schema},
        tuple::Tuple,
    },
    transaction::Transaction,
    types::DbResult,
};

/// Sequential scan over one table on behalf of a transaction. The alias
/// qualifies field names in the published schema so the same table can
/// appear twice in a tree.
pub struct SeqScan {
    table: Arc<HeapTable>,
    alias: String,
    iter: HeapTableIterator,
    opened: bool,
}

impl SeqScan {
    pub fn new(
        db: Arc<Database>,
        tx: &Transaction,
        table_id: u32,
        alias: &str,
    ) -> Result<SeqScan, DbError> {
        let table = db.catalog().get_table(table_id)?;
        let iter = HeapTableIterator::new(db, *tx, table.clone());
        Ok(SeqScan {
            table,
            alias: alias.to_string(),
            iter,
            opened: false,
        })
    }

    pub fn get_alias(&self) -> &str {
        &self.alias
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> DbResult {
        self.iter.open()?;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.opened {
            return Err(not_open_error());
        }
        self.iter.has_next()
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.opened {
            return Err(not_open_error());
        }
        self.iter.next()
    }

    fn rewind(&mut self) -> DbResult {
        if !self.opened {
            return Err(not_open_error());
        }
        self.iter.rewind()
    }

    fn close(&mut self) {
        self.iter.close();
        self.opened = false;
    }

    fn tuple_desc(&self) -> Schema {
        let fields = self
            .table
            .get_schema()
            .fields
            .iter()
            .map(|item| FieldItem {
                field_type: item.field_type,
                field_name: format!("{}.{}", self.alias, item.field_name),
            })
            .collect();
        Schema::new(fields)
    }
}
