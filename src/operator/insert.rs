use std::fmt;
use std::sync::Arc;

use crate::{
    database::Database,
    error::DbError,
    operator::{not_open_error, OpIterator},
    storage::{
        field::Field,
        schema::{FieldItem, Schema, Type},
        tuple::Tuple,
    },
    transaction::Transaction,
    types::DbResult,
};

fn count_desc() -> Schema {
    Schema::new(vec![FieldItem {
        field_type: Type::Int,
        field_name: "count".to_string(),
    }])
}

/// Drains the child and routes every tuple through the buffer pool into
/// the target table. Single shot: the first pull yields one tuple holding
/// the insert count, later pulls are end-of-stream.
pub struct Insert {
    db: Arc<Database>,
    tx: Transaction,
    child: Box<dyn OpIterator>,
    table_id: u32,
    called: bool,
    opened: bool,
}

impl fmt::Debug for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Insert")
            .field("tx", &self.tx)
            .field("table_id", &self.table_id)
            .field("called", &self.called)
            .field("opened", &self.opened)
            .finish()
    }
}

impl Insert {
    pub fn new(
        db: Arc<Database>,
        tx: &Transaction,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Insert, DbError> {
        let table_schema = db.catalog().get_schema(table_id)?;
        if !child.tuple_desc().compatible(&table_schema) {
            return Err(DbError::database(&format!(
                "child schema {} does not match table schema {}",
                child.tuple_desc(),
                table_schema
            )));
        }
        Ok(Insert {
            db,
            tx: *tx,
            child,
            table_id,
            called: false,
            opened: false,
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> DbResult {
        self.child.open()?;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.opened {
            return Err(not_open_error());
        }
        Ok(!self.called)
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::no_such_element("insert already executed"));
        }

        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.db
                .buffer_pool()
                .insert_tuple(&self.db, &self.tx, self.table_id, &tuple)?;
            count += 1;
        }
        self.called = true;
        Ok(Tuple::new(count_desc(), vec![Field::Int(count)]))
    }

    fn rewind(&mut self) -> DbResult {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.opened = false;
    }

    fn tuple_desc(&self) -> Schema {
        count_desc()
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        self.child = children.remove(0);
    }
}
