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

/// Drains the child and removes every tuple, resolved through its record
/// id, via the buffer pool. Single shot like `Insert`.
pub struct Delete {
    db: Arc<Database>,
    tx: Transaction,
    child: Box<dyn OpIterator>,
    called: bool,
    opened: bool,
}

impl Delete {
    pub fn new(db: Arc<Database>, tx: &Transaction, child: Box<dyn OpIterator>) -> Delete {
        Delete {
            db,
            tx: *tx,
            child,
            called: false,
            opened: false,
        }
    }
}

impl OpIterator for Delete {
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
            return Err(DbError::no_such_element("delete already executed"));
        }

        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.db.buffer_pool().delete_tuple(&self.db, &self.tx, &tuple)?;
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
