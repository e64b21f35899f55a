use crate::{
    error::DbError,
    operator::{not_open_error, OpIterator, Predicate},
    storage::{schema::Schema, tuple::Tuple},
    types::DbResult,
};

/// Passes through the child's tuples that satisfy the predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    next_tuple: Option<Tuple>,
    opened: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Filter {
        Filter {
            predicate,
            child,
            next_tuple: None,
            opened: false,
        }
    }

    pub fn get_predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> DbResult {
        self.child.open()?;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.opened {
            return Err(not_open_error());
        }
        if self.next_tuple.is_some() {
            return Ok(true);
        }
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.matches(&tuple) {
                self.next_tuple = Some(tuple);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::no_such_element("filter exhausted"));
        }
        Ok(self.next_tuple.take().unwrap())
    }

    fn rewind(&mut self) -> DbResult {
        self.child.rewind()?;
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.next_tuple = None;
        self.opened = false;
    }

    fn tuple_desc(&self) -> Schema {
        self.child.tuple_desc()
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        self.child = children.remove(0);
    }
}
