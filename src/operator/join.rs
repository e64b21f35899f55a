use crate::{
    error::DbError,
    operator::{not_open_error, JoinPredicate, OpIterator},
    storage::{schema::Schema, tuple::Tuple},
    types::DbResult,
};

/// Nested-loops join. The left child is the outer relation; the right is
/// rewound once per outer tuple. The output schema is the concatenation of
/// both children's schemas.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,

    current_left: Option<Tuple>,
    next_tuple: Option<Tuple>,
    opened: bool,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Join {
        Join {
            predicate,
            left,
            right,
            current_left: None,
            next_tuple: None,
            opened: false,
        }
    }

    pub fn get_predicate(&self) -> &JoinPredicate {
        &self.predicate
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> DbResult {
        self.left.open()?;
        self.right.open()?;
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

        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(false);
                }
                self.current_left = Some(self.left.next()?);
                self.right.rewind()?;
            }

            let left_tuple = self.current_left.clone().unwrap();
            while self.right.has_next()? {
                let right_tuple = self.right.next()?;
                if self.predicate.matches(&left_tuple, &right_tuple) {
                    self.next_tuple = Some(Tuple::merge(&left_tuple, &right_tuple));
                    return Ok(true);
                }
            }

            self.current_left = None;
        }
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::no_such_element("join exhausted"));
        }
        Ok(self.next_tuple.take().unwrap())
    }

    fn rewind(&mut self) -> DbResult {
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.current_left = None;
        self.next_tuple = None;
        self.opened = false;
    }

    fn tuple_desc(&self) -> Schema {
        Schema::merge(&self.left.tuple_desc(), &self.right.tuple_desc())
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        self.left = children.remove(0);
        self.right = children.remove(0);
    }
}
