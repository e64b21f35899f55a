mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod predicate;
mod seq_scan;

pub use aggregate::{Aggregate, AggregateOp, IntAggregator, StringAggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use predicate::{JoinPredicate, Op, Predicate};
pub use seq_scan::SeqScan;

use crate::{error::DbError, storage::{schema::Schema, tuple::Tuple}, types::DbResult};

/// The uniform pull contract every operator implements. A parent opens its
/// children before reading and closes them on teardown. Pulling before
/// `open` is an illegal operator state; pulling past the end is
/// `NoSuchElement`.
pub trait OpIterator {
    fn open(&mut self) -> DbResult;

    fn has_next(&mut self) -> Result<bool, DbError>;

    fn next(&mut self) -> Result<Tuple, DbError>;

    fn rewind(&mut self) -> DbResult;

    fn close(&mut self);

    fn tuple_desc(&self) -> Schema;

    /// Children in position order; leaves return an empty list.
    fn children(&self) -> Vec<&dyn OpIterator> {
        Vec::new()
    }

    /// Replaces children by position.
    fn set_children(&mut self, _children: Vec<Box<dyn OpIterator>>) {}
}

pub(crate) fn not_open_error() -> DbError {
    DbError::database("operator is not open")
}
