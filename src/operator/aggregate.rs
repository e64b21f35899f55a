use std::{collections::HashMap, fmt};

use crate::{
    error::DbError,
    operator::{not_open_error, OpIterator},
    storage::{
        field::Field,
        schema::{FieldItem, Schema, Type},
        tuple::Tuple,
    },
    types::DbResult,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", repr)
    }
}

/// Running state per aggregation operator, keyed by group field. Average
/// keeps sum and count separately and truncates on read-out.
enum AggregateHandler {
    Min(HashMap<Field, i32>),
    Max(HashMap<Field, i32>),
    Sum(HashMap<Field, i32>),
    Count(HashMap<Field, i32>),
    Avg {
        sums: HashMap<Field, i32>,
        counts: HashMap<Field, i32>,
    },
}

impl AggregateHandler {
    fn new(op: AggregateOp) -> Self {
        match op {
            AggregateOp::Min => AggregateHandler::Min(HashMap::new()),
            AggregateOp::Max => AggregateHandler::Max(HashMap::new()),
            AggregateOp::Sum => AggregateHandler::Sum(HashMap::new()),
            AggregateOp::Count => AggregateHandler::Count(HashMap::new()),
            AggregateOp::Avg => AggregateHandler::Avg {
                sums: HashMap::new(),
                counts: HashMap::new(),
            },
        }
    }

    fn merge(&mut self, key: Field, value: i32) {
        match self {
            AggregateHandler::Min(groups) => {
                groups
                    .entry(key)
                    .and_modify(|v| *v = (*v).min(value))
                    .or_insert(value);
            }
            AggregateHandler::Max(groups) => {
                groups
                    .entry(key)
                    .and_modify(|v| *v = (*v).max(value))
                    .or_insert(value);
            }
            AggregateHandler::Sum(groups) => {
                *groups.entry(key).or_insert(0) += value;
            }
            AggregateHandler::Count(groups) => {
                *groups.entry(key).or_insert(0) += 1;
            }
            AggregateHandler::Avg { sums, counts } => {
                *sums.entry(key.clone()).or_insert(0) += value;
                *counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    fn results(&self) -> Vec<(Field, i32)> {
        match self {
            AggregateHandler::Min(groups)
            | AggregateHandler::Max(groups)
            | AggregateHandler::Sum(groups)
            | AggregateHandler::Count(groups) => {
                groups.iter().map(|(k, v)| (k.clone(), *v)).collect()
            }
            AggregateHandler::Avg { sums, counts } => sums
                .iter()
                .map(|(k, sum)| (k.clone(), *sum / counts[k]))
                .collect(),
        }
    }
}

/// Computes one aggregate over int fields, optionally grouped. With no
/// grouping the sentinel `Field::Ungrouped` keys the single running state,
/// so one code path handles both shapes.
pub struct IntAggregator {
    group_by: Option<usize>,
    a_field: usize,
    handler: AggregateHandler,
}

impl IntAggregator {
    pub fn new(group_by: Option<usize>, a_field: usize, op: AggregateOp) -> IntAggregator {
        IntAggregator {
            group_by,
            a_field,
            handler: AggregateHandler::new(op),
        }
    }

    pub fn merge(&mut self, tuple: &Tuple) -> DbResult {
        let value = match tuple.get_field(self.a_field) {
            Field::Int(v) => *v,
            other => {
                return Err(DbError::illegal_argument(&format!(
                    "int aggregator fed a non-int field: {}",
                    other
                )))
            }
        };
        let key = match self.group_by {
            Some(g) => tuple.get_field(g).clone(),
            None => Field::Ungrouped,
        };
        self.handler.merge(key, value);
        Ok(())
    }

    pub fn results(&self) -> Vec<(Field, i32)> {
        self.handler.results()
    }
}

/// Computes aggregates over string fields. Only COUNT is meaningful.
pub struct StringAggregator {
    group_by: Option<usize>,
    a_field: usize,
    counts: HashMap<Field, i32>,
}

impl StringAggregator {
    pub fn new(
        group_by: Option<usize>,
        a_field: usize,
        op: AggregateOp,
    ) -> Result<StringAggregator, DbError> {
        if op != AggregateOp::Count {
            return Err(DbError::illegal_argument(&format!(
                "string fields only support count, got {}",
                op
            )));
        }
        Ok(StringAggregator {
            group_by,
            a_field,
            counts: HashMap::new(),
        })
    }

    pub fn merge(&mut self, tuple: &Tuple) -> DbResult {
        match tuple.get_field(self.a_field) {
            Field::String(_) => {}
            other => {
                return Err(DbError::illegal_argument(&format!(
                    "string aggregator fed a non-string field: {}",
                    other
                )))
            }
        }
        let key = match self.group_by {
            Some(g) => tuple.get_field(g).clone(),
            None => Field::Ungrouped,
        };
        *self.counts.entry(key).or_insert(0) += 1;
        Ok(())
    }

    pub fn results(&self) -> Vec<(Field, i32)> {
        self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

enum AnyAggregator {
    Int(IntAggregator),
    Str(StringAggregator),
}

impl AnyAggregator {
    fn merge(&mut self, tuple: &Tuple) -> DbResult {
        match self {
            AnyAggregator::Int(a) => a.merge(tuple),
            AnyAggregator::Str(a) => a.merge(tuple),
        }
    }

    fn results(&self) -> Vec<(Field, i32)> {
        match self {
            AnyAggregator::Int(a) => a.results(),
            AnyAggregator::Str(a) => a.results(),
        }
    }
}

/// Aggregation over a single column, grouped by at most one other column.
/// `open` drains the child into the aggregator; afterwards the operator
/// yields one tuple per group.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    a_field: usize,
    group_by: Option<usize>,
    op: AggregateOp,

    results: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        a_field: usize,
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Aggregate {
        Aggregate {
            child,
            a_field,
            group_by,
            op,
            results: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    pub fn aggregate_op(&self) -> AggregateOp {
        self.op
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_by
    }

    pub fn aggregate_field(&self) -> usize {
        self.a_field
    }

    fn output_desc(&self) -> Schema {
        let child_desc = self.child.tuple_desc();
        let agg_item = FieldItem {
            field_type: Type::Int,
            field_name: format!("{}({})", self.op, child_desc.field_name(self.a_field)),
        };
        match self.group_by {
            Some(g) => Schema::new(vec![
                FieldItem {
                    field_type: child_desc.get_field_type(g),
                    field_name: child_desc.field_name(g).to_string(),
                },
                agg_item,
            ]),
            None => Schema::new(vec![agg_item]),
        }
    }

    fn build_aggregator(&self) -> Result<AnyAggregator, DbError> {
        let child_desc = self.child.tuple_desc();
        match child_desc.get_field_type(self.a_field) {
            Type::Int => Ok(AnyAggregator::Int(IntAggregator::new(
                self.group_by,
                self.a_field,
                self.op,
            ))),
            Type::String => Ok(AnyAggregator::Str(StringAggregator::new(
                self.group_by,
                self.a_field,
                self.op,
            )?)),
        }
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> DbResult {
        let mut aggregator = self.build_aggregator()?;

        self.child.open()?;
        while self.child.has_next()? {
            aggregator.merge(&self.child.next()?)?;
        }

        let desc = self.output_desc();
        self.results = aggregator
            .results()
            .into_iter()
            .map(|(key, value)| match self.group_by {
                Some(_) => Tuple::new(desc.clone(), vec![key, Field::Int(value)]),
                None => Tuple::new(desc.clone(), vec![Field::Int(value)]),
            })
            .collect();
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.opened {
            return Err(not_open_error());
        }
        Ok(self.cursor < self.results.len())
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::no_such_element("aggregate exhausted"));
        }
        let tuple = self.results[self.cursor].clone();
        self.cursor += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> DbResult {
        if !self.opened {
            return Err(not_open_error());
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results.clear();
        self.cursor = 0;
        self.opened = false;
    }

    fn tuple_desc(&self) -> Schema {
        self.output_desc()
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        self.child = children.remove(0);
    }
}
