use std::{cmp::Ordering, fmt};

use crate::storage::{field::Field, tuple::Tuple};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    Like,
    NotEquals,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::Like => "like",
            Op::NotEquals => "<>",
        };
        write!(f, "{}", repr)
    }
}

pub(crate) fn compare_fields(left: &Field, op: Op, right: &Field) -> bool {
    match op {
        Op::Equals => left == right,
        Op::NotEquals => left != right,
        Op::GreaterThan => left.partial_cmp(right) == Some(Ordering::Greater),
        Op::GreaterThanOrEq => matches!(
            left.partial_cmp(right),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        Op::LessThan => left.partial_cmp(right) == Some(Ordering::Less),
        Op::LessThanOrEq => matches!(
            left.partial_cmp(right),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
        // substring match on strings, plain equality on ints
        Op::Like => match (left, right) {
            (Field::String(s), Field::String(pattern)) => s.contains(pattern.as_str()),
            _ => left == right,
        },
    }
}

/// Compares one tuple field against a constant.
#[derive(Clone)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub operand: Field,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, operand: &Field) -> Self {
        Self {
            field_index,
            op,
            operand: operand.clone(),
        }
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        compare_fields(tuple.get_field(self.field_index), self.op, &self.operand)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "f[{}] {} {}", self.field_index, self.op, self.operand)
    }
}

/// Compares a field of one tuple against a field of another, used by
/// joins.
#[derive(Clone)]
pub struct JoinPredicate {
    pub field1: usize,
    pub op: Op,
    pub field2: usize,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: Op, field2: usize) -> Self {
        Self { field1, op, field2 }
    }

    pub fn matches(&self, left: &Tuple, right: &Tuple) -> bool {
        compare_fields(left.get_field(self.field1), self.op, right.get_field(self.field2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_comparisons() {
        let tuple = Tuple::new_int_tuple(5, 1);
        assert!(Predicate::new(0, Op::Equals, &Field::Int(5)).matches(&tuple));
        assert!(Predicate::new(0, Op::GreaterThan, &Field::Int(4)).matches(&tuple));
        assert!(Predicate::new(0, Op::LessThanOrEq, &Field::Int(5)).matches(&tuple));
        assert!(!Predicate::new(0, Op::NotEquals, &Field::Int(5)).matches(&tuple));
    }

    #[test]
    fn test_cross_type_never_matches_order() {
        let tuple = Tuple::new_int_tuple(5, 1);
        let pred = Predicate::new(0, Op::GreaterThan, &Field::String("4".to_string()));
        assert!(!pred.matches(&tuple));
    }

    #[test]
    fn test_like_is_substring_on_strings() {
        assert!(compare_fields(
            &Field::String("database".to_string()),
            Op::Like,
            &Field::String("tab".to_string()),
        ));
        assert!(!compare_fields(
            &Field::String("database".to_string()),
            Op::Like,
            &Field::String("xyz".to_string()),
        ));
        assert!(compare_fields(&Field::Int(3), Op::Like, &Field::Int(3)));
    }
}
