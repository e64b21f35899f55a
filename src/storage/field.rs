use std::{cmp::Ordering, fmt};

use crate::{
    error::DbError,
    storage::schema::{Type, STRING_LEN},
};

/// A single typed value. Equality and hashing are value based. `Ungrouped`
/// is the sentinel grouping key used by aggregation when no group-by field
/// is requested; it never appears in stored tuples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    String(String),
    Ungrouped,
}

impl Field {
    pub fn get_type(&self) -> Option<Type> {
        match self {
            Field::Int(_) => Some(Type::Int),
            Field::String(_) => Some(Type::String),
            Field::Ungrouped => None,
        }
    }

    /// Serializes the field to its fixed on-disk width. Overlong strings
    /// are truncated to the schema capacity.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Field::Int(v) => v.to_be_bytes().to_vec(),
            Field::String(s) => {
                let bytes = s.as_bytes();
                let n = bytes.len().min(STRING_LEN);
                let mut out = Vec::with_capacity(4 + STRING_LEN);
                out.extend_from_slice(&(n as u32).to_be_bytes());
                out.extend_from_slice(&bytes[..n]);
                out.resize(4 + STRING_LEN, 0);
                out
            }
            Field::Ungrouped => Vec::new(),
        }
    }

    /// Decodes one field of the given type from the start of `bytes`. The
    /// slice must cover the full fixed width of the type.
    pub fn from_bytes(t: Type, bytes: &[u8]) -> Result<Field, DbError> {
        if bytes.len() < 4 {
            return Err(DbError::illegal_argument("field bytes truncated"));
        }
        let arr: [u8; 4] = bytes[..4].try_into().unwrap();
        match t {
            Type::Int => Ok(Field::Int(i32::from_be_bytes(arr))),
            Type::String => {
                let len = u32::from_be_bytes(arr) as usize;
                if len > STRING_LEN || 4 + len > bytes.len() {
                    return Err(DbError::illegal_argument(&format!(
                        "string length {} out of range",
                        len
                    )));
                }
                let s = std::str::from_utf8(&bytes[4..4 + len])
                    .map_err(|_| DbError::illegal_argument("string field is not valid utf-8"))?;
                Ok(Field::String(s.to_string()))
            }
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.partial_cmp(b),
            (Field::String(a), Field::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::String(s) => write!(f, "{}", s),
            Field::Ungrouped => write!(f, "(ungrouped)"),
        }
    }
}
