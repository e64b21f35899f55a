use std::fmt;

use crate::error::DbError;

/// Fixed capacity of a string field on disk, excluding the length prefix.
pub const STRING_LEN: usize = 128;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Int,
    String,
}

/// On-disk width of a field of the given type. Strings carry a 4-byte
/// length prefix followed by `STRING_LEN` padded bytes.
pub fn get_type_length(t: Type) -> usize {
    match t {
        Type::Int => 4,
        Type::String => 4 + STRING_LEN,
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FieldItem {
    pub field_type: Type,
    pub field_name: String,
}

/// An ordered, immutable description of the fields of a tuple. Derived
/// equality is the strict form (types and names); use `compatible` where
/// only the types matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Schema {
        Schema { fields }
    }

    /// Concatenates two schemas into a new one, left fields first.
    pub fn merge(schema1: &Schema, schema2: &Schema) -> Schema {
        let mut fields = schema1.fields.clone();
        fields.extend(schema2.fields.iter().cloned());
        Schema { fields }
    }

    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }

    pub fn field_name(&self, i: usize) -> &str {
        &self.fields[i].field_name
    }

    pub fn index_of(&self, name: &str) -> Result<usize, DbError> {
        self.fields
            .iter()
            .position(|f| f.field_name == name)
            .ok_or_else(|| DbError::no_such_element(&format!("no field named {}", name)))
    }

    /// Tuple size in bytes.
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| get_type_length(f.field_type)).sum()
    }

    /// True when both schemas have the same types at every index, names
    /// ignored. Insert paths use this form.
    pub fn compatible(&self, other: &Schema) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let items: Vec<String> = self
            .fields
            .iter()
            .map(|item| format!("{}({:?})", item.field_name, item.field_type))
            .collect();
        write!(f, "({})", items.join(", "))
    }
}

/// Build a schema of `width` int columns, names derived from the prefix.
pub fn int_schema(width: usize, name_prefix: &str) -> Schema {
    let fields = (0..width)
        .map(|i| FieldItem {
            field_type: Type::Int,
            field_name: format!("{}-{}", name_prefix, i),
        })
        .collect();
    Schema { fields }
}
