use std::fmt;

use crate::{
    error::DbError,
    storage::{
        field::Field,
        page_id::RecordId,
        schema::{get_type_length, int_schema, Schema, Type},
    },
};

/// A fixed-arity record of typed fields. Tuples are value objects owned by
/// whoever reads them; the record id points back at the storage location
/// and is ignored by equality.
#[derive(Debug, Clone)]
pub struct Tuple {
    schema: Schema,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(schema: Schema, fields: Vec<Field>) -> Tuple {
        debug_assert_eq!(schema.fields_count(), fields.len());
        Tuple {
            schema,
            fields,
            record_id: None,
        }
    }

    /// A tuple of zero values conforming to the schema, used for the empty
    /// slots of a page.
    pub fn empty(schema: &Schema) -> Tuple {
        let fields = schema
            .fields
            .iter()
            .map(|item| match item.field_type {
                Type::Int => Field::Int(0),
                Type::String => Field::String(String::new()),
            })
            .collect();
        Tuple {
            schema: schema.clone(),
            fields,
            record_id: None,
        }
    }

    /// A tuple of `width` int columns all set to `value`.
    pub fn new_int_tuple(value: i32, width: usize) -> Tuple {
        let schema = int_schema(width, "");
        let fields = vec![Field::Int(value); width];
        Tuple {
            schema,
            fields,
            record_id: None,
        }
    }

    /// Decodes one tuple body from the fixed byte layout described by the
    /// schema.
    pub fn from_bytes(schema: &Schema, bytes: &[u8]) -> Result<Tuple, DbError> {
        let mut fields = Vec::with_capacity(schema.fields_count());
        let mut start = 0;
        for item in &schema.fields {
            let width = get_type_length(item.field_type);
            if start + width > bytes.len() {
                return Err(DbError::illegal_argument("tuple body truncated"));
            }
            fields.push(Field::from_bytes(item.field_type, &bytes[start..start + width])?);
            start += width;
        }
        Ok(Tuple {
            schema: schema.clone(),
            fields,
            record_id: None,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.schema.get_size());
        for field in &self.fields {
            bytes.append(&mut field.to_bytes());
        }
        bytes
    }

    pub fn get_field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn set_field(&mut self, i: usize, f: Field) {
        self.fields[i] = f;
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    /// Concatenation of two tuples, used by joins. The result has no
    /// storage location.
    pub fn merge(left: &Tuple, right: &Tuple) -> Tuple {
        let schema = Schema::merge(&left.schema, &right.schema);
        let mut fields = left.fields.clone();
        fields.extend(right.fields.iter().cloned());
        Tuple {
            schema,
            fields,
            record_id: None,
        }
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema.compatible(&other.schema) && self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let items: Vec<String> = self.fields.iter().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::FieldItem;

    fn mixed_schema() -> Schema {
        Schema::new(vec![
            FieldItem {
                field_type: Type::Int,
                field_name: "id".to_string(),
            },
            FieldItem {
                field_type: Type::String,
                field_name: "name".to_string(),
            },
        ])
    }

    #[test]
    fn test_round_trip() {
        let schema = mixed_schema();
        let tuple = Tuple::new(
            schema.clone(),
            vec![Field::Int(7), Field::String("seven".to_string())],
        );
        let decoded = Tuple::from_bytes(&schema, &tuple.to_bytes()).unwrap();
        assert_eq!(decoded, tuple);
    }

    #[test]
    fn test_equality_ignores_record_id() {
        let mut a = Tuple::new_int_tuple(3, 2);
        let b = Tuple::new_int_tuple(3, 2);
        a.set_record_id(Some(RecordId::new(
            crate::storage::page_id::HeapPageID::new(1, 0),
            4,
        )));
        assert_eq!(a, b);
    }

    #[test]
    fn test_merge_concatenates() {
        let left = Tuple::new_int_tuple(1, 2);
        let right = Tuple::new_int_tuple(2, 1);
        let merged = Tuple::merge(&left, &right);
        assert_eq!(merged.get_schema().fields_count(), 3);
        assert_eq!(merged.get_field(2), &Field::Int(2));
        assert!(merged.get_record_id().is_none());
    }
}
