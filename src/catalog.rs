use std::{collections::HashMap, fs, path::Path, sync::Arc};

use log::info;

use crate::{
    error::DbError,
    storage::{
        heap_table::HeapTable,
        schema::{FieldItem, Schema, Type},
    },
};

struct CatalogEntry {
    name: String,
    primary_key: String,
    table: Arc<HeapTable>,
}

/// Registry of every table the database knows about, keyed by table id
/// with an inverse name index. Initialized once, read-mostly afterwards.
pub struct Catalog {
    tables: HashMap<u32, CatalogEntry>,
    name_to_id: HashMap<String, u32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            name_to_id: HashMap::new(),
        }
    }

    /// Registers a table under a name. Re-adding a name replaces the old
    /// entry.
    pub fn add_table(&mut self, table: Arc<HeapTable>, name: &str, primary_key: &str) {
        if let Some(old_id) = self.name_to_id.remove(name) {
            self.tables.remove(&old_id);
        }
        let table_id = table.get_id();
        self.name_to_id.insert(name.to_string(), table_id);
        self.tables.insert(
            table_id,
            CatalogEntry {
                name: name.to_string(),
                primary_key: primary_key.to_string(),
                table,
            },
        );
        info!("table {} registered with id {}", name, table_id);
    }

    pub fn get_table(&self, table_id: u32) -> Result<Arc<HeapTable>, DbError> {
        self.tables
            .get(&table_id)
            .map(|e| e.table.clone())
            .ok_or_else(|| DbError::no_such_element(&format!("table {} not found", table_id)))
    }

    pub fn get_table_id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    pub fn get_table_name(&self, table_id: u32) -> Option<String> {
        self.tables.get(&table_id).map(|e| e.name.clone())
    }

    pub fn get_schema(&self, table_id: u32) -> Result<Schema, DbError> {
        Ok(self.get_table(table_id)?.get_schema().clone())
    }

    pub fn get_primary_key(&self, table_id: u32) -> Option<String> {
        self.tables.get(&table_id).map(|e| e.primary_key.clone())
    }

    pub fn table_ids(&self) -> Vec<u32> {
        self.tables.keys().copied().collect()
    }

    /// Loads a catalog description file: one table per line in the form
    /// `name (col type [pk], ...)` with `type` one of `int` and `string`.
    /// Backing files are created under `data_dir` as `<name>.dat`.
    pub fn load_schema(&mut self, schema_file: &Path, data_dir: &Path) -> Result<Vec<u32>, DbError> {
        let content = fs::read_to_string(schema_file)?;
        let mut loaded = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let open = line
                .find('(')
                .ok_or_else(|| DbError::illegal_argument(&format!("malformed catalog line: {}", line)))?;
            let close = line
                .rfind(')')
                .ok_or_else(|| DbError::illegal_argument(&format!("malformed catalog line: {}", line)))?;
            let name = line[..open].trim();
            let columns = &line[open + 1..close];

            let mut fields = Vec::new();
            let mut primary_key = String::new();
            for column in columns.split(',') {
                let parts: Vec<&str> = column.split_whitespace().collect();
                if parts.len() < 2 {
                    return Err(DbError::illegal_argument(&format!(
                        "malformed column in table {}: {}",
                        name, column
                    )));
                }
                let field_type = match parts[1].to_lowercase().as_str() {
                    "int" => Type::Int,
                    "string" => Type::String,
                    other => {
                        return Err(DbError::illegal_argument(&format!(
                            "unknown column type {} in table {}",
                            other, name
                        )))
                    }
                };
                if parts.len() > 2 && parts[2] == "pk" {
                    primary_key = parts[0].to_string();
                }
                fields.push(FieldItem {
                    field_type,
                    field_name: parts[0].to_string(),
                });
            }

            let table = HeapTable::new(data_dir.join(format!("{}.dat", name)), &Schema::new(fields))?;
            let table_id = table.get_id();
            self.add_table(Arc::new(table), name, &primary_key);
            loaded.push(table_id);
        }

        Ok(loaded)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
