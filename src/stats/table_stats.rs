use std::{collections::HashMap, sync::Arc};

use log::info;

use crate::{
    database::Database,
    error::DbError,
    operator::{Op, OpIterator, SeqScan},
    stats::histogram::{string_to_int, IntHistogram, StringHistogram},
    storage::{
        field::Field,
        heap_table::HeapTable,
        schema::{Schema, Type},
    },
    transaction::Transaction,
    types::DbResult,
};

/// Bins per histogram.
pub const NUM_HIST_BINS: usize = 100;
/// Default cost of reading one page, with no distinction between
/// sequential and seeking I/O.
pub const IO_COST_PER_PAGE: usize = 1000;

/// Integer projection of a field for min/max bookkeeping. Strings fold
/// through the same bounded projection the string histogram uses.
fn stats_value(field: &Field) -> i32 {
    match field {
        Field::Int(v) => *v,
        Field::String(s) => string_to_int(s),
        Field::Ungrouped => 0,
    }
}

/// Per-table statistics: one histogram per column plus the table volume,
/// built from two sequential scans (min/max first, then population).
pub struct TableStats {
    table: Arc<HeapTable>,
    schema: Schema,
    io_cost_per_page: usize,
    n_tup: usize,
    int_histograms: HashMap<usize, IntHistogram>,
    string_histograms: HashMap<usize, StringHistogram>,
}

impl TableStats {
    pub fn new(
        db: &Arc<Database>,
        table_id: u32,
        io_cost_per_page: usize,
    ) -> Result<TableStats, DbError> {
        let table = db.catalog().get_table(table_id)?;
        let schema = table.get_schema().clone();
        let num_fields = schema.fields_count();

        let mut mins = vec![i32::MAX; num_fields];
        let mut maxs = vec![i32::MIN; num_fields];
        let mut n_tup = 0;

        let tx = Transaction::new();
        let mut scan = SeqScan::new(db.clone(), &tx, table_id, "stats")?;
        scan.open()?;
        while scan.has_next()? {
            let tuple = scan.next()?;
            n_tup += 1;
            for i in 0..num_fields {
                let v = stats_value(tuple.get_field(i));
                mins[i] = mins[i].min(v);
                maxs[i] = maxs[i].max(v);
            }
        }
        if n_tup == 0 {
            mins.fill(0);
            maxs.fill(0);
        }

        let mut int_histograms = HashMap::new();
        let mut string_histograms = HashMap::new();
        for i in 0..num_fields {
            match schema.get_field_type(i) {
                Type::Int => {
                    int_histograms.insert(i, IntHistogram::new(NUM_HIST_BINS, mins[i], maxs[i]));
                }
                Type::String => {
                    string_histograms.insert(i, StringHistogram::new(NUM_HIST_BINS));
                }
            }
        }

        scan.rewind()?;
        while scan.has_next()? {
            let tuple = scan.next()?;
            for i in 0..num_fields {
                match tuple.get_field(i) {
                    Field::Int(v) => {
                        if let Some(hist) = int_histograms.get_mut(&i) {
                            hist.add_value(*v);
                        }
                    }
                    Field::String(s) => {
                        if let Some(hist) = string_histograms.get_mut(&i) {
                            hist.add_value(s);
                        }
                    }
                    Field::Ungrouped => {}
                }
            }
        }
        scan.close();
        tx.commit(db)?;

        Ok(TableStats {
            table,
            schema,
            io_cost_per_page,
            n_tup,
            int_histograms,
            string_histograms,
        })
    }

    /// Cost of a full sequential scan; partial pages cost a whole page.
    pub fn estimate_scan_cost(&self) -> f64 {
        self.table.num_pages() as f64 * self.io_cost_per_page as f64
    }

    /// Tuples surviving a predicate of the given selectivity.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.n_tup as f64 * selectivity) as usize
    }

    /// Selectivity of `field op constant` against this table.
    pub fn estimate_selectivity(
        &self,
        field: usize,
        op: Op,
        constant: &Field,
    ) -> Result<f64, DbError> {
        match self.schema.get_field_type(field) {
            Type::Int => match constant {
                Field::Int(v) => self
                    .int_histograms
                    .get(&field)
                    .ok_or_else(|| DbError::database("missing histogram"))?
                    .estimate_selectivity(op, *v),
                other => Err(DbError::illegal_argument(&format!(
                    "int column compared against {}",
                    other
                ))),
            },
            Type::String => match constant {
                Field::String(s) => self
                    .string_histograms
                    .get(&field)
                    .ok_or_else(|| DbError::database("missing histogram"))?
                    .estimate_selectivity(op, s),
                other => Err(DbError::illegal_argument(&format!(
                    "string column compared against {}",
                    other
                ))),
            },
        }
    }

    /// Expected selectivity of the field under the operator when the
    /// constant is unknown.
    pub fn avg_selectivity(&self, field: usize, _op: Op) -> f64 {
        match self.schema.get_field_type(field) {
            Type::Int => self
                .int_histograms
                .get(&field)
                .map_or(0.0, |h| h.avg_selectivity()),
            Type::String => self
                .string_histograms
                .get(&field)
                .map_or(0.0, |h| h.avg_selectivity()),
        }
    }

    pub fn total_tuples(&self) -> usize {
        self.n_tup
    }
}

/// Builds statistics for every cataloged table and records them in the
/// database's registry.
pub fn compute_statistics(db: &Arc<Database>) -> DbResult {
    let table_ids = db.catalog().table_ids();
    info!("computing statistics for {} tables", table_ids.len());

    for table_id in table_ids {
        let name = match db.catalog().get_table_name(table_id) {
            Some(name) => name,
            None => continue,
        };
        let stats = TableStats::new(db, table_id, IO_COST_PER_PAGE)?;
        db.set_table_stats(&name, Arc::new(stats));
    }
    Ok(())
}
