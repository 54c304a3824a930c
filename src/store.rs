//! Where tables come from and go to.
//!
//! The pipeline itself only sees [`Table`]s. A [`TableStore`] names them:
//! the sparse input, each stage's intermediate and the final lookup table.
//! Writing a name that already exists replaces that table.
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{ErltError, ErltResult};
use crate::table::{Label, Row, Schema, Table};

pub trait TableStore {
    /// Read the columns of `schema` from the table called `name`.
    ///
    /// Columns not in `schema` are ignored.
    fn read_table(&self, name: &str, schema: &Schema) -> ErltResult<Table>;

    /// Store `table` under `name`, replacing any previous table of that name.
    fn write_table(&mut self, name: &str, table: &Table) -> ErltResult<()>;
}

/// Tables kept in memory, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, table: Table) {
        self.tables.insert(name.to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl TableStore for MemoryStore {
    fn read_table(&self, name: &str, schema: &Schema) -> ErltResult<Table> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| ErltError::TableNotFound(name.to_string()))?;
        project(table, schema)
    }

    fn write_table(&mut self, name: &str, table: &Table) -> ErltResult<()> {
        self.tables.insert(name.to_string(), table.clone());
        Ok(())
    }
}

/// Copy the columns of `schema` out of `table`, in schema order.
fn project(table: &Table, schema: &Schema) -> ErltResult<Table> {
    if table.dims() == schema.dims.as_slice()
        && table.quantities() == schema.quantities.as_slice()
    {
        return Ok(table.clone());
    }
    let dims = schema
        .dims
        .iter()
        .map(|c| table.dim_index(c))
        .collect::<ErltResult<Vec<_>>>()?;
    let quantities = schema
        .quantities
        .iter()
        .map(|q| table.quantity_index(q))
        .collect::<ErltResult<Vec<_>>>()?;
    let mut out = Table::from_schema(schema)?;
    for row in table.rows() {
        out.push_row(Row {
            keys: dims.iter().map(|&j| row.keys[j].clone()).collect(),
            values: quantities.iter().map(|&q| row.values[q]).collect(),
        })?;
    }
    Ok(out)
}

/// One `<name>.csv` file per table under a root directory.
///
/// Dimension fields are trimmed, then read as numbers when they parse as
/// numbers and as text otherwise (see [`Label::parse`]). A text label such as
/// `"1"` or `" Austin "` therefore comes back as `1` or `"Austin"`. Quantity
/// fields must be non-negative numbers; an empty field is an error, not a
/// hole.
#[derive(Clone, Debug)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.csv"))
    }
}

impl TableStore for CsvStore {
    fn read_table(&self, name: &str, schema: &Schema) -> ErltResult<Table> {
        let path = self.path_of(name);
        if !path.is_file() {
            return Err(ErltError::TableNotFound(path.display().to_string()));
        }
        let mut rdr = csv::Reader::from_path(&path)?;
        let headers = rdr.headers()?.clone();
        let column = |name: &String| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ErltError::UnknownColumn(name.clone()))
        };
        let dims = schema.dims.iter().map(column).collect::<ErltResult<Vec<_>>>()?;
        let quantities = schema
            .quantities
            .iter()
            .map(column)
            .collect::<ErltResult<Vec<_>>>()?;

        let mut table = Table::from_schema(schema)?;
        for record in rdr.records() {
            let record = record?;
            let field = |j: usize| record.get(j).unwrap_or("");
            let keys = dims.iter().map(|&j| Label::parse(field(j))).collect();
            let values = quantities
                .iter()
                .zip(schema.quantities.iter())
                .map(|(&j, q)| {
                    let raw = field(j).trim();
                    raw.parse::<f64>().map_err(|_| ErltError::Parse {
                        column: q.clone(),
                        value: raw.to_string(),
                    })
                })
                .collect::<ErltResult<Vec<_>>>()?;
            table.push(keys, values)?;
        }
        debug!("read {} row(s) from {}", table.len(), path.display());
        Ok(table)
    }

    fn write_table(&mut self, name: &str, table: &Table) -> ErltResult<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_of(name);
        let mut wtr = csv::Writer::from_writer(File::create(&path)?);
        wtr.write_record(table.dims().iter().chain(table.quantities().iter()))?;
        for row in table.rows() {
            let record = row
                .keys
                .iter()
                .map(Label::to_string)
                .chain(row.values.iter().map(f64::to_string));
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        debug!("wrote {} row(s) to {}", table.len(), path.display());
        Ok(())
    }
}
