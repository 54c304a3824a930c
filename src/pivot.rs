//! Wide QA view of a long table.
//!
//! Rows are the non-axis keys, columns are every (quantity, grid coordinate)
//! pair of the canonical grid, whether or not the table has data there. Holes
//! stay visible as empty cells, so a pivot of the sparse input shows exactly
//! what interpolation must fill and a pivot of its output should be dense.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::warn;

use crate::errors::{ErltError, ErltResult};
use crate::grid::Grid;
use crate::table::{render_key, Label, Table};

#[derive(Clone, Debug, PartialEq)]
pub struct PivotTable {
    index_names: Vec<String>,
    axis: String,
    quantities: Vec<String>,
    coords: Vec<f64>,
    index: Vec<Vec<Label>>,
    /// One row per index entry, quantity-major: `q * coords.len() + c`
    cells: Vec<Vec<Option<f64>>>,
}

/// Pivot `table` on the axis of `grid`, keeping `index` columns as rows.
///
/// Coordinates that are not on the grid have no column and are dropped
/// with a warning.
///
/// # Errors
/// * `ColumnMismatch` unless the table's dimensions are exactly `index` plus the axis
/// * `UnknownColumn` if a quantity is missing
/// * `NonNumericAxis` if an axis label is text
/// * `DuplicateObservation` if two rows share a key
pub fn pivot_for_qa(
    table: &Table,
    index: &[String],
    grid: &Grid,
    quantities: &[String],
) -> ErltResult<PivotTable> {
    let axis = grid.axis();
    let mut want: Vec<&str> = index.iter().map(String::as_str).collect();
    want.push(axis);
    let mut have: Vec<&str> = table.dims().iter().map(String::as_str).collect();
    want.sort_unstable();
    have.sort_unstable();
    if want != have {
        let mut expected = index.to_vec();
        expected.push(axis.to_string());
        return Err(ErltError::ColumnMismatch {
            expected,
            found: table.dims().to_vec(),
        });
    }

    let key_idx = index
        .iter()
        .map(|c| table.dim_index(c))
        .collect::<ErltResult<Vec<_>>>()?;
    let axis_idx = table.dim_index(axis)?;
    let q_idx = quantities
        .iter()
        .map(|q| table.quantity_index(q))
        .collect::<ErltResult<Vec<_>>>()?;

    let width = quantities.len() * grid.len();
    // Per index row: which coordinates were seen, and the cells
    let mut rows: BTreeMap<Vec<Label>, (Vec<bool>, Vec<Option<f64>>)> = BTreeMap::new();
    let mut dropped = 0_usize;
    for row in table.rows() {
        let label = &row.keys[axis_idx];
        let coord = label.as_f64().ok_or_else(|| ErltError::NonNumericAxis {
            column: axis.to_string(),
            label: label.to_string(),
        })?;
        let key: Vec<Label> = key_idx.iter().map(|&j| row.keys[j].clone()).collect();
        let Some(c) = grid.position(coord) else {
            dropped += 1;
            continue;
        };

        let (seen, cells) = rows
            .entry(key)
            .or_insert_with(|| (vec![false; grid.len()], vec![None; width]));
        if seen[c] {
            return Err(ErltError::DuplicateObservation {
                key: render_key(table.dims(), &row.keys),
            });
        }
        seen[c] = true;
        for (qpos, &q) in q_idx.iter().enumerate() {
            cells[qpos * grid.len() + c] = Some(row.values[q]);
        }
    }
    if dropped > 0 {
        warn!(
            "QA pivot on {} dropped {} row(s) with coordinates off the canonical grid",
            axis, dropped
        );
    }

    let (index_rows, cells) = rows
        .into_iter()
        .map(|(key, (_, cells))| (key, cells))
        .unzip();
    Ok(PivotTable {
        index_names: index.to_vec(),
        axis: axis.to_string(),
        quantities: quantities.to_vec(),
        coords: grid.values().to_vec(),
        index: index_rows,
        cells,
    })
}

impl PivotTable {
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    pub fn axis(&self) -> &str {
        &self.axis
    }

    pub fn quantities(&self) -> &[String] {
        &self.quantities
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Row keys, sorted
    pub fn index(&self) -> &[Vec<Label>] {
        &self.index
    }

    pub fn n_columns(&self) -> usize {
        self.quantities.len() * self.coords.len()
    }

    /// Cell at index row `row` for `quantity` at grid coordinate `coord`.
    /// `None` if the cell is a hole, or the row, quantity or coordinate is unknown.
    pub fn cell(&self, row: usize, quantity: &str, coord: f64) -> Option<f64> {
        let q = self.quantities.iter().position(|x| x == quantity)?;
        let c = self.coords.iter().position(|&x| x == coord)?;
        self.cells.get(row)?[q * self.coords.len() + c]
    }

    /// Number of holes
    pub fn missing_cells(&self) -> usize {
        self.cells
            .iter()
            .map(|r| r.iter().filter(|c| c.is_none()).count())
            .sum()
    }

    pub fn is_dense(&self) -> bool {
        self.missing_cells() == 0
    }

    /// Write as CSV with a two-row header: quantity names over coordinates,
    /// as a two-level spreadsheet header would show them. Holes are empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> ErltResult<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(false).from_writer(writer);

        let pad = self.index_names.len().saturating_sub(1);
        let mut top: Vec<String> = vec![String::new(); pad];
        top.push("pollutants".to_string());
        let mut second: Vec<String> = vec![String::new(); pad];
        second.push(self.axis.clone());
        for q in &self.quantities {
            for c in &self.coords {
                top.push(q.clone());
                second.push(Label::from(*c).to_string());
            }
        }
        // With no index columns the label cells still need a slot
        let mut names = self.index_names.clone();
        if names.is_empty() {
            names.push(String::new());
        }
        names.extend(std::iter::repeat(String::new()).take(self.n_columns()));

        wtr.write_record(&top)?;
        wtr.write_record(&second)?;
        wtr.write_record(&names)?;
        for (key, cells) in self.index.iter().zip(self.cells.iter()) {
            let mut record: Vec<String> = key.iter().map(Label::to_string).collect();
            if record.is_empty() {
                record.push(String::new());
            }
            record.extend(cells.iter().map(|c| match c {
                Some(v) => v.to_string(),
                None => String::new(),
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: &Path) -> ErltResult<()> {
        let file = File::create(path)?;
        self.write_csv(file)
    }
}
