//! One end-to-end run: read the sparse table, fill it, publish it.
//!
//! Around every stage the job can write two QA pivots: the stage input with
//! its holes ("manual") and the stage output ("interpolated"). The final
//! table is checked to hold every observed key at every grid point before it
//! is written.
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use log::info;

use crate::errors::{ErltError, ErltResult};
use crate::pipeline::{Pipeline, StageView};
use crate::pivot::pivot_for_qa;
use crate::store::TableStore;
use crate::table::{Label, Schema, Table};

/// Keep only input rows whose `column` holds one of `values`.
#[derive(Clone, Debug, PartialEq)]
pub struct InputFilter {
    pub column: String,
    pub values: Vec<Label>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ErltJob {
    pub input_table: String,
    pub output_table: String,
    /// One name per stage, or empty to keep stage outputs in memory only
    pub intermediate_tables: Vec<String>,
    pub filter: Option<InputFilter>,
    pub qa_dir: Option<PathBuf>,
    pub pipeline: Pipeline,
}

/// What a run read, wrote and produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub input_rows: usize,
    pub stage_rows: Vec<usize>,
    pub output_rows: usize,
    pub qa_files: Vec<PathBuf>,
}

impl ErltJob {
    pub fn new(input_table: &str, output_table: &str, pipeline: Pipeline) -> Self {
        Self {
            input_table: input_table.to_string(),
            output_table: output_table.to_string(),
            intermediate_tables: Vec::new(),
            filter: None,
            qa_dir: None,
            pipeline,
        }
    }

    /// Columns read from the input table: the first stage's.
    pub fn input_schema(&self) -> Schema {
        match self.pipeline.stages().first() {
            Some(stage) => Schema {
                dims: stage.output_dims(),
                quantities: stage.quantities.clone(),
            },
            None => Schema {
                dims: Vec::new(),
                quantities: Vec::new(),
            },
        }
    }

    /// Run the job against `store`.
    ///
    /// Nothing is written to the output table unless every stage succeeds
    /// and the result covers every observed key on the full grids.
    pub fn run<S: TableStore>(&self, store: &mut S) -> ErltResult<RunSummary> {
        let mut input = store.read_table(&self.input_table, &self.input_schema())?;
        info!("read {} row(s) from {}", input.len(), self.input_table);
        if let Some(filter) = &self.filter {
            input = input.filter(&filter.column, &filter.values)?;
            info!(
                "kept {} row(s) with {} in [{}]",
                input.len(),
                filter.column,
                filter
                    .values
                    .iter()
                    .map(Label::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mut qa_files = Vec::new();
        let output = self.pipeline.run_with(&input, |_, stage, view| {
            let Some(dir) = &self.qa_dir else {
                return Ok(());
            };
            let (kind, table) = match view {
                StageView::Input(t) => ("manual", t),
                StageView::Output(t) => ("interpolated", t),
            };
            let pivot = pivot_for_qa(table, &stage.group_by, &stage.grid, &stage.quantities)?;
            fs::create_dir_all(dir)?;
            let path = dir.join(format!(
                "qaqc_{kind}_{}_{}.csv",
                stage.axis.column, self.input_table
            ));
            pivot.write_csv_path(&path)?;
            info!(
                "wrote QA pivot {} with {} empty cell(s)",
                path.display(),
                pivot.missing_cells()
            );
            qa_files.push(path);
            Ok(())
        })?;

        for (name, table) in self.intermediate_tables.iter().zip(output.stages.iter()) {
            store.write_table(name, table)?;
            info!("wrote {} row(s) to {}", table.len(), name);
        }

        let last = output.final_table().ok_or(ErltError::EmptyPipeline)?;
        self.check_final(&input, last)?;
        store.write_table(&self.output_table, last)?;
        info!("wrote {} row(s) to {}", last.len(), self.output_table);

        Ok(RunSummary {
            input_rows: input.len(),
            stage_rows: output.stages.iter().map(Table::len).collect(),
            output_rows: last.len(),
            qa_files,
        })
    }

    /// Every key observed in the input, at every point of the grids of the
    /// axes that survive into the final table.
    fn check_final(&self, input: &Table, last: &Table) -> ErltResult<()> {
        let stages = self.pipeline.stages();
        let mut key_columns: Vec<&str> = Vec::new();
        let mut axes: Vec<(&str, Vec<Label>)> = Vec::new();
        for dim in last.dims() {
            match stages.iter().rev().find(|s| &s.axis.column == dim) {
                Some(stage) => axes.push((dim.as_str(), stage.grid.labels())),
                None => key_columns.push(dim.as_str()),
            }
        }

        let idx = key_columns
            .iter()
            .map(|c| input.dim_index(c))
            .collect::<ErltResult<Vec<_>>>()?;
        let keys: BTreeSet<Vec<Label>> = input
            .rows()
            .iter()
            .map(|r| idx.iter().map(|&j| r.keys[j].clone()).collect())
            .collect();
        let keys: Vec<Vec<Label>> = keys.into_iter().collect();
        last.check_key_coverage(&key_columns, &keys, &axes)
    }
}
