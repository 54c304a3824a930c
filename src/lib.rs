//! Two-stage interpolation of sparse emission-rate tables onto dense lookup grids.
//!
//! Emission models are run for a handful of model years and speed bins. The
//! lookup tables built from them need every year from 2020 to 2050 and every
//! speed bin from 2.5 to 75 mph. This crate fills the gaps by grouped
//! piecewise-linear interpolation, one axis at a time, then collapses the
//! month dimension to the worst month of each year.
//!
//! * Years are interpolated linearly in the year itself.
//! * Speeds are interpolated linearly in `1 / speed`.
//! * Nothing is extrapolated: a grid point outside a group's observed range
//!   is an error, as is a fit that does not reproduce its own knots.
//!
//! | Step                                  | Module        |
//! |---------------------------------------|---------------|
//! | Fill one axis within each group       | `interpolate` |
//! | Chain axes, then collapse months      | `pipeline`    |
//! | Collapse a dimension                  | `reduce`      |
//! | Wide view with visible holes          | `pivot`       |
//! | Read and write named tables           | `store`       |
//! | TOML job description                  | `config`      |
//! | Load, QA, fill and publish            | `workflow`    |
//!
//! # Example: running emissions
//! ```rust
//! use erlt::{columns, AggFunc, AxisPolicy, Grid, InterpolationSpec, Label, Pipeline, Reduction, Table};
//!
//! let q = vec!["CO".to_string()];
//! let mut sparse = Table::new(["Area", "monthid", "funclass", "avgspeed", "yearid"], q.clone()).unwrap();
//! for month in [1, 7] {
//!     for (speed, base) in [(5.0, 8.0), (10.0, 4.0)] {
//!         for (year, trend) in [(2020, 0.0), (2022, 2.0)] {
//!             let keys = vec!["El Paso".into(), month.into(), "Urban".into(), speed.into(), year.into()];
//!             sparse.push(keys, vec![base + trend + month as f64]).unwrap();
//!         }
//!     }
//! }
//!
//! let years = InterpolationSpec::new(
//!     AxisPolicy::year(),
//!     Grid::years(2020, 2022).unwrap(),
//!     ["Area", "monthid", "funclass", "avgspeed"].map(String::from).to_vec(),
//!     q.clone(),
//! )
//! .unwrap();
//! let speeds = InterpolationSpec::new(
//!     AxisPolicy::avg_speed(),
//!     Grid::new(columns::AVG_SPEED, vec![5.0, 6.0, 8.0, 10.0]).unwrap(),
//!     ["Area", "yearid", "monthid", "funclass"].map(String::from).to_vec(),
//!     q.clone(),
//! )
//! .unwrap();
//! let annual = Reduction::new(
//!     ["Area", "yearid", "funclass", "avgspeed"].map(String::from).to_vec(),
//!     q,
//!     AggFunc::Max,
//! );
//!
//! let pipeline = Pipeline::new(vec![years, speeds], Some(annual)).unwrap();
//! let out = pipeline.run(&sparse).unwrap();
//! let erlt = out.final_table().unwrap();
//!
//! // 3 years x 4 speeds
//! assert_eq!(erlt.len(), 12);
//! // July, 2021, 5 mph: 8 + 1 + 7
//! let key: [Label; 4] = ["El Paso".into(), 2021.into(), "Urban".into(), 5.0.into()];
//! assert_eq!(erlt.lookup(&key, "CO").unwrap(), Some(16.0));
//! ```
pub mod errors;
pub use errors::{ErltError, ErltResult};

pub mod one_dim;
pub use one_dim::{linear::Linear1D, RectilinearGrid1D};

pub mod axis;
pub use axis::{AxisPolicy, AxisTransform};

pub mod columns;

pub mod grid;
pub use grid::Grid;

pub mod table;
pub use table::{Label, Observation, Row, Schema, Table};

pub mod interpolate;
pub use interpolate::{interpolate_grouped, InterpolationSpec};

pub mod reduce;
pub use reduce::{reduce, AggFunc, Reduction};

pub mod pipeline;
pub use pipeline::{Pipeline, PipelineOutput, StageView};

pub mod pivot;
pub use pivot::{pivot_for_qa, PivotTable};

pub mod store;
pub use store::{CsvStore, MemoryStore, TableStore};

pub mod config;
pub use config::{ErltConfig, PipelineConfig};

pub mod workflow;
pub use workflow::{ErltJob, InputFilter, RunSummary};

pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
