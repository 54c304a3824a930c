//! TOML description of a pipeline and the job around it.
//!
//! ```toml
//! input_table = "running_sparse"
//! output_table = "running_erlt"
//! intermediate_tables = ["running_yr_interpolated", "running_yr_spd_interpolated"]
//! qa_dir = "qaqc"
//!
//! [filter]
//! column = "Area"
//! values = ["El Paso", "Austin"]
//!
//! [[pipeline.stages]]
//! interpol_col = "yearid"
//! grpby_cols = ["Area", "monthid", "funclass", "avgspeed"]
//!
//! [[pipeline.stages]]
//! interpol_col = "avgspeed"
//! grpby_cols = ["Area", "yearid", "monthid", "funclass"]
//!
//! [pipeline.reduction]
//! grpby_cols = ["Area", "yearid", "funclass", "avgspeed"]
//! agg_func = "max"
//! ```
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::axis::{AxisPolicy, AxisTransform};
use crate::columns;
use crate::errors::{ErltError, ErltResult};
use crate::grid::Grid;
use crate::interpolate::InterpolationSpec;
use crate::pipeline::Pipeline;
use crate::reduce::{AggFunc, Reduction};
use crate::table::Label;
use crate::workflow::{ErltJob, InputFilter};

/// One interpolation stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub interpol_col: String,
    /// Target coordinates; the standard grid of the axis when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpol_vals: Option<Vec<f64>>,
    pub grpby_cols: Vec<String>,
    /// Required for axes other than `yearid` and `avgspeed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<AxisTransform>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReductionConfig {
    pub grpby_cols: Vec<String>,
    #[serde(default)]
    pub agg_func: AggFunc,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "columns::pollutants")]
    pub pollutant_cols: Vec<String>,
    pub stages: Vec<StageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduction: Option<ReductionConfig>,
}

impl PipelineConfig {
    /// Running emissions over the 17 standard pollutants.
    pub fn running() -> ErltResult<Self> {
        Pipeline::running(&columns::pollutants()).map(|p| Self::from(&p))
    }

    /// Start emissions over the 17 standard pollutants.
    pub fn starts() -> ErltResult<Self> {
        Pipeline::starts(&columns::pollutants()).map(|p| Self::from(&p))
    }

    /// Idling emissions over the 17 standard pollutants.
    pub fn idling() -> ErltResult<Self> {
        Pipeline::idling(&columns::pollutants()).map(|p| Self::from(&p))
    }

    /// Extended idle emissions over the 17 standard pollutants.
    pub fn extended_idle() -> ErltResult<Self> {
        Pipeline::extended_idle(&columns::pollutants()).map(|p| Self::from(&p))
    }

    /// Validate and build the pipeline.
    pub fn build(&self) -> ErltResult<Pipeline> {
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                let axis = AxisPolicy::resolve(&stage.interpol_col, stage.transform)?;
                let grid = match &stage.interpol_vals {
                    Some(vals) => Grid::new(&stage.interpol_col, vals.clone())?,
                    None => Grid::standard(&stage.interpol_col)?,
                };
                InterpolationSpec::new(
                    axis,
                    grid,
                    stage.grpby_cols.clone(),
                    self.pollutant_cols.clone(),
                )
            })
            .collect::<ErltResult<Vec<_>>>()?;
        let reduction = self.reduction.as_ref().map(|r| {
            Reduction::new(r.grpby_cols.clone(), self.pollutant_cols.clone(), r.agg_func)
        });
        Pipeline::new(stages, reduction)
    }
}

impl From<&Pipeline> for PipelineConfig {
    fn from(pipeline: &Pipeline) -> Self {
        let stages = pipeline
            .stages()
            .iter()
            .map(|spec| {
                let column = &spec.axis.column;
                let standard = Grid::standard(column).ok();
                let builtin = AxisPolicy::for_column(column).ok();
                StageConfig {
                    interpol_col: column.clone(),
                    interpol_vals: (standard.as_ref() != Some(&spec.grid))
                        .then(|| spec.grid.values().to_vec()),
                    grpby_cols: spec.group_by.clone(),
                    transform: (builtin.as_ref() != Some(&spec.axis))
                        .then_some(spec.axis.transform),
                }
            })
            .collect();
        let pollutant_cols = pipeline
            .stages()
            .first()
            .map(|spec| spec.quantities.clone())
            .unwrap_or_default();
        Self {
            pollutant_cols,
            stages,
            reduction: pipeline.reduction().map(|r| ReductionConfig {
                grpby_cols: r.group_by.clone(),
                agg_func: r.agg,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub column: String,
    pub values: Vec<Label>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErltConfig {
    pub input_table: String,
    pub output_table: String,
    /// One name per stage; stage outputs are not stored when empty
    #[serde(default)]
    pub intermediate_tables: Vec<String>,
    #[serde(default)]
    pub filter: Option<FilterConfig>,
    /// Directory for QA pivots; none are written when absent
    #[serde(default)]
    pub qa_dir: Option<PathBuf>,
    pub pipeline: PipelineConfig,
}

impl ErltConfig {
    pub fn from_toml_str(text: &str) -> ErltResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> ErltResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate and build the job.
    ///
    /// # Errors
    /// * Any error building the pipeline
    /// * `InvalidConfig` if `intermediate_tables` is given but does not name
    ///   every stage, or the filter has no values
    pub fn job(&self) -> ErltResult<ErltJob> {
        let pipeline = self.pipeline.build()?;
        let n_stages = pipeline.stages().len();
        if !self.intermediate_tables.is_empty() && self.intermediate_tables.len() != n_stages {
            return Err(ErltError::InvalidConfig(format!(
                "{} intermediate table name(s) for {} stage(s)",
                self.intermediate_tables.len(),
                n_stages
            )));
        }
        let filter = match &self.filter {
            Some(f) if f.values.is_empty() => {
                return Err(ErltError::InvalidConfig(format!(
                    "filter on {} has no values",
                    f.column
                )))
            }
            // Text that reads as a number matches numeric labels from the input
            Some(f) => Some(InputFilter {
                column: f.column.clone(),
                values: f
                    .values
                    .iter()
                    .map(|v| match v {
                        Label::Text(s) => Label::parse(s),
                        num => num.clone(),
                    })
                    .collect(),
            }),
            None => None,
        };
        Ok(ErltJob {
            input_table: self.input_table.clone(),
            output_table: self.output_table.clone(),
            intermediate_tables: self.intermediate_tables.clone(),
            filter,
            qa_dir: self.qa_dir.clone(),
            pipeline,
        })
    }
}
