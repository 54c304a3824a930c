//! Grouped piecewise-linear interpolation along one axis.
//!
//! The table is partitioned on the group key, each group is reindexed onto the
//! full canonical grid, and every quantity column is filled independently from
//! a 1-D linear interpolant fit on that group's observed coordinates.
//!
//! Each fit is checked against its own knots before it is used: the interpolant
//! must reproduce every observed value. A mismatch means the group had two rows
//! for one coordinate with different values, and is reported rather than
//! silently averaged away.
//!
//! ```rust
//! use erlt::{interpolate_grouped, AxisPolicy, Grid, InterpolationSpec, Table};
//!
//! let mut table = Table::new(["Area", "yearid"], ["CO"]).unwrap();
//! for (year, co) in [(2020, 10.0), (2022, 12.0), (2024, 16.0)] {
//!     table.push(vec!["X".into(), year.into()], vec![co]).unwrap();
//! }
//!
//! let spec = InterpolationSpec::new(
//!     AxisPolicy::year(),
//!     Grid::years(2020, 2024).unwrap(),
//!     vec!["Area".to_string()],
//!     vec!["CO".to_string()],
//! )
//! .unwrap();
//! let filled = interpolate_grouped(&table, &spec).unwrap();
//! assert_eq!(filled.len(), 5);
//! assert_eq!(filled.lookup(&["X".into(), 2021.into()], "CO").unwrap(), Some(11.0));
//! ```
use std::collections::BTreeMap;

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::axis::AxisPolicy;
use crate::errors::{ErltError, ErltResult};
use crate::grid::Grid;
use crate::one_dim::{self, linear::Linear1D, Interp1D, RectilinearGrid1D};
use crate::table::{render_key, Label, Row, Table};

/// Relative tolerance of the knot reproduction check
pub const ROUND_TRIP_RTOL: f64 = 1e-9;
/// Absolute floor of the knot reproduction check, for rates at or near zero
pub const ROUND_TRIP_ATOL: f64 = 1e-12;

/// One interpolation stage: which axis, onto which grid, within which groups,
/// for which quantities.
#[derive(Clone, Debug, PartialEq)]
pub struct InterpolationSpec {
    pub axis: AxisPolicy,
    pub grid: Grid,
    pub group_by: Vec<String>,
    pub quantities: Vec<String>,
}

impl InterpolationSpec {
    /// # Errors
    /// * `InvalidGrid` if the grid belongs to another axis, or holds a value
    ///   the axis transform cannot map (e.g. a zero speed)
    /// * `ColumnMismatch` if the axis column is also a group column
    /// * `DuplicateColumn` if a group or quantity column is repeated
    pub fn new(
        axis: AxisPolicy,
        grid: Grid,
        group_by: Vec<String>,
        quantities: Vec<String>,
    ) -> ErltResult<Self> {
        if grid.axis() != axis.column {
            return Err(ErltError::InvalidGrid {
                axis: axis.column.clone(),
                reason: format!("grid was built for {}", grid.axis()),
            });
        }
        grid.check_transform(axis.transform)?;
        if group_by.contains(&axis.column) {
            return Err(ErltError::ColumnMismatch {
                expected: group_by.clone(),
                found: vec![axis.column.clone()],
            });
        }
        // Table::new rejects repeated names for us
        Table::new(group_by.iter().cloned(), quantities.iter().cloned())?;

        Ok(Self {
            axis,
            grid,
            group_by,
            quantities,
        })
    }

    /// Built-in transform and standard grid of a known axis column.
    pub fn standard(axis: &str, group_by: &[&str], quantities: &[String]) -> ErltResult<Self> {
        Self::new(
            AxisPolicy::for_column(axis)?,
            Grid::standard(axis)?,
            group_by.iter().map(|c| c.to_string()).collect(),
            quantities.to_vec(),
        )
    }

    /// Dimension columns of the stage output: group columns, then the axis.
    pub fn output_dims(&self) -> Vec<String> {
        let mut dims = self.group_by.clone();
        dims.push(self.axis.column.clone());
        dims
    }
}

/// Column positions resolved once per table
struct Layout<'s> {
    spec: &'s InterpolationSpec,
    keys: Vec<usize>,
    axis: usize,
    quantities: Vec<usize>,
}

/// Fill every group of `table` onto the full grid of `spec`.
///
/// Output rows are ordered by group key, then by grid coordinate.
///
/// # Errors
/// * `ColumnMismatch` unless the table's dimensions are exactly the group
///   columns plus the axis column
/// * `UnknownColumn` if a quantity is missing from the table
/// * `NonNumericAxis` if an axis label is text
/// * `CoordinateNotInGrid` if an observed coordinate is not on the grid
/// * `InsufficientData` if a group has fewer than 2 distinct coordinates
/// * `RoundTripMismatch` if a fit does not reproduce an observed value
/// * `OutOfDomain` if a grid coordinate lies outside a group's observed range
pub fn interpolate_grouped(table: &Table, spec: &InterpolationSpec) -> ErltResult<Table> {
    let layout = resolve_layout(table, spec)?;

    let mut groups: BTreeMap<Vec<Label>, Vec<(f64, &Row)>> = BTreeMap::new();
    for row in table.rows() {
        let key: Vec<Label> = layout.keys.iter().map(|&j| row.keys[j].clone()).collect();
        let label = &row.keys[layout.axis];
        let coord = label.as_f64().ok_or_else(|| ErltError::NonNumericAxis {
            column: spec.axis.column.clone(),
            label: label.to_string(),
        })?;
        groups.entry(key).or_default().push((coord, row));
    }
    debug!(
        "interpolating {} group(s) over {} ({} transform) onto {} point(s)",
        groups.len(),
        spec.axis.column,
        spec.axis.transform,
        spec.grid.len()
    );

    let groups: Vec<(Vec<Label>, Vec<(f64, &Row)>)> = groups.into_iter().collect();

    #[cfg(feature = "parallel")]
    let filled: Vec<Vec<Row>> = groups
        .par_iter()
        .map(|(key, members)| fill_group(&layout, key, members))
        .collect::<ErltResult<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let filled: Vec<Vec<Row>> = groups
        .iter()
        .map(|(key, members)| fill_group(&layout, key, members))
        .collect::<ErltResult<_>>()?;

    let mut out = Table::new(spec.output_dims(), spec.quantities.iter().cloned())?;
    for row in filled.into_iter().flatten() {
        out.push_row(row)?;
    }
    Ok(out)
}

fn resolve_layout<'s>(table: &Table, spec: &'s InterpolationSpec) -> ErltResult<Layout<'s>> {
    let expected = spec.output_dims();
    let mut want: Vec<&String> = expected.iter().collect();
    let mut have: Vec<&String> = table.dims().iter().collect();
    want.sort();
    have.sort();
    if want != have {
        return Err(ErltError::ColumnMismatch {
            expected,
            found: table.dims().to_vec(),
        });
    }

    let keys = spec
        .group_by
        .iter()
        .map(|c| table.dim_index(c))
        .collect::<ErltResult<Vec<_>>>()?;
    let axis = table.dim_index(&spec.axis.column)?;
    let quantities = spec
        .quantities
        .iter()
        .map(|q| table.quantity_index(q))
        .collect::<ErltResult<Vec<_>>>()?;

    Ok(Layout {
        spec,
        keys,
        axis,
        quantities,
    })
}

/// Interpolate one group onto the grid, returning one row per grid coordinate.
fn fill_group(layout: &Layout<'_>, key: &[Label], members: &[(f64, &Row)]) -> ErltResult<Vec<Row>> {
    let spec = layout.spec;
    let transform = spec.axis.transform;
    let group = || render_key(&spec.group_by, key);

    if let Some(&(coord, _)) = members.iter().find(|(c, _)| !spec.grid.contains(*c)) {
        return Err(ErltError::CoordinateNotInGrid {
            group: group(),
            axis: spec.axis.column.clone(),
            coordinate: coord,
        });
    }

    // Fit in transformed space, ascending
    let mut knots: Vec<(f64, f64, &Row)> = members
        .iter()
        .map(|&(c, row)| (transform.apply(c), c, row))
        .collect();
    knots.sort_by(|a, b| a.0.total_cmp(&b.0));

    let distinct = 1 + knots.windows(2).filter(|w| w[0].0 != w[1].0).count();
    if distinct < 2 {
        return Err(ErltError::InsufficientData {
            group: group(),
            axis: spec.axis.column.clone(),
            distinct,
        });
    }

    let (lo, hi) = members
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(c, _)| {
            (lo.min(c), hi.max(c))
        });
    if let Some(&target) = spec.grid.values().iter().find(|&&t| t < lo || t > hi) {
        return Err(ErltError::OutOfDomain {
            group: group(),
            axis: spec.axis.column.clone(),
            target,
            min: lo,
            max: hi,
        });
    }

    let xs: Vec<f64> = knots.iter().map(|k| k.0).collect();
    let targets: Vec<f64> = spec.grid.values().iter().map(|&t| transform.apply(t)).collect();
    let mut filled: Vec<Vec<f64>> = Vec::with_capacity(layout.quantities.len());

    for (qpos, &q) in layout.quantities.iter().enumerate() {
        let ys: Vec<f64> = knots.iter().map(|k| k.2.values[q]).collect();
        let interp = RectilinearGrid1D::new(&xs, &ys)
            .map(Linear1D::new)
            .map_err(|e| primitive_error(spec, &group(), e))?;

        // Knot reproduction
        for (k, &(x, coord, _)) in knots.iter().enumerate() {
            let observed = ys[k];
            let interpolated = interp
                .eval_one(x)
                .map_err(|e| primitive_error(spec, &group(), e))?;
            if (interpolated - observed).abs() > ROUND_TRIP_ATOL + ROUND_TRIP_RTOL * observed.abs() {
                return Err(ErltError::RoundTripMismatch {
                    group: group(),
                    axis: spec.axis.column.clone(),
                    quantity: spec.quantities[qpos].clone(),
                    coordinate: coord,
                    observed,
                    interpolated,
                });
            }
        }

        // Knots are non-negative, but rounding beside a zero knot can land
        // a hair below zero
        let mut out = vec![0.0; targets.len()];
        for (i, &t) in targets.iter().enumerate() {
            let v = interp.eval_one(t).map_err(|e| match e {
                one_dim::Error::OutsideLow | one_dim::Error::OutsideHigh => {
                    ErltError::OutOfDomain {
                        group: group(),
                        axis: spec.axis.column.clone(),
                        target: spec.grid.values()[i],
                        min: lo,
                        max: hi,
                    }
                }
                other => primitive_error(spec, &group(), other),
            })?;
            out[i] = v.max(0.0);
        }
        filled.push(out);
    }

    let rows = spec
        .grid
        .values()
        .iter()
        .enumerate()
        .map(|(i, &coord)| {
            let mut keys = key.to_vec();
            keys.push(Label::from(coord));
            Row {
                keys,
                values: filled.iter().map(|col| col[i]).collect(),
            }
        })
        .collect();
    Ok(rows)
}

/// Failures of the primitive that the checks above should already rule out
fn primitive_error(spec: &InterpolationSpec, group: &str, e: one_dim::Error) -> ErltError {
    ErltError::InvalidGrid {
        axis: spec.axis.column.clone(),
        reason: format!("group [{group}]: {e}"),
    }
}
