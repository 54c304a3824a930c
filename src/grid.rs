//! Canonical target coordinates for each interpolation axis.
use serde::{Deserialize, Serialize};

use crate::axis::AxisTransform;
use crate::columns;
use crate::errors::{ErltError, ErltResult};
use crate::table::Label;
use crate::utils::arange_inclusive;

/// First and last model year of the lookup tables
pub const FIRST_YEAR: i64 = 2020;
pub const LAST_YEAR: i64 = 2050;

/// Lowest speed bin, below the integer bins
pub const LOW_SPEED: f64 = 2.5;
pub const MAX_SPEED: f64 = 75.0;

/// An ordered, duplicate-free set of coordinates along one axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    axis: String,
    values: Vec<f64>,
}

impl Grid {
    /// Build a grid, sorting the values ascending.
    ///
    /// # Errors
    /// * `InvalidGrid` if the grid is empty or holds a non-finite value
    /// * `DuplicateGridValue` if any value appears twice
    pub fn new(axis: &str, mut values: Vec<f64>) -> ErltResult<Self> {
        if values.is_empty() {
            return Err(ErltError::InvalidGrid {
                axis: axis.to_string(),
                reason: "grid is empty".to_string(),
            });
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ErltError::InvalidGrid {
                axis: axis.to_string(),
                reason: format!("{bad} is not finite"),
            });
        }
        values.sort_by(f64::total_cmp);
        if let Some(w) = values.windows(2).find(|w| w[0] == w[1]) {
            return Err(ErltError::DuplicateGridValue {
                axis: axis.to_string(),
                value: w[0],
            });
        }
        Ok(Self {
            axis: axis.to_string(),
            values,
        })
    }

    /// Every integer year from `first` to `last`, inclusive.
    pub fn years(first: i64, last: i64) -> ErltResult<Self> {
        Self::new(columns::YEAR, (first..=last).map(|y| y as f64).collect())
    }

    /// Model years 2020 through 2050
    pub fn standard_years() -> Self {
        Self {
            axis: columns::YEAR.to_string(),
            values: (FIRST_YEAR..=LAST_YEAR).map(|y| y as f64).collect(),
        }
    }

    /// Speed bins 2.5, 3, 4, ..., 75 mph
    pub fn standard_avg_speeds() -> Self {
        let mut values = vec![LOW_SPEED];
        values.extend(arange_inclusive(3.0, MAX_SPEED, 1.0));
        Self {
            axis: columns::AVG_SPEED.to_string(),
            values,
        }
    }

    /// The standard grid of a known axis column.
    ///
    /// # Errors
    /// * `UnsupportedAxis` for a column without a standard grid
    pub fn standard(axis: &str) -> ErltResult<Self> {
        match axis {
            columns::YEAR => Ok(Self::standard_years()),
            columns::AVG_SPEED => Ok(Self::standard_avg_speeds()),
            other => Err(ErltError::UnsupportedAxis(other.to_string())),
        }
    }

    pub fn axis(&self) -> &str {
        &self.axis
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, x: f64) -> bool {
        self.values.binary_search_by(|v| v.total_cmp(&x)).is_ok()
    }

    /// Position of `x` on the grid
    pub fn position(&self, x: f64) -> Option<usize> {
        self.values.binary_search_by(|v| v.total_cmp(&x)).ok()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.values.iter().map(|&v| Label::from(v)).collect()
    }

    /// Check every grid value survives the axis transform.
    pub fn check_transform(&self, transform: AxisTransform) -> ErltResult<()> {
        match self.values.iter().find(|&&v| !transform.admits(v)) {
            Some(bad) => Err(ErltError::InvalidGrid {
                axis: self.axis.clone(),
                reason: format!("{bad} has no {transform} image"),
            }),
            None => Ok(()),
        }
    }
}
