//! Which variable an interpolation is linear in.
//!
//! Rates are linear in model year, and approximately linear in the inverse of
//! average speed (the MOBILE6.2 speed-correction convention). There is no
//! default: an axis column without a known rule must be given an explicit
//! transform, otherwise it is rejected.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::columns;
use crate::errors::{ErltError, ErltResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisTransform {
    /// Interpolate in the coordinate itself
    Identity,
    /// Interpolate in `1 / coordinate`
    Reciprocal,
}

impl AxisTransform {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            AxisTransform::Identity => x,
            AxisTransform::Reciprocal => 1.0 / x,
        }
    }

    /// Whether `x` has a finite image under the transform
    pub fn admits(self, x: f64) -> bool {
        match self {
            AxisTransform::Identity => x.is_finite(),
            AxisTransform::Reciprocal => x.is_finite() && x > 0.0,
        }
    }
}

impl fmt::Display for AxisTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisTransform::Identity => f.write_str("identity"),
            AxisTransform::Reciprocal => f.write_str("reciprocal"),
        }
    }
}

impl FromStr for AxisTransform {
    type Err = ErltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" | "linear" => Ok(AxisTransform::Identity),
            "reciprocal" | "inverse" => Ok(AxisTransform::Reciprocal),
            _ => Err(ErltError::Parse {
                column: "transform".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// An axis column together with the transform applied before interpolating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisPolicy {
    pub column: String,
    pub transform: AxisTransform,
}

impl AxisPolicy {
    /// Built-in rule for a column: `yearid` is interpolated directly,
    /// `avgspeed` in reciprocal space.
    ///
    /// # Errors
    /// * `UnsupportedAxis` for any other column
    pub fn for_column(column: &str) -> ErltResult<Self> {
        let transform = match column {
            columns::YEAR => AxisTransform::Identity,
            columns::AVG_SPEED => AxisTransform::Reciprocal,
            other => return Err(ErltError::UnsupportedAxis(other.to_string())),
        };
        Ok(Self {
            column: column.to_string(),
            transform,
        })
    }

    /// Explicit rule for any column.
    pub fn explicit(column: &str, transform: AxisTransform) -> Self {
        Self {
            column: column.to_string(),
            transform,
        }
    }

    /// Built-in rule, unless an explicit transform is given.
    pub fn resolve(column: &str, transform: Option<AxisTransform>) -> ErltResult<Self> {
        match transform {
            Some(t) => Ok(Self::explicit(column, t)),
            None => Self::for_column(column),
        }
    }

    pub fn year() -> Self {
        Self::explicit(columns::YEAR, AxisTransform::Identity)
    }

    pub fn avg_speed() -> Self {
        Self::explicit(columns::AVG_SPEED, AxisTransform::Reciprocal)
    }
}
