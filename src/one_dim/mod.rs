//! One-dimensional interpolation on a rectilinear (unevenly spaced) grid.
//!
//! Emission rates are only ever interpolated, never extrapolated, so every
//! evaluation outside the span of the observed coordinates is an error rather
//! than a hold or a linear continuation.

pub mod linear;

use num_traits::Float;
use thiserror::Error;

/// Failure of the 1-D primitive. Callers attach group context.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Length mismatch")]
    LengthMismatch,
    #[error("At least 2 points are needed, got {0}")]
    TooFewPoints(usize),
    #[error("Grid must be non-decreasing")]
    NotSorted,
    #[error("Observation point is NaN")]
    NotANumber,
    #[error("Observation point below the grid")]
    OutsideLow,
    #[error("Observation point above the grid")]
    OutsideHigh,
}

/// Extrapolation flag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extrap {
    Inside,
    OutsideLow,
    OutsideHigh,
}

/// The grid cell bracketing an observation point
pub struct GridSample<T> {
    pub x0: T,
    pub y0: T,
    pub x1: T,
    pub y1: T,
    pub extrap: Extrap,
}

/// A 1D grid of coordinates with values.
pub trait Grid1D<'a, T: Float> {
    /// Get the left and right values and their locations
    /// for an observation point at a given location.
    ///
    /// For observation points outside the grid, the returned
    /// locations may not bracket the observation point; `extrap` says so.
    fn at(&self, loc: T) -> Result<GridSample<T>, Error>;
}

/// A one-dimensional interpolator.
pub trait Interp1D<'a, T: Float, G: Grid1D<'a, T>> {
    /// Evaluate the interpolant at an observation point.
    fn eval_one(&self, loc: T) -> Result<T, Error>;

    /// Evaluate the interpolant at a set of observation points.
    #[inline]
    fn eval(&self, locs: &[T], out: &mut [T]) -> Result<(), Error> {
        if locs.len() != out.len() {
            return Err(Error::LengthMismatch);
        }

        for i in 0..locs.len() {
            out[i] = self.eval_one(locs[i])?;
        }

        Ok(())
    }

    /// Evaluate the interpolant at a set of observation points, allocating
    /// for the output values for convenience.
    #[inline]
    fn eval_alloc(&self, locs: &[T]) -> Result<Vec<T>, Error> {
        let mut out = vec![T::zero(); locs.len()];
        self.eval(locs, &mut out)?;
        Ok(out)
    }
}

/// A rectilinear grid, which may have uneven spacing.
///
/// Coordinates must be non-decreasing. Repeated coordinates are accepted
/// here so that the round-trip check upstream can report them with context.
#[derive(Clone, Copy)]
pub struct RectilinearGrid1D<'a, T: Float> {
    grid: &'a [T],
    vals: &'a [T],
}

impl<'a, T: Float> RectilinearGrid1D<'a, T> {
    pub fn new(grid: &'a [T], vals: &'a [T]) -> Result<Self, Error> {
        if grid.len() != vals.len() {
            return Err(Error::LengthMismatch);
        }
        if grid.len() < 2 {
            return Err(Error::TooFewPoints(grid.len()));
        }
        if grid.iter().any(|x| x.is_nan()) {
            return Err(Error::NotANumber);
        }
        if grid.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::NotSorted);
        }

        Ok(Self { grid, vals })
    }

    /// Get the index of the lower corner of the containing grid cell
    #[inline]
    pub fn index(&self, loc: T) -> Result<(usize, Extrap), Error> {
        if loc.is_nan() {
            return Err(Error::NotANumber);
        }

        let i = ((self.grid.partition_point(|v| v < &loc) as isize - 1).max(0) as usize)
            .min(self.grid.len() - 2);

        let extrap = match loc {
            x if x < self.grid[0] => Extrap::OutsideLow,
            x if x > self.grid[self.grid.len() - 1] => Extrap::OutsideHigh,
            _ => Extrap::Inside,
        };

        Ok((i, extrap))
    }
}

impl<'a, T: Float> Grid1D<'a, T> for RectilinearGrid1D<'a, T> {
    #[inline]
    fn at(&self, loc: T) -> Result<GridSample<T>, Error> {
        let (i, extrap) = self.index(loc)?;

        let (x0, x1) = (self.grid[i], self.grid[i + 1]);
        let (y0, y1) = (self.vals[i], self.vals[i + 1]);

        Ok(GridSample {
            x0,
            y0,
            x1,
            y1,
            extrap,
        })
    }
}
