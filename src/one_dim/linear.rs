//! Piecewise-linear interpolation that refuses to extrapolate.

use num_traits::Float;

use super::{Error, Extrap, Grid1D, GridSample, Interp1D};

/// Linear interpolation inside the grid; out-of-domain queries are errors.
pub struct Linear1D<G> {
    grid: G,
}

impl<G> Linear1D<G> {
    pub fn new(grid: G) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }
}

impl<'a, T, G> Interp1D<'a, T, G> for Linear1D<G>
where
    T: Float,
    G: Grid1D<'a, T>,
{
    #[inline]
    fn eval_one(&self, loc: T) -> Result<T, Error> {
        let GridSample {
            x0,
            y0,
            x1,
            y1,
            extrap,
        } = self.grid.at(loc)?;

        match extrap {
            Extrap::OutsideLow => return Err(Error::OutsideLow),
            Extrap::OutsideHigh => return Err(Error::OutsideHigh),
            Extrap::Inside => {}
        }

        // Zero-width cell from a repeated coordinate
        if x1 == x0 {
            return Ok(y0);
        }

        let slope = (y1 - y0) / (x1 - x0);
        let dx = loc - x0;
        let v = y0 + slope * dx;

        Ok(v)
    }
}

#[cfg(test)]
mod test {
    use crate::one_dim::{Error, Interp1D, RectilinearGrid1D};
    use crate::testing::{randn, rng_fixed_seed};

    use super::Linear1D;

    #[test]
    fn test_linear_1d() {
        let rng = &mut rng_fixed_seed();

        let n = 77;

        let vals = &randn::<f64>(rng, n)[..];

        let (start, stop) = (-3.14, 314.0);
        let mut x_rect = randn::<f64>(rng, n);
        x_rect.sort_unstable_by(|x, y| x.total_cmp(y));
        x_rect
            .iter_mut()
            .for_each(|x| *x = (*x * (stop - start)) + start);
        let g_rect = RectilinearGrid1D::new(&x_rect, vals).unwrap();
        let lin = Linear1D::new(g_rect);

        // Observations spanning the inside and both outsides of the grid
        let mut locs = randn::<f64>(rng, 3 * n);
        locs.iter_mut()
            .for_each(|x| *x = (*x * 2.0 * (stop - start)) + 2.0 * start);

        for &loc in locs.iter() {
            let y = lin.eval_one(loc);
            if loc < x_rect[0] {
                assert_eq!(y, Err(Error::OutsideLow));
                continue;
            }
            if loc > x_rect[n - 1] {
                assert_eq!(y, Err(Error::OutsideHigh));
                continue;
            }

            let y = y.unwrap();
            let j: usize = ((x_rect.partition_point(|v| v < &loc) as isize - 1).max(0) as usize)
                .min(n - 2);
            let (xleft, xright) = (x_rect[j], x_rect[j + 1]);
            let (yleft, yright) = (vals[j], vals[j + 1]);
            assert!(loc >= xleft && loc <= xright, "Didn't find the correct cell");
            assert!(y <= yleft.max(yright) && y >= yleft.min(yright));

            let y_expected = yleft + (yright - yleft) / (xright - xleft) * (loc - xleft);
            assert!(((y - y_expected) / y_expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reproduces_knots() {
        let x = [0.1_f64, 0.2, 0.25, 0.4];
        let y = [8.0_f64, 4.0, 3.5, 1.0];
        let lin = Linear1D::new(RectilinearGrid1D::new(&x, &y).unwrap());
        let out = lin.eval_alloc(&x).unwrap();
        for i in 0..x.len() {
            assert!((out[i] - y[i]).abs() <= 1e-12 * y[i].abs());
        }
    }

    #[test]
    fn test_repeated_coordinate() {
        let x = [1.0_f64, 1.0, 2.0];
        let y = [5.0_f64, 7.0, 9.0];
        let lin = Linear1D::new(RectilinearGrid1D::new(&x, &y).unwrap());
        // Only one of the two values at x=1 can be reproduced
        assert_eq!(lin.eval_one(1.0).unwrap(), 5.0);
        assert_eq!(lin.eval_one(1.5).unwrap(), 8.0);
    }

    #[test]
    fn test_rejects_bad_grids() {
        let y = [1.0_f64, 2.0];
        assert_eq!(
            RectilinearGrid1D::new(&[1.0_f64][..], &y[..1]).err(),
            Some(Error::TooFewPoints(1))
        );
        assert_eq!(
            RectilinearGrid1D::new(&[2.0_f64, 1.0][..], &y[..]).err(),
            Some(Error::NotSorted)
        );
        assert_eq!(
            RectilinearGrid1D::new(&[1.0_f64, 2.0, 3.0][..], &y[..]).err(),
            Some(Error::LengthMismatch)
        );

        let g = RectilinearGrid1D::new(&[1.0_f64, 2.0][..], &y[..]).unwrap();
        assert_eq!(Linear1D::new(g).eval_one(f64::NAN), Err(Error::NotANumber));
    }
}
