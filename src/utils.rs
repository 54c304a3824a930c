//! Convenience methods for constructing grids and key combinations in a way
//! that echoes, but does not exactly match, methods common in scripting languages.
use itertools::Itertools;
use num_traits::Float;

/// Generates `start, start + step, ...` up to and including `stop`
/// (within a hundredth of a step, to absorb accumulated rounding).
pub fn arange_inclusive<T>(start: T, stop: T, step: T) -> Vec<T>
where
    T: Float,
{
    if !(step > T::zero()) || stop < start {
        return Vec::new();
    }
    let slack = step / T::from(100.0).unwrap_or_else(T::one);
    let mut out = Vec::new();
    let mut i = 0_usize;
    loop {
        let x = match T::from(i) {
            Some(n) => start + n * step,
            None => break,
        };
        if x > stop + slack {
            break;
        }
        out.push(x);
        i += 1;
    }
    out
}

/// Every combination of one element per axis, in C ordering
/// (x0, y0, z0), (x0, y0, z1), ..., (xn, yn, zn).
pub fn cartesian<'a, T>(axes: &[&'a [T]]) -> impl Iterator<Item = Vec<&'a T>> + 'a {
    axes.iter()
        .map(|axis| axis.iter())
        .collect::<Vec<_>>()
        .into_iter()
        .multi_cartesian_product()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_arange_inclusive() {
        assert_eq!(arange_inclusive(3.0, 6.0, 1.0), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(arange_inclusive(0.0, 1.0, 0.1).len(), 11);
        assert!(arange_inclusive(1.0, 0.0, 1.0).is_empty());
        assert!(arange_inclusive(0.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn test_cartesian() {
        let a = [1, 2];
        let b = [10, 20, 30];
        let combos: Vec<Vec<i32>> = cartesian(&[&a[..], &b[..]])
            .map(|c| c.into_iter().copied().collect())
            .collect();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0], vec![1, 10]);
        assert_eq!(combos[1], vec![1, 20]);
        assert_eq!(combos[5], vec![2, 30]);
    }
}
