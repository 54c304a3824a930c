use rand::distr::StandardUniform;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::table::{Label, Table};

/// Fixed random seed to support repeatable testing
const SEED: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6,
    5, 4, 3, 2, 1,
];

/// Get a random number generator with a const seed for repeatable testing
pub fn rng_fixed_seed() -> StdRng {
    StdRng::from_seed(SEED)
}

/// Generate `n` random numbers using provided generator
pub fn randn<T>(rng: &mut StdRng, n: usize) -> Vec<T>
where
    StandardUniform: rand::distr::Distribution<T>,
{
    std::iter::repeat_with(|| rng.random::<T>())
        .take(n)
        .collect()
}

/// Sparse running-emissions table shaped like the simulation output:
/// even years only, a subset of speeds, two months per region and road class.
pub fn sparse_running_table(rng: &mut StdRng, years: &[i64], speeds: &[f64]) -> Table {
    let mut table = Table::new(
        ["Area", "monthid", "funclass", "avgspeed", "yearid"],
        ["CO", "NOX"],
    )
    .unwrap();
    for area in ["El Paso", "Austin"] {
        for month in [1_i64, 7] {
            for funclass in ["Rural-Arterial", "Urban-Freeway"] {
                for &speed in speeds {
                    for &year in years {
                        let co = 10.0 / speed + rng.random::<f64>();
                        let nox = 1.0 / speed + 0.1 * rng.random::<f64>();
                        table
                            .push(
                                vec![
                                    Label::from(area),
                                    Label::from(month),
                                    Label::from(funclass),
                                    Label::from(speed),
                                    Label::from(year),
                                ],
                                vec![co, nox],
                            )
                            .unwrap();
                    }
                }
            }
        }
    }
    table
}
