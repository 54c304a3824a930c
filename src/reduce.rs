//! Collapsing a dimension that is not part of the final key.
//!
//! The running-emissions rates carry a month dimension that the lookup table
//! does not; the annual rate is the worst month, i.e. the maximum over months
//! within each (region, year, road class, speed) group.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{ErltError, ErltResult};
use crate::table::{render_key, Label, Row, Table};

/// Aggregation applied to each quantity over the collapsed rows of a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    #[default]
    Max,
    Min,
    Sum,
    Mean,
}

impl AggFunc {
    /// Aggregate a non-empty slice.
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            AggFunc::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggFunc::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggFunc::Sum => values.iter().sum(),
            AggFunc::Mean => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggFunc::Max => "max",
            AggFunc::Min => "min",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
        };
        f.write_str(name)
    }
}

impl FromStr for AggFunc {
    type Err = ErltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(AggFunc::Max),
            "min" => Ok(AggFunc::Min),
            "sum" => Ok(AggFunc::Sum),
            "mean" => Ok(AggFunc::Mean),
            _ => Err(ErltError::UnknownAggregation(s.to_string())),
        }
    }
}

/// Keep `group_by`, collapse every other dimension with `agg`.
#[derive(Clone, Debug, PartialEq)]
pub struct Reduction {
    pub group_by: Vec<String>,
    pub quantities: Vec<String>,
    pub agg: AggFunc,
}

impl Reduction {
    pub fn new(group_by: Vec<String>, quantities: Vec<String>, agg: AggFunc) -> Self {
        Self {
            group_by,
            quantities,
            agg,
        }
    }
}

/// Collapse every dimension of `table` that is not in `reduction.group_by`.
///
/// Every group must hold exactly one row for each combination of collapsed
/// labels present anywhere in the table (e.g. every month), so that no group
/// is aggregated over a partial set.
///
/// # Errors
/// * `UnknownColumn` if a group or quantity column is missing
/// * `IncompleteGroup` if a group is missing, or repeats, a collapsed label
pub fn reduce(table: &Table, reduction: &Reduction) -> ErltResult<Table> {
    let keys = reduction
        .group_by
        .iter()
        .map(|c| table.dim_index(c))
        .collect::<ErltResult<Vec<_>>>()?;
    let quantities = reduction
        .quantities
        .iter()
        .map(|q| table.quantity_index(q))
        .collect::<ErltResult<Vec<_>>>()?;
    let collapsed: Vec<usize> = (0..table.dims().len())
        .filter(|j| !keys.contains(j))
        .collect();
    let collapsed_names = collapsed
        .iter()
        .map(|&j| table.dims()[j].as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut universe: BTreeSet<Vec<&Label>> = BTreeSet::new();
    let mut groups: BTreeMap<Vec<&Label>, Vec<(Vec<&Label>, &Row)>> = BTreeMap::new();
    for row in table.rows() {
        let key: Vec<&Label> = keys.iter().map(|&j| &row.keys[j]).collect();
        let rest: Vec<&Label> = collapsed.iter().map(|&j| &row.keys[j]).collect();
        universe.insert(rest.clone());
        groups.entry(key).or_default().push((rest, row));
    }
    debug!(
        "reducing {} row(s) to {} group(s) over [{}] with {}",
        table.len(),
        groups.len(),
        collapsed_names,
        reduction.agg
    );

    let mut out = Table::new(
        reduction.group_by.iter().cloned(),
        reduction.quantities.iter().cloned(),
    )?;
    let mut buf = Vec::new();
    for (key, members) in groups {
        let labels: BTreeSet<&Vec<&Label>> = members.iter().map(|(rest, _)| rest).collect();
        if members.len() != universe.len() || labels.len() != universe.len() {
            let owned: Vec<Label> = key.iter().map(|&l| l.clone()).collect();
            return Err(ErltError::IncompleteGroup {
                group: render_key(&reduction.group_by, &owned),
                collapsed: collapsed_names,
                expected: universe.len(),
                found: members.len(),
            });
        }

        let values = quantities
            .iter()
            .map(|&q| {
                buf.clear();
                buf.extend(members.iter().map(|(_, row)| row.values[q]));
                reduction.agg.apply(&buf)
            })
            .collect();
        out.push(key.into_iter().cloned().collect(), values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    fn monthly() -> Table {
        let mut t = Table::new(["Area", "monthid", "yearid"], ["CO", "NOX"]).unwrap();
        for (area, month, year, co, nox) in [
            ("X", 1, 2020, 3.0, 0.5),
            ("X", 7, 2020, 5.0, 0.2),
            ("X", 1, 2021, 2.0, 0.9),
            ("X", 7, 2021, 1.0, 0.1),
            ("Y", 1, 2020, 4.0, 0.4),
            ("Y", 7, 2020, 4.5, 0.3),
        ] {
            t.push(vec![area.into(), month.into(), year.into()], vec![co, nox])
                .unwrap();
        }
        t
    }

    fn annual(agg: AggFunc) -> Reduction {
        Reduction::new(
            vec!["Area".into(), "yearid".into()],
            vec!["CO".into(), "NOX".into()],
            agg,
        )
    }

    #[test]
    fn test_max_over_months() {
        let out = reduce(&monthly(), &annual(AggFunc::Max)).unwrap();
        assert_eq!(out.dims(), &["Area".to_string(), "yearid".to_string()]);
        assert_eq!(out.len(), 3);
        assert_eq!(out.lookup(&["X".into(), 2020.into()], "CO").unwrap(), Some(5.0));
        assert_eq!(out.lookup(&["X".into(), 2020.into()], "NOX").unwrap(), Some(0.5));
        assert_eq!(out.lookup(&["X".into(), 2021.into()], "CO").unwrap(), Some(2.0));
        assert_eq!(out.lookup(&["Y".into(), 2020.into()], "CO").unwrap(), Some(4.5));
    }

    #[test]
    fn test_other_aggregations() {
        let key: [Label; 2] = ["X".into(), 2020.into()];
        let min = reduce(&monthly(), &annual(AggFunc::Min)).unwrap();
        assert_eq!(min.lookup(&key, "CO").unwrap(), Some(3.0));
        let sum = reduce(&monthly(), &annual(AggFunc::Sum)).unwrap();
        assert_eq!(sum.lookup(&key, "CO").unwrap(), Some(8.0));
        let mean = reduce(&monthly(), &annual(AggFunc::Mean)).unwrap();
        assert_eq!(mean.lookup(&key, "CO").unwrap(), Some(4.0));

        assert_eq!("MAX".parse::<AggFunc>().unwrap(), AggFunc::Max);
        assert!(matches!(
            "median".parse::<AggFunc>(),
            Err(ErltError::UnknownAggregation(_))
        ));
        assert_eq!(AggFunc::default(), AggFunc::Max);
    }

    #[test]
    fn test_idempotent() {
        let once = reduce(&monthly(), &annual(AggFunc::Max)).unwrap();
        let twice = reduce(&once, &annual(AggFunc::Max)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_incomplete_group() {
        let mut t = monthly();
        // Y has no 2021 rows at all, which is fine; a lone month is not
        t.push(vec!["Y".into(), 1.into(), 2021.into()], vec![1.0, 1.0])
            .unwrap();
        match reduce(&t, &annual(AggFunc::Max)) {
            Err(ErltError::IncompleteGroup {
                expected,
                found,
                collapsed,
                ..
            }) => {
                assert_eq!((expected, found), (2, 1));
                assert_eq!(collapsed, "monthid");
            }
            other => panic!("unexpected {other:?}"),
        }

        // Same count, but a month repeated instead of covered
        let mut t = Table::new(["Area", "monthid"], ["CO"]).unwrap();
        t.push(vec!["X".into(), 1.into()], vec![1.0]).unwrap();
        t.push(vec!["X".into(), 7.into()], vec![2.0]).unwrap();
        t.push(vec!["Y".into(), 1.into()], vec![1.0]).unwrap();
        t.push(vec!["Y".into(), 1.into()], vec![3.0]).unwrap();
        let r = Reduction::new(vec!["Area".into()], vec!["CO".into()], AggFunc::Max);
        assert!(matches!(
            reduce(&t, &r),
            Err(ErltError::IncompleteGroup { .. })
        ));
    }
}
