//! Long-form emission-rate tables.
//!
//! A [`Table`] has a fixed list of dimension columns (region, month, road
//! class, year, speed, ...) holding [`Label`]s and a fixed list of quantity
//! columns (pollutant rates) holding finite, non-negative `f64`s. Each row is one
//! (dimension key, quantity values) record; a missing grid point is a missing
//! row, never a sentinel value.
use std::collections::HashMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::errors::{ErltError, ErltResult};
use crate::utils::cartesian;

/// Value of a dimension column.
///
/// Numeric labels (years, speeds, month ids) share one variant so that a year
/// used as an interpolation axis in one stage is the same key in the next.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Num(OrderedFloat<f64>),
    Text(String),
}

impl Label {
    /// Numeric value, if the label is numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Label::Num(x) => Some(x.into_inner()),
            Label::Text(_) => None,
        }
    }

    /// Parse a raw text field, preferring a numeric label.
    ///
    /// Surrounding whitespace is dropped either way. Text that reads as a
    /// finite number becomes [`Label::Num`], so `Label::Text("1")` does not
    /// survive a write and read through text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() => Label::Num(OrderedFloat(x)),
            _ => Label::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Num(x) if x.0.fract() == 0.0 && x.0.abs() < 1e15 => write!(f, "{:.0}", x.0),
            Label::Num(x) => write!(f, "{}", x.0),
            Label::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Label {
    fn from(x: f64) -> Self {
        Label::Num(OrderedFloat(x))
    }
}

impl From<i64> for Label {
    fn from(x: i64) -> Self {
        Label::Num(OrderedFloat(x as f64))
    }
}

impl From<i32> for Label {
    fn from(x: i32) -> Self {
        Label::Num(OrderedFloat(f64::from(x)))
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

/// One record of a [`Table`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub keys: Vec<Label>,
    pub values: Vec<f64>,
}

/// A single (key, quantity, value) observation, borrowed from a table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation<'a> {
    pub key: &'a [Label],
    pub quantity: &'a str,
    pub value: f64,
}

/// Column names of a table, without its rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub dims: Vec<String>,
    pub quantities: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    dims: Vec<String>,
    quantities: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Empty table with the given dimension and quantity columns.
    ///
    /// # Errors
    /// * If any column name is used twice, across both lists
    pub fn new<D, Q>(dims: D, quantities: Q) -> ErltResult<Self>
    where
        D: IntoIterator,
        D::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
    {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        let quantities: Vec<String> = quantities.into_iter().map(Into::into).collect();
        let mut seen = std::collections::HashSet::new();
        for name in dims.iter().chain(quantities.iter()) {
            if !seen.insert(name.as_str()) {
                return Err(ErltError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            dims,
            quantities,
            rows: Vec::new(),
        })
    }

    pub fn from_schema(schema: &Schema) -> ErltResult<Self> {
        Self::new(schema.dims.clone(), schema.quantities.clone())
    }

    pub fn schema(&self) -> Schema {
        Schema {
            dims: self.dims.clone(),
            quantities: self.quantities.clone(),
        }
    }

    /// Append a row.
    ///
    /// # Errors
    /// * If the number of keys or values does not match the columns
    /// * If any value is NaN or infinite
    /// * If any value is negative; rates are never below zero
    pub fn push(&mut self, keys: Vec<Label>, values: Vec<f64>) -> ErltResult<()> {
        self.push_row(Row { keys, values })
    }

    pub fn push_row(&mut self, row: Row) -> ErltResult<()> {
        if row.keys.len() != self.dims.len() {
            return Err(ErltError::RowArity {
                kind: "key",
                expected: self.dims.len(),
                found: row.keys.len(),
            });
        }
        if row.values.len() != self.quantities.len() {
            return Err(ErltError::RowArity {
                kind: "quantity",
                expected: self.quantities.len(),
                found: row.values.len(),
            });
        }
        if let Some(i) = row.values.iter().position(|v| !v.is_finite()) {
            return Err(ErltError::NonFiniteValue {
                quantity: self.quantities[i].clone(),
                value: row.values[i],
            });
        }
        if let Some(i) = row.values.iter().position(|&v| v < 0.0) {
            return Err(ErltError::NegativeValue {
                quantity: self.quantities[i].clone(),
                value: row.values[i],
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn quantities(&self) -> &[String] {
        &self.quantities
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dim_index(&self, name: &str) -> ErltResult<usize> {
        self.dims
            .iter()
            .position(|d| d == name)
            .ok_or_else(|| ErltError::UnknownColumn(name.to_string()))
    }

    pub fn quantity_index(&self, name: &str) -> ErltResult<usize> {
        self.quantities
            .iter()
            .position(|q| q == name)
            .ok_or_else(|| ErltError::UnknownColumn(name.to_string()))
    }

    /// Value of `quantity` in the row whose keys match `key` exactly.
    pub fn lookup(&self, key: &[Label], quantity: &str) -> ErltResult<Option<f64>> {
        let q = self.quantity_index(quantity)?;
        Ok(self
            .rows
            .iter()
            .find(|r| r.keys == key)
            .map(|r| r.values[q]))
    }

    /// Distinct values of a dimension column, sorted.
    pub fn distinct(&self, column: &str) -> ErltResult<Vec<Label>> {
        let j = self.dim_index(column)?;
        let mut labels: Vec<Label> = self.rows.iter().map(|r| r.keys[j].clone()).collect();
        labels.sort();
        labels.dedup();
        Ok(labels)
    }

    /// Rows whose `column` value is one of `allowed`.
    pub fn filter(&self, column: &str, allowed: &[Label]) -> ErltResult<Table> {
        let j = self.dim_index(column)?;
        Ok(Table {
            dims: self.dims.clone(),
            quantities: self.quantities.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| allowed.contains(&r.keys[j]))
                .cloned()
                .collect(),
        })
    }

    /// Sort rows by their keys, in column order.
    pub fn sort(&mut self) {
        self.rows.sort_by(|a, b| a.keys.cmp(&b.keys));
    }

    /// Flatten into (key, quantity, value) observations, row by row.
    pub fn observations(&self) -> impl Iterator<Item = Observation<'_>> + '_ {
        self.rows.iter().flat_map(move |r| {
            self.quantities
                .iter()
                .zip(r.values.iter())
                .map(move |(q, &value)| Observation {
                    key: &r.keys,
                    quantity: q.as_str(),
                    value,
                })
        })
    }

    /// Check that the table holds exactly one row for every combination of
    /// the expected values of each dimension column.
    ///
    /// `expected` must name every dimension column of the table, in any order.
    ///
    /// # Errors
    /// * `ColumnMismatch` if `expected` does not name exactly the table's dimensions
    /// * `DuplicateObservation` if any key appears twice
    /// * `IncompleteCoverage` if any expected combination has no row, or any
    ///   row falls outside the expected combinations
    pub fn check_coverage(&self, expected: &[(&str, Vec<Label>)]) -> ErltResult<()> {
        let names: Vec<&str> = expected.iter().map(|(n, _)| *n).collect();
        let order = self.coverage_order(&names)?;
        let axes: Vec<&[Label]> = expected.iter().map(|(_, v)| v.as_slice()).collect();
        self.coverage_against(&names, &order, cartesian(&axes))
    }

    /// Like [`Table::check_coverage`], but the `key_columns` only need to
    /// cover the given observed `keys`, not every combination of their values.
    ///
    /// Use this when some key combinations legitimately never occur
    /// (e.g. a fuel type a vehicle type never burns), while every observed
    /// key must still be present at every point of the `axes`.
    pub fn check_key_coverage(
        &self,
        key_columns: &[&str],
        keys: &[Vec<Label>],
        axes: &[(&str, Vec<Label>)],
    ) -> ErltResult<()> {
        let mut names = key_columns.to_vec();
        names.extend(axes.iter().map(|(n, _)| *n));
        let order = self.coverage_order(&names)?;
        if let Some(bad) = keys.iter().find(|k| k.len() != key_columns.len()) {
            return Err(ErltError::RowArity {
                kind: "key",
                expected: key_columns.len(),
                found: bad.len(),
            });
        }
        let grids: Vec<&[Label]> = axes.iter().map(|(_, v)| v.as_slice()).collect();
        let combos = keys.iter().flat_map(|key| {
            cartesian(&grids).map(move |point| key.iter().chain(point).collect::<Vec<_>>())
        });
        self.coverage_against(&names, &order, combos)
    }

    /// Positions of `names`, which must be a permutation of the dimensions.
    fn coverage_order(&self, names: &[&str]) -> ErltResult<Vec<usize>> {
        let order = names
            .iter()
            .map(|n| self.dim_index(n))
            .collect::<ErltResult<Vec<_>>>()?;
        let mut sorted_order = order.clone();
        sorted_order.sort_unstable();
        sorted_order.dedup();
        if sorted_order.len() != self.dims.len() || order.len() != self.dims.len() {
            return Err(ErltError::ColumnMismatch {
                expected: names.iter().map(|n| n.to_string()).collect(),
                found: self.dims.clone(),
            });
        }
        Ok(order)
    }

    fn coverage_against<'e, I>(&self, names: &[&str], order: &[usize], combos: I) -> ErltResult<()>
    where
        I: Iterator<Item = Vec<&'e Label>>,
    {
        let mut counts: HashMap<Vec<&Label>, usize> = HashMap::with_capacity(self.rows.len());
        for r in &self.rows {
            let key: Vec<&Label> = order.iter().map(|&j| &r.keys[j]).collect();
            let n = counts.entry(key).or_insert(0);
            *n += 1;
            if *n > 1 {
                return Err(ErltError::DuplicateObservation {
                    key: render_key(&self.dims, &r.keys),
                });
            }
        }

        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let mut total = 0;
        let mut missing = 0;
        let mut example = None;
        for combo in combos {
            total += 1;
            if counts.remove(&combo).is_none() {
                missing += 1;
                if example.is_none() {
                    let owned: Vec<Label> = combo.into_iter().cloned().collect();
                    example = Some(render_key(&names, &owned));
                }
            }
        }
        // Rows left over are outside the expected combinations
        if let Some(extra) = counts.keys().next() {
            missing += counts.len();
            if example.is_none() {
                let owned: Vec<Label> = extra.iter().map(|&l| l.clone()).collect();
                example = Some(render_key(&names, &owned));
            }
        }

        match example {
            None => Ok(()),
            Some(example) => Err(ErltError::IncompleteCoverage {
                missing,
                expected: total,
                example,
            }),
        }
    }
}

/// `name=value` pairs for error messages and logs
pub(crate) fn render_key(names: &[String], labels: &[Label]) -> String {
    names
        .iter()
        .zip(labels.iter())
        .map(|(n, l)| format!("{n}={l}"))
        .collect::<Vec<_>>()
        .join(", ")
}
