use thiserror::Error;

/// Error type for interpolation, reduction and table boundary operations.
#[derive(Error, Debug)]
pub enum ErltError {
    #[error("Group [{group}] has {distinct} distinct {axis} coordinate(s); linear interpolation needs at least 2")]
    InsufficientData {
        group: String,
        axis: String,
        distinct: usize,
    },
    #[error("Extrapolation is not allowed. Group [{group}] requested {axis}={target}, observed range=[{min}, {max}]")]
    OutOfDomain {
        group: String,
        axis: String,
        target: f64,
        min: f64,
        max: f64,
    },
    #[error("Interpolated value not matching given value. Group [{group}], {quantity} at {axis}={coordinate}: observed {observed}, interpolated {interpolated}")]
    RoundTripMismatch {
        group: String,
        axis: String,
        quantity: String,
        coordinate: f64,
        observed: f64,
        interpolated: f64,
    },
    #[error("Group [{group}] is not uniformly represented over [{collapsed}]: expected {expected} row(s), found {found}")]
    IncompleteGroup {
        group: String,
        collapsed: String,
        expected: usize,
        found: usize,
    },
    #[error("No interpolation rule for axis {0}. Only yearid and avgspeed are handled; give an explicit transform for other columns")]
    UnsupportedAxis(String),
    #[error("Grid for {axis} contains {value} more than once")]
    DuplicateGridValue { axis: String, value: f64 },
    #[error("Invalid grid for {axis}: {reason}")]
    InvalidGrid { axis: String, reason: String },
    #[error("Group [{group}] has {axis}={coordinate}, which is not on the canonical grid")]
    CoordinateNotInGrid {
        group: String,
        axis: String,
        coordinate: f64,
    },
    #[error("Unknown column {0}")]
    UnknownColumn(String),
    #[error("Column {0} is declared more than once")]
    DuplicateColumn(String),
    #[error("Table columns {found:?} do not match the expected columns {expected:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Row has {found} {kind} value(s), table declares {expected}")]
    RowArity {
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Value of {quantity} is not finite ({value})")]
    NonFiniteValue { quantity: String, value: f64 },
    #[error("Value of {quantity} is negative ({value})")]
    NegativeValue { quantity: String, value: f64 },
    #[error("Axis column {column} holds non-numeric label {label}")]
    NonNumericAxis { column: String, label: String },
    #[error("More than one row for [{key}]")]
    DuplicateObservation { key: String },
    #[error("Stage {stage} ({axis}) must group by {missing}, produced by an earlier stage")]
    StageOrder {
        stage: usize,
        axis: String,
        missing: String,
    },
    #[error("Pipeline has no interpolation stage")]
    EmptyPipeline,
    #[error("Table is missing {missing} of {expected} key combination(s), e.g. [{example}]")]
    IncompleteCoverage {
        missing: usize,
        expected: usize,
        example: String,
    },
    #[error("Unknown aggregation function {0}")]
    UnknownAggregation(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Table {0} not found")]
    TableNotFound(String),
    #[error("Cannot parse {value:?} in column {column}")]
    Parse { column: String, value: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Convenience type for `Result<T, ErltError>`.
pub type ErltResult<T> = Result<T, ErltError>;
