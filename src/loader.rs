//! Reading the benchmark harness' result files.
//!
//! The files are whitespace separated numeric tables, one row per
//! sample. Sweep files have the independent variable (granularity) in
//! the first column and the runtime in seconds in the second; the
//! harness appends further columns (the mean runtime) which are
//! accepted and ignored. Baseline ("serial") files have a single row,
//! the reference runtime is taken from the column given by the
//! `BaselineConvention`.
//!
//! Blank lines and `#` comments are ignored. Any other deviation
//! makes the whole file unusable; no partial series is ever
//! returned.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    debug,
    measurement::{BaselineRuntime, MeasurementSeries},
};

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(", line {line}"),
        None => String::new(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("measurement file {path:?} does not exist")]
    NotFound { path: PathBuf },
    #[error("reading measurement file {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },
    #[error("malformed measurement file {path:?}{}: {reason}", line_suffix(.line))]
    Format {
        path: PathBuf,
        line: Option<usize>,
        reason: String,
    },
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, LoadError::Format { .. })
    }

    fn format(path: &Path, line: Option<usize>, reason: impl Into<String>) -> Self {
        LoadError::Format {
            path: path.to_owned(),
            line,
            reason: reason.into(),
        }
    }
}

/// Where in a baseline file the serial runtime is found. The harness
/// writes the same `G  min  mean` row layout as for the sweeps, thus
/// the default is the second column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineConvention {
    /// 0-based column index into the single data row
    #[serde(default = "BaselineConvention::default_column")]
    pub column: usize,
}

impl BaselineConvention {
    fn default_column() -> usize {
        1
    }
}

impl Default for BaselineConvention {
    fn default() -> Self {
        Self {
            column: Self::default_column(),
        }
    }
}

/// A data row with its 1-based line number in the file.
struct Row {
    line: usize,
    values: Vec<f64>,
}

/// Parse all data rows, requiring at least `min_columns` fields per
/// row, all numeric and finite, and the same field count in every
/// row.
fn read_rows(path: &Path, min_columns: usize) -> Result<Vec<Row>, LoadError> {
    let input = File::open(path).map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_owned(),
        },
        _ => LoadError::Io {
            path: path.to_owned(),
            error,
        },
    })?;
    let mut input = BufReader::new(input);

    let mut rows: Vec<Row> = Vec::new();
    let mut line = String::new();
    let mut linenum = 0;
    loop {
        line.clear();
        let n = input.read_line(&mut line).map_err(|error| match error.kind() {
            std::io::ErrorKind::InvalidData => {
                LoadError::format(path, Some(linenum + 1), "not valid UTF-8")
            }
            _ => LoadError::Io {
                path: path.to_owned(),
                error,
            },
        })?;
        if n == 0 {
            break;
        }
        linenum += 1;

        let data = line.split('#').next().unwrap_or("");
        let fields: Vec<&str> = data.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < min_columns {
            return Err(LoadError::format(
                path,
                Some(linenum),
                format!(
                    "expected at least {min_columns} numeric fields, got {}",
                    fields.len()
                ),
            ));
        }
        if let Some(first) = rows.first() {
            if first.values.len() != fields.len() {
                return Err(LoadError::format(
                    path,
                    Some(linenum),
                    format!(
                        "row has {} fields, but line {} has {}",
                        fields.len(),
                        first.line,
                        first.values.len()
                    ),
                ));
            }
        }
        let values = fields
            .iter()
            .map(|field| match f64::from_str(field) {
                Ok(v) if v.is_finite() => Ok(v),
                Ok(_) => Err(LoadError::format(
                    path,
                    Some(linenum),
                    format!("field {field:?} is not a finite number"),
                )),
                Err(e) => Err(LoadError::format(
                    path,
                    Some(linenum),
                    format!("field {field:?} is not a number: {e}"),
                )),
            })
            .collect::<Result<Vec<f64>, LoadError>>()?;
        rows.push(Row {
            line: linenum,
            values,
        });
    }
    Ok(rows)
}

/// Load a sweep: column 0 as the independent variable, column 1 as
/// runtime in seconds.
pub fn load_series(path: &Path) -> Result<MeasurementSeries, LoadError> {
    let rows = read_rows(path, 2)?;
    if let Some(row) = rows.iter().find(|row| row.values[1] < 0.) {
        return Err(LoadError::format(
            path,
            Some(row.line),
            format!("negative runtime {}", row.values[1]),
        ));
    }
    let series = MeasurementSeries::from_points(rows.iter().map(|row| (row.values[0], row.values[1])))
        .map_err(|e| LoadError::format(path, None, e.to_string()))?;
    debug!("loaded {} points from {path:?}", series.len());
    Ok(series)
}

/// Load the serial reference runtime from a single-row file.
pub fn load_baseline(
    path: &Path,
    convention: BaselineConvention,
) -> Result<BaselineRuntime, LoadError> {
    let BaselineConvention { column } = convention;
    let min_columns = column
        .checked_add(1)
        .ok_or_else(|| LoadError::format(path, None, format!("column index {column} out of range")))?;
    let rows = read_rows(path, min_columns)?;
    match rows.as_slice() {
        [] => Err(LoadError::format(
            path,
            None,
            "baseline file contains no data row",
        )),
        [row] => {
            let value = row.values[column];
            let baseline = BaselineRuntime::new(value)
                .map_err(|e| LoadError::format(path, Some(row.line), e.to_string()))?;
            debug!("loaded baseline {value} s from {path:?}");
            Ok(baseline)
        }
        [_, second, ..] => Err(LoadError::format(
            path,
            Some(second.line),
            format!(
                "baseline file must contain a single data row, found {}",
                rows.len()
            ),
        )),
    }
}

/// Reads measurement files. Holds the only configurable part of
/// reading, the baseline column convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementLoader {
    pub baseline_convention: BaselineConvention,
}

impl MeasurementLoader {
    pub fn new(baseline_convention: BaselineConvention) -> Self {
        Self {
            baseline_convention,
        }
    }

    pub fn load_series(&self, path: &Path) -> Result<MeasurementSeries, LoadError> {
        load_series(path)
    }

    pub fn load_baseline(&self, path: &Path) -> Result<BaselineRuntime, LoadError> {
        load_baseline(path, self.baseline_convention)
    }
}
