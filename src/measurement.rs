//! The in-memory form of one configuration's measurement file: a
//! sweep of (independent variable, runtime) points, or the single
//! serial reference runtime.

use serde::Serialize;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SeriesError {
    #[error(
        "independent variable has {independent} values but runtime has {runtime} values"
    )]
    LengthMismatch { independent: usize, runtime: usize },
    #[error("value at point {index} is not a finite number: {value}")]
    NotFinite { index: usize, value: f64 },
    #[error("runtime at point {index} is negative: {value}")]
    NegativeRuntime { index: usize, value: f64 },
}

fn check_runtime(index: usize, value: f64) -> Result<(), SeriesError> {
    if !value.is_finite() {
        return Err(SeriesError::NotFinite { index, value });
    }
    if value < 0. {
        return Err(SeriesError::NegativeRuntime { index, value });
    }
    Ok(())
}

/// Ordered measurement points. The order is the order of the rows in
/// the file; increasing x is the harness' convention but is not
/// checked. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSeries {
    independent_variable: Vec<f64>,
    runtime_seconds: Vec<f64>,
}

impl MeasurementSeries {
    /// Both vectors must have the same length, all values must be
    /// finite and runtimes non-negative. An empty series is allowed
    /// here; reductions reject it.
    pub fn new(
        independent_variable: Vec<f64>,
        runtime_seconds: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        if independent_variable.len() != runtime_seconds.len() {
            return Err(SeriesError::LengthMismatch {
                independent: independent_variable.len(),
                runtime: runtime_seconds.len(),
            });
        }
        for (index, x) in independent_variable.iter().enumerate() {
            if !x.is_finite() {
                return Err(SeriesError::NotFinite { index, value: *x });
            }
        }
        for (index, r) in runtime_seconds.iter().enumerate() {
            check_runtime(index, *r)?;
        }
        Ok(Self {
            independent_variable,
            runtime_seconds,
        })
    }

    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, SeriesError> {
        let (independent_variable, runtime_seconds) = points.into_iter().unzip();
        Self::new(independent_variable, runtime_seconds)
    }

    pub fn independent_variable(&self) -> &[f64] {
        &self.independent_variable
    }

    pub fn runtime_seconds(&self) -> &[f64] {
        &self.runtime_seconds
    }

    pub fn len(&self) -> usize {
        self.runtime_seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtime_seconds.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.independent_variable
            .iter()
            .copied()
            .zip(self.runtime_seconds.iter().copied())
    }

    /// A copy without the first `n` points (all of them if `n >=
    /// len`). Used to hide warm-up points at the start of a
    /// granularity sweep.
    pub fn without_leading_points(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            independent_variable: self.independent_variable[n..].to_vec(),
            runtime_seconds: self.runtime_seconds[n..].to_vec(),
        }
    }
}

/// Serial execution time for one problem size, the reference for
/// speedups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineRuntime {
    value: f64,
}

impl BaselineRuntime {
    /// Must be finite and non-negative. Zero is accepted here but
    /// refused when dividing by it.
    pub fn new(value: f64) -> Result<Self, SeriesError> {
        check_runtime(0, value)?;
        Ok(Self { value })
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn t_length_mismatch() {
        assert_eq!(
            MeasurementSeries::new(vec![1., 2.], vec![3.]),
            Err(SeriesError::LengthMismatch {
                independent: 2,
                runtime: 1
            })
        );
    }

    #[test]
    fn t_rejects_bad_values() {
        assert_eq!(
            MeasurementSeries::new(vec![1., 2.], vec![3., -0.5]),
            Err(SeriesError::NegativeRuntime {
                index: 1,
                value: -0.5
            })
        );
        assert!(matches!(
            MeasurementSeries::new(vec![f64::NAN], vec![1.]),
            Err(SeriesError::NotFinite { index: 0, .. })
        ));
        assert!(matches!(
            MeasurementSeries::new(vec![1.], vec![f64::INFINITY]),
            Err(SeriesError::NotFinite { index: 0, .. })
        ));
        assert!(BaselineRuntime::new(-1.).is_err());
        assert!(BaselineRuntime::new(0.).is_ok());
    }

    #[test]
    fn t_points_and_skip() -> Result<()> {
        let s = MeasurementSeries::from_points([(1., 4.), (2., 3.), (4., 3.5)])?;
        assert_eq!(s.len(), 3);
        assert_eq!(s.points().collect::<Vec<_>>(), [(1., 4.), (2., 3.), (4., 3.5)]);

        let t = s.without_leading_points(1);
        assert_eq!(t.independent_variable(), [2., 4.]);
        assert_eq!(t.runtime_seconds(), [3., 3.5]);
        // original untouched
        assert_eq!(s.len(), 3);

        assert!(s.without_leading_points(10).is_empty());
        Ok(())
    }
}
