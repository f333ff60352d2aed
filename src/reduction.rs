//! How a series of repeated measurements is reduced to the single
//! representative runtime that gets compared across configurations.

use std::{fmt::Display, str::FromStr};

use anyhow::bail;
use noisy_float::prelude::{r64, R64};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::measurement::MeasurementSeries;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("cannot reduce an empty measurement series")]
    EmptySeries,
    #[error("reduced runtime is zero, refusing to divide by it")]
    ZeroRuntime,
    #[error("baseline runtime is zero, refusing to divide by it")]
    ZeroBaseline,
    #[error("speedup {baseline} s / {runtime} s is not a finite number")]
    NonFiniteSpeedup { baseline: f64, runtime: f64 },
    #[error("at thread count {thread_count}: {error}")]
    ThreadCount {
        thread_count: u32,
        error: Box<AggregateError>,
    },
}

impl AggregateError {
    /// The error without `ThreadCount` wrappers.
    pub fn innermost(&self) -> &AggregateError {
        match self {
            AggregateError::ThreadCount { error, .. } => error.innermost(),
            _ => self,
        }
    }

    pub fn at_thread_count(self, thread_count: u32) -> Self {
        AggregateError::ThreadCount {
            thread_count,
            error: Box::new(self),
        }
    }
}

fn sorted_runtimes(series: &MeasurementSeries) -> Vec<R64> {
    // Runtimes are validated to be finite on construction.
    let mut vals: Vec<R64> = series.runtime_seconds().iter().map(|v| r64(*v)).collect();
    vals.sort();
    vals
}

/// The minimum runtime of all points. Trial noise (scheduling
/// jitter, cold caches) only ever adds time, so the fastest trial is
/// the closest to what the configuration can achieve.
pub fn reduce_minimum(series: &MeasurementSeries) -> Result<f64, AggregateError> {
    series
        .runtime_seconds()
        .iter()
        .map(|v| r64(*v))
        .min()
        .map(|v| v.raw())
        .ok_or(AggregateError::EmptySeries)
}

/// Median, interpolated between the two middle values for even
/// counts.
pub fn reduce_median(series: &MeasurementSeries) -> Result<f64, AggregateError> {
    let vals = sorted_runtimes(series);
    if vals.is_empty() {
        return Err(AggregateError::EmptySeries);
    }
    let mid = vals.len() / 2;
    if vals.len() % 2 == 0 {
        Ok(((vals[mid - 1] + vals[mid]) / 2.).raw())
    } else {
        Ok(vals[mid].raw())
    }
}

pub fn reduce_mean(series: &MeasurementSeries) -> Result<f64, AggregateError> {
    if series.is_empty() {
        return Err(AggregateError::EmptySeries);
    }
    let sum: f64 = series.runtime_seconds().iter().sum();
    Ok(sum / series.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionPolicy {
    #[default]
    #[serde(alias = "min")]
    Minimum,
    Median,
    #[serde(alias = "average", alias = "avg")]
    Mean,
}

impl ReductionPolicy {
    pub fn reduce(self, series: &MeasurementSeries) -> Result<f64, AggregateError> {
        match self {
            ReductionPolicy::Minimum => reduce_minimum(series),
            ReductionPolicy::Median => reduce_median(series),
            ReductionPolicy::Mean => reduce_mean(series),
        }
    }

    /// Reduce and require a non-zero result, as representative
    /// runtimes are used as divisors.
    pub fn reduce_nonzero(self, series: &MeasurementSeries) -> Result<f64, AggregateError> {
        let r = self.reduce(series)?;
        if r.is_zero() {
            return Err(AggregateError::ZeroRuntime);
        }
        Ok(r)
    }
}

impl FromStr for ReductionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ReductionPolicy::*;
        match s {
            "min" | "minimum" | "Minimum" => Ok(Minimum),
            "median" | "Median" => Ok(Median),
            "mean" | "Mean" | "average" | "avg" => Ok(Mean),
            _ => bail!("expecting one of min|median|mean, got: {s:?}"),
        }
    }
}

impl Display for ReductionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ReductionPolicy::Minimum => "min",
            ReductionPolicy::Median => "median",
            ReductionPolicy::Mean => "mean",
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    fn series(runtimes: &[f64]) -> Result<MeasurementSeries> {
        Ok(MeasurementSeries::from_points(
            runtimes
                .iter()
                .enumerate()
                .map(|(i, r)| (i as f64 + 1., *r)),
        )?)
    }

    #[test]
    fn t_minimum() -> Result<()> {
        assert_eq!(reduce_minimum(&series(&[6.0, 5.0, 5.5])?)?, 5.0);
        assert_eq!(reduce_minimum(&series(&[0.25])?)?, 0.25);
        Ok(())
    }

    #[test]
    fn t_minimum_is_permutation_invariant() -> Result<()> {
        let vals = [3.2, 2.1, 4.8, 2.1, 9.0];
        let expected = reduce_minimum(&series(&vals)?)?;
        let mut permuted = vals;
        for _ in 0..vals.len() {
            permuted.rotate_left(1);
            assert_eq!(reduce_minimum(&series(&permuted)?)?, expected);
            let mut reversed = permuted;
            reversed.reverse();
            assert_eq!(reduce_minimum(&series(&reversed)?)?, expected);
        }
        assert_eq!(expected, 2.1);
        Ok(())
    }

    #[test]
    fn t_empty() -> Result<()> {
        let empty = series(&[])?;
        for policy in [
            ReductionPolicy::Minimum,
            ReductionPolicy::Median,
            ReductionPolicy::Mean,
        ] {
            assert_eq!(policy.reduce(&empty), Err(AggregateError::EmptySeries));
        }
        Ok(())
    }

    #[test]
    fn t_median_and_mean() -> Result<()> {
        assert_eq!(reduce_median(&series(&[23., 4., 8., 7.])?)?, 7.5);
        assert_eq!(reduce_median(&series(&[23., 4., 8.])?)?, 8.);
        assert_eq!(reduce_mean(&series(&[1., 2., 6.])?)?, 3.);
        Ok(())
    }

    #[test]
    fn t_reduce_nonzero() -> Result<()> {
        assert_eq!(
            ReductionPolicy::Minimum.reduce_nonzero(&series(&[0., 1.])?),
            Err(AggregateError::ZeroRuntime)
        );
        assert_eq!(ReductionPolicy::Mean.reduce_nonzero(&series(&[0., 1.])?)?, 0.5);
        Ok(())
    }

    #[test]
    fn t_policy_parsing() -> Result<()> {
        assert_eq!("min".parse::<ReductionPolicy>()?, ReductionPolicy::Minimum);
        assert_eq!("avg".parse::<ReductionPolicy>()?, ReductionPolicy::Mean);
        assert!("p90".parse::<ReductionPolicy>().is_err());
        let p: ReductionPolicy = serde_json::from_str(r#""min""#)?;
        assert_eq!(p, ReductionPolicy::Minimum);
        let p: ReductionPolicy = serde_json::from_str(r#""median""#)?;
        assert_eq!(p, ReductionPolicy::Median);
        assert_eq!(ReductionPolicy::default().to_string(), "min");
        Ok(())
    }

    #[test]
    fn t_thread_count_wrapping() {
        let e = AggregateError::ZeroRuntime.at_thread_count(8);
        assert_eq!(e.innermost(), &AggregateError::ZeroRuntime);
        assert_eq!(
            e.to_string(),
            "at thread count 8: reduced runtime is zero, refusing to divide by it"
        );
    }
}
