//! The derived series that comparison charts are drawn from. All
//! functions here are pure; loading and iteration order belong to the
//! caller.

use num_traits::Zero;
use serde::Serialize;

use crate::{
    key::ConfigurationKey,
    measurement::{BaselineRuntime, MeasurementSeries},
    reduction::{reduce_minimum, AggregateError, ReductionPolicy},
};

fn speedup(baseline: &BaselineRuntime, representative_runtime: f64) -> Result<f64, AggregateError> {
    if baseline.value().is_zero() {
        return Err(AggregateError::ZeroBaseline);
    }
    if representative_runtime.is_zero() {
        return Err(AggregateError::ZeroRuntime);
    }
    let speedup = baseline.value() / representative_runtime;
    if !speedup.is_finite() {
        return Err(AggregateError::NonFiniteSpeedup {
            baseline: baseline.value(),
            runtime: representative_runtime,
        });
    }
    Ok(speedup)
}

/// `(thread_count, baseline / min(runtimes))` for each given thread
/// count, in the order given.
pub fn compute_speedup_sweep<'s>(
    baseline: &BaselineRuntime,
    per_thread_series: impl IntoIterator<Item = (u32, &'s MeasurementSeries)>,
) -> Result<Vec<(u32, f64)>, AggregateError> {
    compute_speedup_sweep_with(ReductionPolicy::Minimum, baseline, per_thread_series)
}

pub fn compute_speedup_sweep_with<'s>(
    policy: ReductionPolicy,
    baseline: &BaselineRuntime,
    per_thread_series: impl IntoIterator<Item = (u32, &'s MeasurementSeries)>,
) -> Result<Vec<(u32, f64)>, AggregateError> {
    if baseline.value().is_zero() {
        return Err(AggregateError::ZeroBaseline);
    }
    per_thread_series
        .into_iter()
        .map(|(thread_count, series)| {
            let r = policy
                .reduce(series)
                .and_then(|r| speedup(baseline, r))
                .map_err(|e| e.at_thread_count(thread_count))?;
            Ok((thread_count, r))
        })
        .collect()
}

/// Representative runtime per thread count, without dividing by a
/// baseline.
pub fn compute_runtime_sweep<'s>(
    policy: ReductionPolicy,
    per_thread_series: impl IntoIterator<Item = (u32, &'s MeasurementSeries)>,
) -> Result<Vec<(u32, f64)>, AggregateError> {
    per_thread_series
        .into_iter()
        .map(|(thread_count, series)| {
            let r = policy
                .reduce_nonzero(series)
                .map_err(|e| e.at_thread_count(thread_count))?;
            Ok((thread_count, r))
        })
        .collect()
}

/// The points of a granularity sweep, as measured. No reduction: the
/// whole runtime curve over granularity is what gets compared.
pub fn compute_granularity_sweep(series: &MeasurementSeries) -> Vec<(f64, f64)> {
    series.points().collect()
}

/// The best runtime seen anywhere in the sweep, drawn as a flat
/// reference line across a granularity chart.
pub fn compute_grand_minimum_line(series: &MeasurementSeries) -> Result<f64, AggregateError> {
    reduce_minimum(series)
}

/// The result for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetric {
    pub key: ConfigurationKey,
    /// Always > 0
    pub representative_runtime: f64,
    /// None if no baseline was given
    pub speedup: Option<f64>,
}

pub fn derive_metric(
    key: ConfigurationKey,
    series: &MeasurementSeries,
    baseline: Option<&BaselineRuntime>,
    policy: ReductionPolicy,
) -> Result<DerivedMetric, AggregateError> {
    let at = |e: AggregateError| e.at_thread_count(key.thread_count);
    let representative_runtime = policy.reduce_nonzero(series).map_err(at)?;
    let speedup = baseline
        .map(|baseline| speedup(baseline, representative_runtime))
        .transpose()
        .map_err(at)?;
    Ok(DerivedMetric {
        key,
        representative_runtime,
        speedup,
    })
}
