//! Driving the aggregation over a whole experiment: which files to
//! load in which order, what to do about missing ones, and collecting
//! the results into per-chart datasets.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

use crate::{
    aggregator::{
        compute_grand_minimum_line, compute_granularity_sweep, derive_metric, DerivedMetric,
    },
    ctx, debug,
    experiment::Experiment,
    info,
    key::{ConfigurationKey, Strategy},
    loader::{LoadError, MeasurementLoader},
    measurement::{BaselineRuntime, MeasurementSeries},
};

/// Where measurements come from. The file based implementation is
/// `FileSource`.
pub trait MeasurementSource {
    fn series(&self, key: ConfigurationKey) -> Result<MeasurementSeries, LoadError>;

    fn baseline(&self, problem_size: u32) -> Result<BaselineRuntime, LoadError>;

    /// For messages only.
    fn describe_series(&self, key: ConfigurationKey) -> String {
        key.to_string()
    }

    fn describe_baseline(&self, problem_size: u32) -> String {
        format!("serial baseline for N={problem_size}")
    }
}

/// Measurement files as laid out by the benchmark harness, found via
/// the experiment's path templates.
pub struct FileSource<'e> {
    experiment: &'e Experiment,
    loader: MeasurementLoader,
}

impl<'e> FileSource<'e> {
    pub fn new(experiment: &'e Experiment) -> Self {
        Self {
            experiment,
            loader: MeasurementLoader::new(experiment.baseline),
        }
    }

    fn series_path(&self, key: ConfigurationKey) -> Result<PathBuf, LoadError> {
        // Templates were checked when the experiment was; still,
        // turn a failure into a load error instead of panicking.
        self.experiment
            .series_file(key)
            .map_err(|e| LoadError::Format {
                path: PathBuf::from(self.experiment.series_path.to_string()),
                line: None,
                reason: e.to_string(),
            })
    }

    fn baseline_path(&self, problem_size: u32) -> Result<PathBuf, LoadError> {
        self.experiment
            .baseline_file(problem_size)
            .map_err(|e| LoadError::Format {
                path: PathBuf::from(self.experiment.baseline_path.to_string()),
                line: None,
                reason: e.to_string(),
            })
    }
}

impl<'e> MeasurementSource for FileSource<'e> {
    fn series(&self, key: ConfigurationKey) -> Result<MeasurementSeries, LoadError> {
        let path = self.series_path(key)?;
        debug!("loading {key} from {path:?}");
        self.loader.load_series(&path)
    }

    fn baseline(&self, problem_size: u32) -> Result<BaselineRuntime, LoadError> {
        let path = self.baseline_path(problem_size)?;
        debug!("loading baseline for N={problem_size} from {path:?}");
        self.loader.load_baseline(&path)
    }

    fn describe_series(&self, key: ConfigurationKey) -> String {
        match self.series_path(key) {
            Ok(path) => format!("{key} ({path:?})"),
            Err(_) => key.to_string(),
        }
    }

    fn describe_baseline(&self, problem_size: u32) -> String {
        match self.baseline_path(problem_size) {
            Ok(path) => format!("serial baseline for N={problem_size} ({path:?})"),
            Err(_) => format!("serial baseline for N={problem_size}"),
        }
    }
}

/// One plotted line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyLine {
    pub strategy: Strategy,
    pub label: &'static str,
    pub points: Vec<(f64, f64)>,
}

impl StrategyLine {
    fn new(strategy: Strategy, points: Vec<(f64, f64)>) -> Self {
        Self {
            strategy,
            label: strategy.label(),
            points,
        }
    }

    /// The y value at x, if there is a point there.
    pub fn y_at(&self, x: f64) -> Option<f64> {
        self.points
            .iter()
            .find(|(px, _)| *px == x)
            .map(|(_, y)| *y)
    }
}

/// Data for the two charts of one problem size: speedup vs threads,
/// representative runtime vs threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingChart {
    pub problem_size: u32,
    pub baseline_seconds: f64,
    pub thread_counts: Vec<u32>,
    pub speedup: Vec<StrategyLine>,
    pub runtime: Vec<StrategyLine>,
    pub metrics: Vec<DerivedMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Floor {
    pub strategy: Strategy,
    pub runtime: f64,
}

/// Raw runtime over granularity, one line per strategy, at a fixed
/// problem size and thread count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GranularityChart {
    pub problem_size: u32,
    pub thread_count: u32,
    pub lines: Vec<StrategyLine>,
    pub floor: Option<Floor>,
}

/// Returns None if missing files are to be skipped and this one is
/// missing.
fn skip_if_missing<T>(
    experiment: &Experiment,
    what: impl FnOnce() -> String,
    result: Result<T, LoadError>,
) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() && experiment.skip_missing => {
            info!("skipping {}: {e}", what());
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| anyhow!("loading {}", what())),
    }
}

fn scaling_chart(
    experiment: &Experiment,
    source: &impl MeasurementSource,
    problem_size: u32,
    baseline: BaselineRuntime,
) -> Result<ScalingChart> {
    let policy = experiment.reduction;
    let mut speedup = Vec::new();
    let mut runtime = Vec::new();
    let mut metrics = Vec::new();

    for &strategy in &experiment.strategies {
        let mut speedup_points = Vec::new();
        let mut runtime_points = Vec::new();
        for &thread_count in &experiment.threads {
            let key = ConfigurationKey {
                problem_size,
                thread_count,
                strategy,
            };
            let Some(series) =
                skip_if_missing(experiment, || source.describe_series(key), source.series(key))?
            else {
                continue;
            };
            let metric = derive_metric(key, &series, Some(&baseline), policy)
                .map_err(ctx!("aggregating {key}"))?;
            let Some(s) = metric.speedup else {
                bail!("bug: no speedup for {key} despite baseline")
            };
            let r = metric.representative_runtime;
            debug!("{key}: {policy} runtime {r} s, speedup {s}");
            speedup_points.push((f64::from(thread_count), s));
            runtime_points.push((f64::from(thread_count), r));
            metrics.push(metric);
        }
        speedup.push(StrategyLine::new(strategy, speedup_points));
        runtime.push(StrategyLine::new(strategy, runtime_points));
    }

    Ok(ScalingChart {
        problem_size,
        baseline_seconds: baseline.value(),
        thread_counts: experiment.threads.clone(),
        speedup,
        runtime,
        metrics,
    })
}

/// Speedup and runtime over thread counts, per problem size, in the
/// order of `experiment.sizes`.
pub fn run_scaling(
    experiment: &Experiment,
    source: &impl MeasurementSource,
) -> Result<Vec<ScalingChart>> {
    let mut charts = Vec::new();
    for &problem_size in &experiment.sizes {
        let baseline = match skip_if_missing(
            experiment,
            || source.describe_baseline(problem_size),
            source.baseline(problem_size),
        )? {
            Some(baseline) => baseline,
            None => continue,
        };
        info!(
            "N={problem_size}: serial runtime {} s",
            baseline.value()
        );
        charts.push(scaling_chart(experiment, source, problem_size, baseline)?);
    }
    Ok(charts)
}

/// Runtime over granularity for the experiment's granularity
/// configuration.
pub fn run_granularity(
    experiment: &Experiment,
    source: &impl MeasurementSource,
) -> Result<GranularityChart> {
    let Some(granularity) = &experiment.granularity else {
        bail!("the experiment config has no `granularity` section")
    };
    let mut lines = Vec::new();
    let mut floor = None;

    for &strategy in &granularity.strategies {
        let key = ConfigurationKey {
            problem_size: granularity.size,
            thread_count: granularity.threads,
            strategy,
        };
        let Some(series) =
            skip_if_missing(experiment, || source.describe_series(key), source.series(key))?
        else {
            continue;
        };
        let series = series.without_leading_points(granularity.skip_leading_for(strategy));
        if granularity.floor_strategy == Some(strategy) {
            let runtime = compute_grand_minimum_line(&series)
                .map_err(ctx!("reference floor from {key}"))?;
            floor = Some(Floor { strategy, runtime });
        }
        lines.push(StrategyLine::new(strategy, compute_granularity_sweep(&series)));
    }

    if let (Some(strategy), None) = (granularity.floor_strategy, &floor) {
        info!("no reference floor: data for {strategy} was skipped");
    }

    Ok(GranularityChart {
        problem_size: granularity.size,
        thread_count: granularity.threads,
        lines,
        floor,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::{
        experiment::ExperimentConfig, loader::BaselineConvention, reduction::AggregateError,
        reduction::ReductionPolicy,
    };

    use super::*;

    /// In-memory measurements; absent entries behave like missing
    /// files.
    #[derive(Default)]
    struct MemorySource {
        baselines: BTreeMap<u32, f64>,
        series: BTreeMap<ConfigurationKey, Vec<(f64, f64)>>,
    }

    impl MemorySource {
        fn not_found(what: String) -> LoadError {
            LoadError::NotFound { path: what.into() }
        }
    }

    impl MeasurementSource for MemorySource {
        fn series(&self, key: ConfigurationKey) -> Result<MeasurementSeries, LoadError> {
            let points = self
                .series
                .get(&key)
                .ok_or_else(|| Self::not_found(key.to_string()))?;
            Ok(MeasurementSeries::from_points(points.iter().copied()).expect("valid test data"))
        }

        fn baseline(&self, problem_size: u32) -> Result<BaselineRuntime, LoadError> {
            let v = self
                .baselines
                .get(&problem_size)
                .ok_or_else(|| Self::not_found(format!("N{problem_size}_serial")))?;
            Ok(BaselineRuntime::new(*v).expect("valid test data"))
        }
    }

    fn experiment(
        sizes: &[u32],
        threads: &[u32],
        strategies: &[Strategy],
        skip_missing: bool,
    ) -> Experiment {
        Experiment {
            machine: "test".into(),
            results_dir: "/results".into(),
            series_path: "{results_dir}/{strategy}/N{size}_{threads}.dat"
                .parse()
                .expect("valid"),
            baseline_path: "{results_dir}/N{size}_serial.dat".parse().expect("valid"),
            sizes: sizes.to_vec(),
            threads: threads.to_vec(),
            strategies: strategies.to_vec(),
            baseline: BaselineConvention::default(),
            reduction: ReductionPolicy::Minimum,
            granularity: None,
            skip_missing,
        }
    }

    fn key(problem_size: u32, thread_count: u32, strategy: Strategy) -> ConfigurationKey {
        ConfigurationKey {
            problem_size,
            thread_count,
            strategy,
        }
    }

    fn source() -> MemorySource {
        let mut s = MemorySource::default();
        s.baselines.insert(512, 10.0);
        s.series.insert(
            key(512, 2, Strategy::ForkJoin),
            vec![(1., 6.0), (2., 5.0), (4., 5.5)],
        );
        s.series
            .insert(key(512, 4, Strategy::ForkJoin), vec![(1., 3.0), (2., 2.5)]);
        s.series
            .insert(key(512, 2, Strategy::Dataflow), vec![(1., 4.0), (2., 4.5)]);
        s.series
            .insert(key(512, 4, Strategy::Dataflow), vec![(1., 2.0), (2., 2.2)]);
        s
    }

    #[test]
    fn t_scaling() -> Result<()> {
        let e = experiment(&[512], &[2, 4], &[Strategy::ForkJoin, Strategy::Dataflow], false);
        let charts = run_scaling(&e, &source())?;
        assert_eq!(charts.len(), 1);
        let c = &charts[0];
        assert_eq!(c.baseline_seconds, 10.0);
        assert_eq!(c.speedup[0].strategy, Strategy::ForkJoin);
        assert_eq!(c.speedup[0].points, [(2., 2.0), (4., 4.0)]);
        assert_eq!(c.speedup[1].points, [(2., 2.5), (4., 5.0)]);
        assert_eq!(c.runtime[0].points, [(2., 5.0), (4., 2.5)]);
        assert_eq!(c.runtime[1].y_at(4.), Some(2.0));
        assert_eq!(c.metrics.len(), 4);
        assert_eq!(
            c.metrics[0],
            DerivedMetric {
                key: key(512, 2, Strategy::ForkJoin),
                representative_runtime: 5.0,
                speedup: Some(2.0)
            }
        );
        Ok(())
    }

    #[test]
    fn t_scaling_missing() -> Result<()> {
        let strategies = [Strategy::ForkJoin, Strategy::LocalDataflow];
        let e = experiment(&[512, 1024], &[2, 4], &strategies, false);
        let err = run_scaling(&e, &source()).unwrap_err();
        let load_error = err
            .chain()
            .find_map(|e| e.downcast_ref::<LoadError>())
            .expect("has load error");
        assert!(load_error.is_not_found());

        let e = experiment(&[512, 1024], &[2, 4], &strategies, true);
        let charts = run_scaling(&e, &source())?;
        // N=1024 has no baseline: skipped entirely
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].speedup[1].strategy, Strategy::LocalDataflow);
        assert!(charts[0].speedup[1].points.is_empty());
        Ok(())
    }

    #[test]
    fn t_scaling_zero_runtime_fails() {
        let mut s = source();
        s.series
            .insert(key(512, 4, Strategy::Dataflow), vec![(1., 0.0)]);
        let e = experiment(&[512], &[2, 4], &[Strategy::Dataflow], true);
        let err = run_scaling(&e, &s).unwrap_err();
        let agg = err
            .chain()
            .find_map(|e| e.downcast_ref::<AggregateError>())
            .expect("has aggregate error");
        assert_eq!(agg.innermost(), &AggregateError::ZeroRuntime);
    }

    #[test]
    fn t_scaling_metrics_match_lines() -> Result<()> {
        let mut e = experiment(&[512], &[2, 4], &[Strategy::ForkJoin, Strategy::Dataflow], false);
        e.reduction = ReductionPolicy::Median;
        let charts = run_scaling(&e, &source())?;
        let c = &charts[0];
        for (i, metric) in c.metrics.iter().enumerate() {
            let line = i / 2;
            let x = f64::from(metric.key.thread_count);
            assert_eq!(c.runtime[line].y_at(x), Some(metric.representative_runtime));
            assert_eq!(c.speedup[line].y_at(x), metric.speedup);
        }
        assert_eq!(c.runtime[0].points, [(2., 5.5), (4., 2.75)]);
        Ok(())
    }

    #[test]
    fn t_granularity() -> Result<()> {
        let config: ExperimentConfig = crate::config_file::ConfigBackend::Json5.parse_config(
            r#"{
                machine: "trillian",
                results_dir: "/r",
                series_path: "{results_dir}/{strategy}/N{size}_{threads}.dat",
                baseline_path: "{results_dir}/N{size}_serial.dat",
                sizes: [2048],
                threads: [16],
                strategies: ["omp", "dataflow", "local_dataflow"],
                granularity: {
                    size: 2048,
                    threads: 16,
                    skip_leading: { "dataflow": 1 },
                    floor_strategy: "local_dataflow",
                },
            }"#,
        )?;
        let e = config.check(None)?;
        let mut s = MemorySource::default();
        s.series.insert(
            key(2048, 16, Strategy::ForkJoin),
            vec![(8., 3.0), (16., 2.8)],
        );
        s.series.insert(
            key(2048, 16, Strategy::Dataflow),
            vec![(8., 9.0), (16., 3.2), (32., 3.4)],
        );
        s.series.insert(
            key(2048, 16, Strategy::LocalDataflow),
            vec![(8., 2.4), (16., 2.1), (32., 2.3)],
        );
        let chart = run_granularity(&e, &s)?;
        assert_eq!(chart.lines.len(), 3);
        assert_eq!(chart.lines[0].points, [(8., 3.0), (16., 2.8)]);
        assert_eq!(chart.lines[1].points, [(16., 3.2), (32., 3.4)]);
        assert_eq!(chart.lines[2].points, [(8., 2.4), (16., 2.1), (32., 2.3)]);
        assert_eq!(
            chart.floor,
            Some(Floor {
                strategy: Strategy::LocalDataflow,
                runtime: 2.1
            })
        );
        Ok(())
    }

    #[test]
    fn t_granularity_requires_section() {
        let e = experiment(&[512], &[2], &[Strategy::ForkJoin], false);
        assert!(run_granularity(&e, &source()).is_err());
    }
}
