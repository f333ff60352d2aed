//! Description of one benchmark campaign: where the harness wrote its
//! result files, and which problem sizes, thread counts and
//! strategies to compare.

use std::{
    collections::BTreeMap,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    config_file::LoadConfigFile,
    key::{ConfigurationKey, Strategy},
    loader::BaselineConvention,
    reduction::ReductionPolicy,
};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{name}}} in path template {template:?}")]
    UnknownPlaceholder { name: String, template: String },
    #[error("unterminated placeholder in path template {template:?}")]
    Unterminated { template: String },
    #[error("placeholder {{{name}}} is not available in the {what} path template")]
    NotAvailable { name: &'static str, what: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    ResultsDir,
    Machine,
    Strategy,
    Size,
    Threads,
}

impl Placeholder {
    fn name(self) -> &'static str {
        match self {
            Placeholder::ResultsDir => "results_dir",
            Placeholder::Machine => "machine",
            Placeholder::Strategy => "strategy",
            Placeholder::Size => "size",
            Placeholder::Threads => "threads",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        use Placeholder::*;
        [ResultsDir, Machine, Strategy, Size, Threads]
            .into_iter()
            .find(|p| p.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A file path with `{name}` placeholders, e.g.
/// `{results_dir}/perf_{machine}_{strategy}/perf_{machine}_N{size}_{threads}.dat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathTemplate {
    template: String,
    segments: Vec<Segment>,
}

impl FromStr for PathTemplate {
    type Err = TemplateError;

    fn from_str(template: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_owned()));
            }
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| TemplateError::Unterminated {
                template: template.to_owned(),
            })?;
            let name = &after[..end];
            let placeholder =
                Placeholder::from_name(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                    name: name.to_owned(),
                    template: template.to_owned(),
                })?;
            segments.push(Segment::Placeholder(placeholder));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned()));
        }
        Ok(Self {
            template: template.to_owned(),
            segments,
        })
    }
}

impl TryFrom<String> for PathTemplate {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PathTemplate> for String {
    fn from(value: PathTemplate) -> Self {
        value.template
    }
}

impl Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

/// Values to fill into a `PathTemplate`; `None` means the placeholder
/// is not meaningful for that kind of file.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'t> {
    pub what: &'static str,
    pub results_dir: &'t Path,
    pub machine: &'t str,
    pub strategy: Option<Strategy>,
    pub size: Option<u32>,
    pub threads: Option<u32>,
}

impl PathTemplate {
    pub fn expand(&self, vars: &TemplateVars) -> Result<PathBuf, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Placeholder(p) => {
                    let missing = || TemplateError::NotAvailable {
                        name: p.name(),
                        what: vars.what,
                    };
                    let value = match p {
                        Placeholder::ResultsDir => vars.results_dir.to_string_lossy().into_owned(),
                        Placeholder::Machine => vars.machine.to_owned(),
                        Placeholder::Strategy => vars.strategy.ok_or_else(missing)?.to_string(),
                        Placeholder::Size => vars.size.ok_or_else(missing)?.to_string(),
                        Placeholder::Threads => vars.threads.ok_or_else(missing)?.to_string(),
                    };
                    out.push_str(&value);
                }
            }
        }
        Ok(out.into())
    }
}

/// The single configuration looked at for granularity sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GranularityConfig {
    pub size: u32,
    pub threads: u32,
    /// Defaults to the experiment's strategies
    #[serde(default)]
    pub strategies: Option<Vec<Strategy>>,
    /// Strategy name to number of leading points to leave out
    /// (e.g. a warm-up point).
    #[serde(default)]
    pub skip_leading: BTreeMap<String, usize>,
    /// Whose best runtime to draw as the reference floor
    #[serde(default)]
    pub floor_strategy: Option<Strategy>,
}

/// The config file contents, as written by the user. Use `check()`
/// to get an `Experiment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    pub machine: String,
    pub results_dir: PathBuf,
    pub series_path: PathTemplate,
    pub baseline_path: PathTemplate,
    pub sizes: Vec<u32>,
    pub threads: Vec<u32>,
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub baseline: BaselineConvention,
    #[serde(default)]
    pub reduction: ReductionPolicy,
    #[serde(default)]
    pub granularity: Option<GranularityConfig>,
    /// Skip configurations whose files do not exist instead of
    /// failing.
    #[serde(default)]
    pub skip_missing: bool,
}

impl LoadConfigFile for ExperimentConfig {
    fn default_config_path_without_suffix() -> Result<Option<PathBuf>> {
        Ok(Some("lattice-perf".into()))
    }
}

#[derive(Debug, Clone)]
pub struct CheckedGranularity {
    pub size: u32,
    pub threads: u32,
    pub strategies: Vec<Strategy>,
    pub skip_leading: BTreeMap<Strategy, usize>,
    pub floor_strategy: Option<Strategy>,
}

impl CheckedGranularity {
    pub fn skip_leading_for(&self, strategy: Strategy) -> usize {
        self.skip_leading.get(&strategy).copied().unwrap_or(0)
    }
}

/// A validated `ExperimentConfig`, `results_dir` resolved.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub machine: String,
    pub results_dir: PathBuf,
    pub series_path: PathTemplate,
    pub baseline_path: PathTemplate,
    pub sizes: Vec<u32>,
    pub threads: Vec<u32>,
    pub strategies: Vec<Strategy>,
    pub baseline: BaselineConvention,
    pub reduction: ReductionPolicy,
    pub granularity: Option<CheckedGranularity>,
    pub skip_missing: bool,
}

fn check_nonempty<T>(field: &str, v: &[T]) -> Result<()> {
    if v.is_empty() {
        bail!("config field `{field}` must not be empty")
    }
    Ok(())
}

impl ExperimentConfig {
    /// Validate, and resolve a relative `results_dir` against
    /// `base_dir` (the directory of the config file).
    pub fn check(self, base_dir: Option<&Path>) -> Result<Experiment> {
        let Self {
            machine,
            results_dir,
            series_path,
            baseline_path,
            sizes,
            threads,
            strategies,
            baseline,
            reduction,
            granularity,
            skip_missing,
        } = self;

        check_nonempty("sizes", &sizes)?;
        check_nonempty("threads", &threads)?;
        check_nonempty("strategies", &strategies)?;
        if threads.contains(&0) {
            bail!("config field `threads` must not contain 0")
        }

        let results_dir = match base_dir {
            Some(base_dir) if results_dir.is_relative() => base_dir.join(results_dir),
            _ => results_dir,
        };

        let granularity = granularity
            .map(|g| -> Result<CheckedGranularity> {
                let GranularityConfig {
                    size,
                    threads,
                    strategies: g_strategies,
                    skip_leading,
                    floor_strategy,
                } = g;
                let strategies = g_strategies.unwrap_or_else(|| strategies.clone());
                check_nonempty("granularity.strategies", &strategies)?;
                let skip_leading = skip_leading
                    .into_iter()
                    .map(|(name, n)| {
                        let strategy = Strategy::from_str(&name).map_err(|_| {
                            anyhow!("unknown strategy {name:?} in `granularity.skip_leading`")
                        })?;
                        Ok((strategy, n))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                if let Some(floor) = floor_strategy {
                    if !strategies.contains(&floor) {
                        bail!(
                            "`granularity.floor_strategy` {floor} is not one of the \
                             granularity strategies {strategies:?}"
                        )
                    }
                }
                Ok(CheckedGranularity {
                    size,
                    threads,
                    strategies,
                    skip_leading,
                    floor_strategy,
                })
            })
            .transpose()?;

        let experiment = Experiment {
            machine,
            results_dir,
            series_path,
            baseline_path,
            sizes,
            threads,
            strategies,
            baseline,
            reduction,
            granularity,
            skip_missing,
        };

        // Catch placeholders that can't be filled before touching
        // any files.
        let key = ConfigurationKey {
            problem_size: experiment.sizes[0],
            thread_count: experiment.threads[0],
            strategy: experiment.strategies[0],
        };
        experiment
            .series_file(key)
            .context("checking `series_path`")?;
        experiment
            .baseline_file(key.problem_size)
            .context("checking `baseline_path`")?;

        Ok(experiment)
    }
}

impl Experiment {
    pub fn series_file(&self, key: ConfigurationKey) -> Result<PathBuf, TemplateError> {
        self.series_path.expand(&TemplateVars {
            what: "series",
            results_dir: &self.results_dir,
            machine: &self.machine,
            strategy: Some(key.strategy),
            size: Some(key.problem_size),
            threads: Some(key.thread_count),
        })
    }

    /// The serial run does not belong to a strategy or thread count.
    pub fn baseline_file(&self, problem_size: u32) -> Result<PathBuf, TemplateError> {
        self.baseline_path.expand(&TemplateVars {
            what: "baseline",
            results_dir: &self.results_dir,
            machine: &self.machine,
            strategy: None,
            size: Some(problem_size),
            threads: None,
        })
    }
}

/// Load the config from `path`, or from `./lattice-perf.{json5,yaml,..}`.
pub fn load_experiment(path: Option<&Path>) -> Result<Experiment> {
    let config = ExperimentConfig::load_config(path, |msg| {
        bail!("no config file given, and no default config file found ({msg})")
    })?;
    let base_dir = path.and_then(Path::parent);
    config.check(base_dir)
}
