//! Identification of a single data point in a comparison: which
//! problem size, how many threads, which execution strategy.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The parallelization approaches the lattice benchmark is run
/// with. The string form is the directory name fragment the harness
/// uses for the results of that strategy.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum Strategy {
    /// OpenMP-style fork-join loops
    #[strum(serialize = "omp")]
    #[serde(rename = "omp")]
    ForkJoin,
    /// Task graph with global synchronization between steps
    #[strum(serialize = "dataflow")]
    #[serde(rename = "dataflow")]
    Dataflow,
    /// Dataflow with dependencies only on neighbouring chunks
    #[strum(serialize = "local_dataflow")]
    #[serde(rename = "local_dataflow")]
    LocalDataflow,
    /// Local dataflow with chunks aligned to grain boundaries
    #[strum(serialize = "local_dataflow_gb")]
    #[serde(rename = "local_dataflow_gb")]
    LocalDataflowGrainBoundary,
}

impl Strategy {
    /// The name used in file system paths, e.g. `local_dataflow`.
    pub fn dir_name(self) -> &'static str {
        self.into()
    }

    /// Legend label for charts.
    pub fn label(self) -> &'static str {
        match self {
            Strategy::ForkJoin => "OMP",
            Strategy::Dataflow => "HPX df",
            Strategy::LocalDataflow => "HPX ldf",
            Strategy::LocalDataflowGrainBoundary => "HPX ldf gb",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConfigurationKey {
    /// Lattice edge length N (the lattice is N x N)
    pub problem_size: u32,
    pub thread_count: u32,
    pub strategy: Strategy,
}

impl Display for ConfigurationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            problem_size,
            thread_count,
            strategy,
        } = self;
        write!(f, "N={problem_size} threads={thread_count} {strategy}")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use anyhow::Result;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn t_strategy_names() -> Result<()> {
        for s in Strategy::iter() {
            assert_eq!(Strategy::from_str(s.dir_name())?, s);
        }
        assert_eq!(Strategy::ForkJoin.to_string(), "omp");
        assert_eq!(Strategy::LocalDataflowGrainBoundary.label(), "HPX ldf gb");
        assert!(Strategy::from_str("openmp").is_err());
        Ok(())
    }

    #[test]
    fn t_strategy_serde() -> Result<()> {
        let v: Vec<Strategy> = serde_json::from_str(r#"["omp", "local_dataflow_gb", "dataflow"]"#)?;
        assert_eq!(
            v,
            [
                Strategy::ForkJoin,
                Strategy::LocalDataflowGrainBoundary,
                Strategy::Dataflow
            ]
        );
        assert_eq!(serde_json::to_string(&Strategy::Dataflow)?, r#""dataflow""#);
        Ok(())
    }

    #[test]
    fn t_key_display() {
        let key = ConfigurationKey {
            problem_size: 512,
            thread_count: 8,
            strategy: Strategy::LocalDataflow,
        };
        assert_eq!(key.to_string(), "N=512 threads=8 local_dataflow");
    }
}
