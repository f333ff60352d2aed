//! Aggregation of oscillator-lattice benchmark results: reduce
//! repeated-trial runtimes per (problem size, thread count, strategy)
//! to a representative runtime, derive speedups against the serial
//! run, and prepare the series for scaling and granularity charts.

pub mod ctx;
pub mod utillib;

pub mod aggregator;
pub mod config_file;
pub mod experiment;
pub mod json5_from_str;
pub mod key;
pub mod loader;
pub mod measurement;
pub mod pipeline;
pub mod reduction;
pub mod report;
pub mod terminal_table;
