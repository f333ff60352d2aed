use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lattice_perf::aggregator::{compute_grand_minimum_line, derive_metric};
use lattice_perf::experiment::load_experiment;
use lattice_perf::key::{ConfigurationKey, Strategy};
use lattice_perf::loader::{BaselineConvention, MeasurementLoader};
use lattice_perf::pipeline::{run_granularity, run_scaling, FileSource};
use lattice_perf::reduction::ReductionPolicy;
use lattice_perf::report::{write_granularity, write_json, write_scaling, JsonTarget};
use lattice_perf::terminal_table::{Align, TerminalTable};
use lattice_perf::utillib::get_terminal_width::get_terminal_width;
use lattice_perf::utillib::logging::{set_log_level, LogLevelOpt};
use lattice_perf::{ctx, info};

const PROGRAM_NAME: &str = "lattice-perf";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(clap::Parser, Debug)]
#[clap(next_line_help = true)]
#[clap(set_term_width = get_terminal_width(4))]
/// Evaluate oscillator lattice benchmark results: speedups over
/// thread counts, and runtimes over task granularity.
struct Opts {
    #[clap(flatten)]
    log_level: LogLevelOpt,

    /// The subcommand to run. Use `--help` after the sub-command to
    /// get a list of the allowed options there.
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct OutputOpts {
    /// Path to the experiment config file (.json5, .yaml or .hcl).
    /// Default: `lattice-perf.$ext` in the current directory.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Print tables tab separated, without padding or styling
    #[clap(long)]
    tsv: bool,

    /// Write the chart data as JSON to this path instead of printing
    /// tables ("-" for stdout)
    #[clap(long)]
    json: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print version
    Version,

    /// Speedup (against the serial run) and representative runtime
    /// over thread counts, for every problem size and strategy of the
    /// experiment.
    Scaling {
        #[clap(flatten)]
        output_opts: OutputOpts,
    },

    /// Runtime over granularity at the experiment's fixed problem size
    /// and thread count, one series per strategy.
    Granularity {
        #[clap(flatten)]
        output_opts: OutputOpts,
    },

    /// Show the contents of a single measurement file and its reduced
    /// value.
    Inspect {
        /// Read the file as a serial baseline instead of a sweep
        #[clap(long)]
        baseline: bool,

        /// Column of the baseline value (0-based)
        #[clap(long, default_value = "1")]
        column: usize,

        /// How to reduce a sweep: min|median|mean
        #[clap(long, default_value = "min")]
        reduction: ReductionPolicy,

        /// The measurement file
        path: PathBuf,
    },
}

fn inspect(baseline: bool, column: usize, reduction: ReductionPolicy, path: PathBuf) -> Result<()> {
    let loader = MeasurementLoader::new(BaselineConvention { column });
    if baseline {
        let baseline = loader.load_baseline(&path)?;
        println!("serial runtime: {} s", baseline.value());
        return Ok(());
    }

    let series = loader.load_series(&path)?;
    let table = TerminalTable::new(
        &[(12, Align::Right), (12, Align::Right)],
        &["x", "runtime (s)"],
        false,
    )?;
    let mut out = std::io::stdout().lock();
    table.write_title_row(&mut out)?;
    for (x, r) in series.points() {
        table.write_data_row(&[x.to_string(), r.to_string()], &mut out)?;
    }
    // The key is only used for error messages here.
    let key = ConfigurationKey {
        problem_size: 0,
        thread_count: 0,
        strategy: Strategy::ForkJoin,
    };
    let metric = derive_metric(key, &series, None, reduction)
        .map_err(ctx!("reducing {path:?}"))?;
    println!(
        "{} points, {reduction}: {} s, best: {} s",
        series.len(),
        metric.representative_runtime,
        compute_grand_minimum_line(&series)?
    );
    Ok(())
}

fn main() -> Result<()> {
    let Opts { log_level, command } = Opts::parse();
    set_log_level(log_level.into());

    match command {
        Command::Version => println!("{PROGRAM_NAME} version {VERSION}"),
        Command::Scaling { output_opts } => {
            let OutputOpts { config, tsv, json } = output_opts;
            let experiment = load_experiment(config.as_deref())?;
            info!("results directory {:?}", experiment.results_dir);
            let charts = run_scaling(&experiment, &FileSource::new(&experiment))?;
            if let Some(json) = json {
                write_json(&charts, &JsonTarget::from(json.as_path()))?;
            } else {
                write_scaling(&charts, tsv, &mut std::io::stdout().lock())?;
            }
        }
        Command::Granularity { output_opts } => {
            let OutputOpts { config, tsv, json } = output_opts;
            let experiment = load_experiment(config.as_deref())?;
            let chart = run_granularity(&experiment, &FileSource::new(&experiment))?;
            if let Some(json) = json {
                write_json(&chart, &JsonTarget::from(json.as_path()))?;
            } else {
                write_granularity(&chart, tsv, &mut std::io::stdout().lock())?;
            }
        }
        Command::Inspect {
            baseline,
            column,
            reduction,
            path,
        } => inspect(baseline, column, reduction, path)?,
    }

    Ok(())
}
