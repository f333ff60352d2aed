//! Output of the chart datasets: tables for reading in the terminal
//! or as TSV, and JSON for plotting tools.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::{
    pipeline::{GranularityChart, ScalingChart, StrategyLine},
    terminal_table::{Align, TerminalTable},
};

const NUMBER_WIDTH: usize = 11;

fn format_value(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.3}"),
        None => "-".into(),
    }
}

fn write_heading(title: &str, tsv_mode: bool, out: &mut impl Write) -> Result<()> {
    if tsv_mode {
        writeln!(out, "# {title}")?;
    } else {
        writeln!(out, "\n{title}")?;
    }
    Ok(())
}

/// One row per thread count, one column per strategy.
fn write_thread_table(
    title: &str,
    thread_counts: &[u32],
    lines: &[StrategyLine],
    tsv_mode: bool,
    out: &mut impl Write,
) -> Result<()> {
    write_heading(title, tsv_mode, out)?;
    let mut titles = vec!["threads"];
    let mut columns = vec![(8, Align::Left)];
    for line in lines {
        titles.push(line.label);
        columns.push((NUMBER_WIDTH, Align::Right));
    }
    let table = TerminalTable::new(&columns, &titles, tsv_mode)?;
    table.write_title_row(out)?;
    for &thread_count in thread_counts {
        let mut row = vec![thread_count.to_string()];
        for line in lines {
            row.push(format_value(line.y_at(f64::from(thread_count))));
        }
        table.write_data_row(&row, out)?;
    }
    Ok(())
}

pub fn write_scaling(charts: &[ScalingChart], tsv_mode: bool, out: &mut impl Write) -> Result<()> {
    for chart in charts {
        let n = chart.problem_size;
        write_heading(
            &format!("System size {n}x{n}, serial runtime {:.3} s", chart.baseline_seconds),
            tsv_mode,
            out,
        )?;
        write_thread_table(
            &format!("Speedup, N={n}"),
            &chart.thread_counts,
            &chart.speedup,
            tsv_mode,
            out,
        )?;
        write_thread_table(
            &format!("Run time (s), N={n}"),
            &chart.thread_counts,
            &chart.runtime,
            tsv_mode,
            out,
        )?;
    }
    Ok(())
}

pub fn write_granularity(chart: &GranularityChart, tsv_mode: bool, out: &mut impl Write) -> Result<()> {
    let GranularityChart {
        problem_size,
        thread_count,
        lines,
        floor,
    } = chart;
    write_heading(
        &format!("System size {problem_size}, {thread_count} threads"),
        tsv_mode,
        out,
    )?;
    for line in lines {
        write_heading(line.label, tsv_mode, out)?;
        let table = TerminalTable::new(
            &[(NUMBER_WIDTH, Align::Right), (NUMBER_WIDTH, Align::Right)],
            &["granularity", "runtime (s)"],
            tsv_mode,
        )?;
        table.write_title_row(out)?;
        for (x, y) in &line.points {
            table.write_data_row(&[x.to_string(), format_value(Some(*y))], out)?;
        }
    }
    if let Some(floor) = floor {
        write_heading(
            &format!(
                "Best runtime ({}): {}",
                floor.strategy.label(),
                format_value(Some(floor.runtime))
            ),
            tsv_mode,
            out,
        )?;
    }
    Ok(())
}

/// Where to write JSON to; "-" is stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonTarget {
    Stdout,
    File(PathBuf),
}

impl From<&Path> for JsonTarget {
    fn from(path: &Path) -> Self {
        if path == Path::new("-") {
            JsonTarget::Stdout
        } else {
            JsonTarget::File(path.to_owned())
        }
    }
}

pub fn write_json<T: Serialize>(value: &T, target: &JsonTarget) -> Result<()> {
    match target {
        JsonTarget::Stdout => {
            let mut out = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        JsonTarget::File(path) => {
            let file =
                File::create(path).with_context(|| anyhow!("creating JSON output file {path:?}"))?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut out, value)
                .with_context(|| anyhow!("writing JSON to {path:?}"))?;
            writeln!(out)?;
            out.flush()
                .with_context(|| anyhow!("writing JSON to {path:?}"))?;
        }
    }
    Ok(())
}
