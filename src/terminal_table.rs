//! Printing tables either for humans (padded columns, styled title
//! row) or for other programs (tab separated, no styling).
//!
//! Fields are printed via `Display` without escaping; values must not
//! contain tabs or newlines.

use std::{fmt::Display, io::Write};

use anyhow::{bail, Result};
use yansi::{Paint, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    /// For numbers
    Right,
}

/// Streams rows, thus column widths are fixed up front. A value wider
/// than its column still gets one space of separation. The last
/// column has no width and is never padded when left aligned.
pub struct TerminalTable {
    columns: Vec<(usize, Align)>,
    titles: Vec<String>,
    /// Tab separated output without padding and ANSI codes
    pub tsv_mode: bool,
}

impl TerminalTable {
    /// `columns` must have one entry per title; the width of the last
    /// column is only used for right alignment.
    pub fn new<S: Display>(columns: &[(usize, Align)], titles: &[S], tsv_mode: bool) -> Result<Self> {
        if columns.is_empty() {
            bail!("need at least 1 column")
        }
        if columns.len() != titles.len() {
            bail!(
                "got {} column definitions for {} titles",
                columns.len(),
                titles.len()
            )
        }
        Ok(Self {
            columns: columns.to_owned(),
            titles: titles.iter().map(|t| t.to_string()).collect(),
            tsv_mode,
        })
    }

    fn write_row<V: Display>(
        &self,
        row: &[V],
        style: Option<Style>,
        out: &mut impl Write,
    ) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "row has {} values, table has {} columns",
                row.len(),
                self.columns.len()
            )
        }
        let last = row.len() - 1;
        for (i, ((width, align), val)) in self.columns.iter().zip(row).enumerate() {
            let s = val.to_string();
            if self.tsv_mode {
                if i > 0 {
                    out.write_all(b"\t")?;
                }
                out.write_all(s.as_bytes())?;
                continue;
            }

            let padding = " ".repeat(width.saturating_sub(s.len()));
            let styled = match style {
                Some(style) => s.paint(style).to_string(),
                None => s,
            };
            match align {
                Align::Left => {
                    out.write_all(styled.as_bytes())?;
                    if i < last {
                        out.write_all(padding.as_bytes())?;
                    }
                }
                Align::Right => {
                    out.write_all(padding.as_bytes())?;
                    out.write_all(styled.as_bytes())?;
                }
            }
            if i < last {
                out.write_all(b" ")?;
            }
        }
        out.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_title_row(&self, out: &mut impl Write) -> Result<()> {
        const STYLE: Style = Style::new().bold().italic();
        self.write_row(
            &self.titles,
            if self.tsv_mode { None } else { Some(STYLE) },
            out,
        )
    }

    pub fn write_data_row<V: Display>(&self, data: &[V], out: &mut impl Write) -> Result<()> {
        self.write_row(data, None, out)
    }
}
