//! Human-readable summaries of run statistics.
//!
//! The layout is a fixed-width markdown-style table so summaries paste
//! cleanly into pipeline reports.

use std::io::{self, Write};

use anyhow::{anyhow, Result};

use crate::classify::MappingState;
use crate::engine::RunCounts;

/// Write one count table.
pub fn write_summary<W: Write>(
    writer: &mut W,
    title: &str,
    rows: &[(String, u64)],
) -> io::Result<()> {
    writeln!(writer, "{}", "-".repeat(80))?;
    writeln!(writer, "{title}\n")?;
    writeln!(writer, "|       {:<45}|     {:<10}  |", "Category", "Count")?;
    writeln!(writer, "|:{}:|:{}:|", "-".repeat(50), "-".repeat(15))?;
    for (category, count) in rows {
        writeln!(writer, "|  {category:<50}|{count:>15}  |")?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Render one count table into a string (useful for tests and snapshots).
pub fn render_summary(title: &str, rows: &[(String, u64)]) -> Result<String> {
    let mut buffer = Vec::new();
    write_summary(&mut buffer, title, rows)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered summary is not valid UTF-8"))
}

/// Per-fragment category rows, in state priority order, zero counts
/// included.
pub fn category_rows(counts: &RunCounts) -> Vec<(String, u64)> {
    MappingState::ALL
        .iter()
        .map(|state| (state.to_string(), counts.category(*state)))
        .collect()
}

/// Observed `(forward, reverse)` state-pair rows in deterministic order.
pub fn pair_count_rows(counts: &RunCounts) -> Vec<(String, u64)> {
    counts
        .pair_counts()
        .map(|((forward, reverse), count)| {
            let label = match reverse {
                Some(reverse) => format!("({forward}, {reverse})"),
                None => format!("({forward}, None)"),
            };
            (label, *count)
        })
        .collect()
}
