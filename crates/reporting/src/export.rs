//! Delimited-text export of the channel report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use attribution_core::{ChannelReportRow, PipelineResult};
use tracing::info;

pub const REPORT_COLUMNS: [&str; 7] = ["channel_name", "date", "cost", "ihc", "ihc_revenue", "CPO", "ROAS"];

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Floats always carry a fractional part, so whole values read `10.0`.
fn float_cell(value: f64) -> String {
    quote(&format!("{value:?}"))
}

/// Write the report as CSV with every field quoted.
pub fn write_csv<W: Write>(rows: &[ChannelReportRow], mut out: W) -> std::io::Result<()> {
    let header: Vec<String> = REPORT_COLUMNS.iter().map(|c| quote(c)).collect();
    writeln!(out, "{}", header.join(","))?;

    for row in rows {
        let cells = [
            quote(&row.channel_name),
            quote(&row.date.format("%Y-%m-%d").to_string()),
            float_cell(row.cost),
            float_cell(row.ihc),
            float_cell(row.ihc_revenue),
            float_cell(row.cpo),
            float_cell(row.roas),
        ];
        writeln!(out, "{}", cells.join(","))?;
    }
    out.flush()
}

pub fn export_to_csv(rows: &[ChannelReportRow], path: impl AsRef<Path>) -> PipelineResult<()> {
    let path = path.as_ref();
    info!(path = %path.display(), rows = rows.len(), "Exporting channel report");
    let file = File::create(path)?;
    write_csv(rows, BufWriter::new(file))?;
    Ok(())
}
