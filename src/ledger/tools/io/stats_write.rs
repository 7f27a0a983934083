use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Number;

use crate::ledger::tools::error::{PipelineError, Result};
use crate::ledger::tools::model::Stats;

/// JSON shape of the stats document. JSON has no exact decimal type, so the
/// revenue crosses this boundary as text. The quantity total stays a JSON
/// integer of any width.
#[derive(Debug, Serialize)]
struct StatsDocument {
    rows_in: u64,
    rows_out: u64,
    total_qty: Number,
    gross_revenue: String,
}

impl TryFrom<&Stats> for StatsDocument {
    type Error = serde_json::Error;

    fn try_from(stats: &Stats) -> serde_json::Result<Self> {
        Ok(Self {
            rows_in: stats.rows_in,
            rows_out: stats.rows_out,
            total_qty: Number::from_str(&stats.total_qty.to_string())?,
            gross_revenue: stats.gross_revenue.to_string(),
        })
    }
}

/// Renders `stats` as pretty-printed JSON terminated by a newline.
pub fn render_stats(stats: &Stats) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(&StatsDocument::try_from(stats)?)?;
    json.push('\n');
    Ok(json)
}

/// Writes the stats document to `path`.
pub fn write_stats(path: &Path, stats: &Stats) -> Result<()> {
    let output_error = |source: io::Error| PipelineError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    let json = render_stats(stats).map_err(|error| output_error(io::Error::from(error)))?;
    fs::write(path, json).map_err(output_error)
}
