use std::fs;
use std::path::Path;

use tracing::{Level, instrument};

use crate::ledger::tools::error::{BoxedCause, PipelineError, Result};
use crate::ledger::tools::events::{EventSink, TracingSink};
use crate::ledger::tools::io::scope::ResourceScope;
use crate::ledger::tools::io::stats_write::write_stats;
use crate::ledger::tools::model::Stats;
use crate::ledger::tools::validate::{RecordOutcome, Records};

/// Drives one clean-output pass followed by the stats document.
///
/// The pipeline owns no state between runs apart from its event sink, so a
/// single instance may be reused for several inputs.
#[derive(Debug, Default)]
pub struct Pipeline<S = TracingSink> {
    sink: S,
}

/// Runs the pipeline with events forwarded to `tracing`.
pub fn run_pipeline(input: &Path, clean_output: &Path, stats_output: &Path) -> Result<Stats> {
    Pipeline::new(TracingSink).run(input, clean_output, stats_output)
}

impl<S: EventSink> Pipeline<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Reads `input`, writes accepted rows to `clean_output` and, once both
    /// streams are closed, the aggregate to `stats_output`.
    ///
    /// Rejected records are reported to the sink and skipped. Every error
    /// returned from here ends the run; nothing is retried.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            input = %input.display(),
            clean_output = %clean_output.display(),
            stats_output = %stats_output.display()
        )
    )]
    pub fn run(&self, input: &Path, clean_output: &Path, stats_output: &Path) -> Result<Stats> {
        self.sink.log(
            Level::INFO,
            "starting pipeline",
            &[
                ("input", &input.display()),
                ("clean_output", &clean_output.display()),
                ("stats_output", &stats_output.display()),
            ],
        );

        if !input.exists() {
            return Err(PipelineError::InputNotFound(input.to_path_buf()));
        }

        ensure_parent_dir(clean_output)?;
        ensure_parent_dir(stats_output)?;

        let mut scope = ResourceScope::acquire(input, clean_output)
            .map_err(|error| pass_failure(input, error))?;
        let (stats, rejected) = self.clean_pass(&mut scope, input)?;
        scope.close().map_err(|error| pass_failure(input, error))?;

        write_stats(stats_output, &stats)?;

        self.sink.log(
            Level::INFO,
            "pipeline completed",
            &[
                ("rows_out", &stats.rows_out),
                ("total_qty", &stats.total_qty),
                ("gross_revenue", &stats.gross_revenue),
                ("rejected", &rejected),
            ],
        );
        Ok(stats)
    }

    /// Streams every record through validation. Returns the final totals and
    /// the number of rejected records.
    fn clean_pass(&self, scope: &mut ResourceScope, input: &Path) -> Result<(Stats, u64)> {
        let (reader, output) = scope.split();
        let records = Records::from_reader(reader)?;

        let mut stats = Stats::default();
        let mut rejected = 0_u64;

        for outcome in records {
            match outcome.map_err(|error| pass_failure(input, error))? {
                RecordOutcome::Accepted(row) => {
                    stats.accumulate(&row);
                    output
                        .write_row(&row)
                        .map_err(|error| pass_failure(input, error))?;
                    self.sink.log(
                        Level::DEBUG,
                        "row accepted",
                        &[
                            ("sku", &row.sku()),
                            ("qty", row.qty()),
                            ("unit_price", row.unit_price()),
                        ],
                    );
                }
                RecordOutcome::Rejected(failure) => {
                    rejected += 1;
                    self.sink.log(
                        Level::WARN,
                        "validation failed",
                        &[
                            ("line", &failure.line_number),
                            ("reason", &failure.message),
                        ],
                    );
                }
            }
        }

        Ok((stats, rejected))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn pass_failure(input: &Path, cause: impl Into<BoxedCause>) -> PipelineError {
    PipelineError::format_with(
        format!("file IO failed while processing {}", input.display()),
        cause,
    )
}
