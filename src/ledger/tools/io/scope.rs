use std::fs::File;
use std::io;
use std::path::Path;

use csv::{Reader, ReaderBuilder, Writer, WriterBuilder};
use tracing::debug;

use crate::ledger::tools::model::{REQUIRED_COLUMNS, Row};

/// Paired ownership of the CSV input reader and the clean-output writer for
/// one pipeline run.
///
/// The input is opened first and the output second; if the output cannot be
/// created the already opened input is dropped before the error is returned.
/// Fields drop in declaration order, so on any exit path the output is flushed
/// and closed before the input is released. Nothing but cleaned rows is ever
/// written through the scope.
pub struct ResourceScope {
    output: CleanOutput,
    input: Reader<File>,
}

impl ResourceScope {
    /// Opens both streams and writes the clean-output header.
    pub fn acquire(input_path: &Path, output_path: &Path) -> io::Result<Self> {
        let input = File::open(input_path)?;
        let output = File::create(output_path)?;

        let input = ReaderBuilder::new().flexible(true).from_reader(input);
        let output = CleanOutput::start(output)?;
        debug!(
            input = %input_path.display(),
            output = %output_path.display(),
            "resource scope acquired"
        );

        Ok(Self { output, input })
    }

    /// Borrows the reader and the writer at the same time.
    pub fn split(&mut self) -> (&mut Reader<File>, &mut CleanOutput) {
        (&mut self.input, &mut self.output)
    }

    /// Flushes the clean output and releases both streams, surfacing any
    /// flush error that a plain drop would swallow.
    pub fn close(self) -> io::Result<()> {
        let Self { output, input } = self;
        let flushed = output.finish();
        drop(input);
        debug!("resource scope closed");
        flushed
    }
}

/// Clean-output CSV writer with the fixed `sku,qty,unit_price` layout.
pub struct CleanOutput {
    writer: Writer<File>,
}

impl CleanOutput {
    fn start(file: File) -> io::Result<Self> {
        let mut writer = WriterBuilder::new().from_writer(file);
        writer.write_record(REQUIRED_COLUMNS)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Appends one normalized row.
    pub fn write_row(&mut self, row: &Row) -> csv::Result<()> {
        self.writer.write_record(row.to_record())
    }

    fn finish(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
