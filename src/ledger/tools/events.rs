use std::fmt;

use tracing::Level;

/// A single named value attached to a log event.
pub type Field<'a> = (&'static str, &'a dyn fmt::Display);

/// Destination for lifecycle events emitted by the pipeline.
///
/// The pipeline receives a sink at construction time and never inspects what
/// the sink does with an event, so logging cannot influence control flow.
pub trait EventSink {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        (**self).log(level, message, fields);
    }
}

/// Forwards events to the globally installed `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        let fields = FieldList(fields);
        match level {
            Level::ERROR => tracing::error!(target: "ledger_tools::pipeline", %fields, "{message}"),
            Level::WARN => tracing::warn!(target: "ledger_tools::pipeline", %fields, "{message}"),
            Level::INFO => tracing::info!(target: "ledger_tools::pipeline", %fields, "{message}"),
            Level::DEBUG => tracing::debug!(target: "ledger_tools::pipeline", %fields, "{message}"),
            _ => tracing::trace!(target: "ledger_tools::pipeline", %fields, "{message}"),
        }
    }
}

/// Renders fields as `key=value` pairs separated by spaces.
struct FieldList<'f, 'a>(&'f [Field<'a>]);

impl fmt::Display for FieldList<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
