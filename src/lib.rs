//! Core library for the ledger-tools command line application.
//!
//! The library cleans sales ledgers exported as CSV: every record is validated
//! on its own, accepted records are streamed to a cleaned CSV file and the run
//! is summarised in a JSON stats document. Record validation lives under
//! [`ledger::tools::validate`], file handling under [`ledger::tools::io`], the
//! domain types in [`ledger::tools::model`] and the orchestration of a run in
//! [`ledger::tools::pipeline`].

pub mod ledger;

pub use ledger::tools::{
    ErrorKind, PipelineError, Result, ValidationFailure, error, events, io, logging, model,
    pipeline, validate,
};
