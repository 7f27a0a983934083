pub mod error;
pub mod events;
pub mod io;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod validate;

pub use error::{ErrorKind, PipelineError, Result, ValidationFailure};
