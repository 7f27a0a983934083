pub mod scope;
pub mod stats_write;
