pub mod advisory;
pub mod bucket;
pub mod catalog;
pub mod chains;
pub mod error;
pub mod images;
pub mod metadata;
pub mod pipeline;
pub mod reconcile;
pub mod settings;
pub mod store;

pub use error::{AggregatorError, AggregatorResult};
pub use pipeline::{run_reported, Aggregator, ChainReport, RunOutcome};
