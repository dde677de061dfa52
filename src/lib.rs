//! Reconciles per-country music charts with contest results: builds a
//! chart-country × result-country matrix of best chart positions and
//! correlates it with jury and public voting.

pub mod config;
pub mod correlate;
pub mod crosstab;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod stats;

pub use config::{MissingCellPolicy, PipelineConfig};
pub use error::{PipelineError, Result};
