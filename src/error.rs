use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// PipelineError – every failure the batch pipeline can report
// ---------------------------------------------------------------------------

/// Errors raised while loading inputs or deriving tables.
///
/// Per-source kinds (`MalformedInput`, `EmptyInput`, I/O and CSV failures)
/// only disqualify the file they came from. `DataIntegrity` means a table
/// violates a uniqueness invariant the rest of the pipeline relies on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{}: malformed input: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("{}: no data rows", path.display())]
    EmptyInput { path: PathBuf },

    #[error("{}: data integrity violated: {reason}", path.display())]
    DataIntegrity { path: PathBuf, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn integrity(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::DataIntegrity {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error only disqualifies the source it came from.
    ///
    /// `DataIntegrity` and configuration errors are never source-local.
    pub fn is_fatal_for_source(&self) -> bool {
        !matches!(
            self,
            PipelineError::DataIntegrity { .. } | PipelineError::Config(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Non-fatal diagnostics
// ---------------------------------------------------------------------------

/// A chart code with no entry in the country mapping; the raw code is used
/// as the row label instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnmappedCodeWarning {
    pub code: String,
}

impl fmt::Display for UnmappedCodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "country code '{}' is not in the mapping", self.code)
    }
}

/// A chart file that was left out of the cross-table, with the reason.
#[derive(Debug)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: PipelineError,
}
