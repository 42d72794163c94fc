//! Domain errors. Everything here is fatal; soft problems are logged instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemuxError {
    /// A lane holds several samples but one of them has no primary barcode.
    #[error("multiple samples in lane {lane} but missing barcode for sample: {sample}")]
    MissingBarcode { sample: String, lane: u32 },

    #[error("user must specify --use-bases-mask= for demultiplexing {library} data")]
    MissingBasesMask { library: String },

    #[error("type of demultiplexing not available: {0}")]
    UnsupportedType(String),

    /// The sheet has a column line but no samples under it.
    #[error("no sample rows for run {run_id}; nothing to demultiplex")]
    NoRecords { run_id: String },

    #[error("{what} does not exist: {}", path.display())]
    MissingResource { what: String, path: PathBuf },

    #[error("malformed {what} at {}: {reason}", path.display())]
    SheetFormat {
        what: String,
        path: PathBuf,
        reason: String,
    },
}

impl DemuxError {
    pub fn missing(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingResource {
            what: what.into(),
            path: path.into(),
        }
    }
}
