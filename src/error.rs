use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that terminate a run.
#[derive(Debug, Error)]
pub enum RekeyError {
    #[error("cannot walk {path}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("cannot read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The record was selected in structured mode but holds no `event_id` field.
    #[error("can't match event id for {identifier} in {record}")]
    EventIdFieldMissing { identifier: String, record: String },
    #[error("abort, don't want to overwrite {path}")]
    DestinationNotEmpty { path: PathBuf },
    #[error("cannot create {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RekeyError>;
