//! Turns one parsed data file into the rows each destination table needs.
//!
//! Files are newline-delimited JSON: one object per line, read as a stream
//! of values so blank lines and trailing whitespace are tolerated.

mod calendar;
mod log_file;
mod song_file;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

pub use calendar::{start_time, time_row};
pub use log_file::{Songplay, transform_log_file};
pub use song_file::transform_song_file;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path} at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("No records in file: {path}")]
    EmptyFile { path: PathBuf },

    #[error("Record {record} in {path} is missing required field `{field}`")]
    MissingField {
        path: PathBuf,
        record: usize,
        field: &'static str,
    },

    #[error("Timestamp {ts} is out of range")]
    InvalidTimestamp { ts: i64 },

    #[error("Song lookup failed for record {record} in {path}: {source}")]
    Lookup {
        path: PathBuf,
        record: usize,
        #[source]
        source: sea_orm::DbErr,
    },
}

/// Read every JSON record in a newline-delimited file.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TransformError> {
    let contents = std::fs::read_to_string(path).map_err(|source| TransformError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::Deserializer::from_str(&contents)
        .into_iter::<T>()
        .map(|record| {
            record.map_err(|source| TransformError::Parse {
                path: path.to_path_buf(),
                line: source.line(),
                source,
            })
        })
        .collect()
}
