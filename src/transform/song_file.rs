use std::path::Path;

use serde::Deserialize;
use tracing::instrument;

use super::{TransformError, read_records};
use crate::entities::{artists, songs};

/// One record of a song metadata file.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub duration: f64,
    pub artist_name: String,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongRows {
    pub song: songs::Model,
    pub artist: artists::Model,
}

impl From<SongRecord> for SongRows {
    fn from(record: SongRecord) -> Self {
        SongRows {
            song: songs::Model {
                song_id: record.song_id,
                title: record.title,
                artist_id: record.artist_id.clone(),
                duration: record.duration,
            },
            artist: artists::Model {
                artist_id: record.artist_id,
                name: record.artist_name,
                location: record.artist_location,
                latitude: record.artist_latitude,
                longitude: record.artist_longitude,
            },
        }
    }
}

/// Build the song and artist rows from a song file's first record.
///
/// Song files hold a single record; any records after the first are ignored.
#[instrument]
pub fn transform_song_file(path: &Path) -> Result<SongRows, TransformError> {
    let records: Vec<SongRecord> = read_records(path)?;
    if records.len() > 1 {
        tracing::warn!(
            "{} records in {}, only the first is loaded",
            records.len(),
            path.display()
        );
    }

    records
        .into_iter()
        .next()
        .map(SongRows::from)
        .ok_or_else(|| TransformError::EmptyFile {
            path: path.to_path_buf(),
        })
}
