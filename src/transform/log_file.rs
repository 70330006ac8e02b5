use std::path::Path;

use chrono::NaiveDateTime;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Deserializer};
use tracing::instrument;

use super::{TransformError, read_records, start_time, time_row};
use crate::database::find_song_and_artist;
use crate::entities::{time, users};

/// The page value of events that record an actual song play.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// One record of a user activity log file.
///
/// Everything except `page` is optional here: page views other than
/// NextSong routinely leave user and song fields empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub page: String,
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// User ids show up both as numbers and as numeric strings; an empty
/// string means the visitor was logged out.
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Number(i64),
        Text(String),
    }

    match Option::<RawUserId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawUserId::Number(id)) => Ok(Some(id)),
        Some(RawUserId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawUserId::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// A songplays row before it has been assigned its synthetic key.
#[derive(Debug, Clone, PartialEq)]
pub struct Songplay {
    pub start_time: NaiveDateTime,
    pub user_id: i64,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Rows derived from one log file, one entry per NextSong event in each
/// table. Nothing is deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRows {
    pub time: Vec<time::Model>,
    pub users: Vec<users::Model>,
    pub songplays: Vec<Songplay>,
}

/// A NextSong event with its required fields checked.
struct Play {
    record: usize,
    start_time: NaiveDateTime,
    user: users::Model,
    song: Option<String>,
    artist: Option<String>,
    length: Option<f64>,
    session_id: i64,
    location: Option<String>,
    user_agent: Option<String>,
}

impl Play {
    fn from_event(path: &Path, record: usize, event: LogEvent) -> Result<Self, TransformError> {
        let require = |field: &'static str| TransformError::MissingField {
            path: path.to_path_buf(),
            record,
            field,
        };

        let ts = event.ts.ok_or_else(|| require("ts"))?;
        let user_id = event.user_id.ok_or_else(|| require("userId"))?;
        let level = event.level.ok_or_else(|| require("level"))?;
        let session_id = event.session_id.ok_or_else(|| require("sessionId"))?;

        Ok(Play {
            record,
            start_time: start_time(ts)?,
            user: users::Model {
                user_id,
                first_name: event.first_name,
                last_name: event.last_name,
                gender: event.gender,
                level,
            },
            song: event.song,
            artist: event.artist,
            length: event.length,
            session_id,
            location: event.location,
            user_agent: event.user_agent,
        })
    }
}

/// Keep the NextSong events of a file, in file order.
fn next_song_plays(path: &Path, events: Vec<LogEvent>) -> Result<Vec<Play>, TransformError> {
    events
        .into_iter()
        .enumerate()
        .filter(|(_, event)| event.page == NEXT_SONG_PAGE)
        .map(|(index, event)| Play::from_event(path, index + 1, event))
        .collect()
}

/// Build the time, users and songplays rows of one log file.
///
/// Each play's song and artist ids are looked up through `conn` by title,
/// artist name and duration; plays with no match keep null ids.
#[instrument(skip(conn))]
pub async fn transform_log_file(
    conn: &impl ConnectionTrait,
    path: &Path,
) -> Result<LogRows, TransformError> {
    let events: Vec<LogEvent> = read_records(path)?;
    let total = events.len();
    let plays = next_song_plays(path, events)?;
    tracing::debug!(
        "{} of {} events in {} are song plays",
        plays.len(),
        total,
        path.display()
    );

    let mut rows = LogRows {
        time: plays.iter().map(|play| time_row(play.start_time)).collect(),
        users: plays.iter().map(|play| play.user.clone()).collect(),
        songplays: Vec::with_capacity(plays.len()),
    };

    for play in plays {
        let ids = match (&play.song, &play.artist, play.length) {
            (Some(song), Some(artist), Some(length)) => {
                find_song_and_artist(conn, song, artist, length)
                    .await
                    .map_err(|source| TransformError::Lookup {
                        path: path.to_path_buf(),
                        record: play.record,
                        source,
                    })?
            }
            _ => None,
        };
        let (song_id, artist_id) = ids.unzip();

        rows.songplays.push(Songplay {
            start_time: play.start_time,
            user_id: play.user.user_id,
            level: play.user.level,
            song_id,
            artist_id,
            session_id: play.session_id,
            location: play.location,
            user_agent: play.user_agent,
        });
    }

    Ok(rows)
}
