use std::ops::AddAssign;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::{
    ConflictPolicy, Database, insert_artist, insert_song, insert_songplay, insert_time,
    insert_user,
};
use crate::discovery::find_files;
use crate::transform::{transform_log_file, transform_song_file};

pub const DATA_FILE_EXTENSION: &str = "json";

/// How much work one commit covers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CommitScope {
    /// Commit after every file. Files loaded before a failure stay loaded.
    #[default]
    File,
    /// Commit once at the end. A failure anywhere leaves the store untouched.
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Song,
    Log,
}

/// Rows written per table, plus the number of files whose writes were committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files: usize,
    pub songs: u64,
    pub artists: u64,
    pub time: u64,
    pub users: u64,
    pub songplays: u64,
}

impl AddAssign for LoadSummary {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.songs += other.songs;
        self.artists += other.artists;
        self.time += other.time;
        self.users += other.users;
        self.songplays += other.songplays;
    }
}

pub struct Loader<'a> {
    db: &'a Database,
    policy: ConflictPolicy,
    scope: CommitScope,
}

impl<'a> Loader<'a> {
    pub fn new(db: &'a Database, policy: ConflictPolicy, scope: CommitScope) -> Self {
        Self { db, policy, scope }
    }

    /// Load every song file under `song_root`, then every log file under
    /// `log_root`. The first failure aborts the run.
    #[instrument(skip(self))]
    pub async fn run(&self, song_root: &Path, log_root: &Path) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();

        match self.scope {
            CommitScope::File => {
                self.load_root(&self.db.conn, song_root, FileKind::Song, &mut summary)
                    .await?;
                self.load_root(&self.db.conn, log_root, FileKind::Log, &mut summary)
                    .await?;
            }
            CommitScope::Run => {
                let txn = self
                    .db
                    .conn
                    .begin()
                    .await
                    .wrap_err("Failed to begin transaction")?;

                // Per-file transactions become savepoints inside `txn`
                self.load_root(&txn, song_root, FileKind::Song, &mut summary)
                    .await?;
                self.load_root(&txn, log_root, FileKind::Log, &mut summary)
                    .await?;

                txn.commit()
                    .await
                    .wrap_err("Failed to commit transaction")?;
            }
        }

        Ok(summary)
    }

    async fn load_root<C: TransactionTrait<Transaction = DatabaseTransaction>>(
        &self,
        conn: &C,
        root: &Path,
        kind: FileKind,
        summary: &mut LoadSummary,
    ) -> Result<()> {
        let files = find_files(root, DATA_FILE_EXTENSION)?;
        let total = files.len();
        println!("{}", files_found_line(total, root));

        for (i, path) in files.iter().enumerate() {
            let txn = conn
                .begin()
                .await
                .wrap_err("Failed to begin transaction")?;

            let written = self
                .load_file(&txn, path, kind)
                .await
                .wrap_err_with(|| format!("Failed to load {}", path.display()))?;

            txn.commit()
                .await
                .wrap_err_with(|| format!("Failed to commit {}", path.display()))?;

            *summary += written;
            println!("{}", files_processed_line(i + 1, total));
        }

        Ok(())
    }

    async fn load_file(
        &self,
        txn: &DatabaseTransaction,
        path: &Path,
        kind: FileKind,
    ) -> Result<LoadSummary> {
        let mut written = LoadSummary {
            files: 1,
            ..Default::default()
        };

        match kind {
            FileKind::Song => {
                let rows = transform_song_file(path)?;
                written.songs += insert_song(txn, self.policy, rows.song)
                    .await
                    .wrap_err("Failed to insert into songs")?;
                written.artists += insert_artist(txn, self.policy, rows.artist)
                    .await
                    .wrap_err("Failed to insert into artists")?;
            }
            FileKind::Log => {
                let rows = transform_log_file(txn, path).await?;
                for row in rows.time {
                    written.time += insert_time(txn, self.policy, row)
                        .await
                        .wrap_err("Failed to insert into time")?;
                }
                for user in rows.users {
                    written.users += insert_user(txn, self.policy, user)
                        .await
                        .wrap_err("Failed to insert into users")?;
                }
                for play in rows.songplays {
                    written.songplays += insert_songplay(txn, play)
                        .await
                        .wrap_err("Failed to insert into songplays")?;
                }
            }
        }

        tracing::debug!("Loaded {}: {:?}", path.display(), written);
        Ok(written)
    }
}

fn files_found_line(total: usize, root: &Path) -> String {
    format!("{} files found in {}", total, root.display())
}

fn files_processed_line(done: usize, total: usize) -> String {
    format!("{}/{} files processed.", done, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{artists, songplays, songs, time, users};
    use crate::test_utils::{test_db, write_ndjson};
    use crate::transform::{start_time, time_row};
    use sea_orm::{EntityTrait, PaginatorTrait};
    use serde_json::json;
    use std::path::PathBuf;

    struct Fixture {
        _dir: tempfile::TempDir,
        song_root: PathBuf,
        log_root: PathBuf,
    }

    fn song(
        song_id: &str,
        title: &str,
        artist_id: &str,
        artist: &str,
        duration: f64,
    ) -> serde_json::Value {
        json!({
            "num_songs": 1,
            "artist_id": artist_id,
            "artist_latitude": null,
            "artist_longitude": null,
            "artist_location": "",
            "artist_name": artist,
            "song_id": song_id,
            "title": title,
            "duration": duration,
            "year": 0
        })
    }

    fn event(
        page: &str,
        user_id: i64,
        ts: i64,
        song: &str,
        artist: &str,
        length: f64,
    ) -> serde_json::Value {
        json!({
            "artist": artist,
            "auth": "Logged In",
            "firstName": "Jacob",
            "gender": "M",
            "itemInSession": 3,
            "lastName": "Klein",
            "length": length,
            "level": "paid",
            "location": "Tampa-St. Petersburg-Clearwater, FL",
            "method": "PUT",
            "page": page,
            "registration": 1540558108796.0,
            "sessionId": 954,
            "song": song,
            "status": 200,
            "ts": ts,
            "userAgent": "Mozilla/5.0",
            "userId": user_id.to_string()
        })
    }

    const FIRST_PLAY_TS: i64 = 1542837407796;

    /// Three song files and two log files: the first log holds five plays
    /// among three other page views, the second holds no plays at all.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let song_root = dir.path().join("song_data");
        let log_root = dir.path().join("log_data");

        write_ndjson(
            &song_root.join("A/A/A/TRAAAAW128F429D538.json"),
            &[song("SOZCTXZ12AB0182364", "Setanta matins", "AR5KOSW1187FB35FF4", "Elena", 269.58322)],
        );
        write_ndjson(
            &song_root.join("A/A/B/TRAABCL128F4286650.json"),
            &[song("SOBONKR12A58A7A7E0", "You're The One", "AR8ZCNI1187B9A069B", "Dwight Yoakam", 239.3073)],
        );
        write_ndjson(
            &song_root.join("A/B/C/TRABCEI128F424C983.json"),
            &[song("SOUPIRU12A6D4FA1E1", "Der Kleine Dompfaff", "ARJIE2Y1187B994AB7", "Line Renaud", 152.92036)],
        );

        write_ndjson(
            &log_root.join("2018/11/2018-11-21-events.json"),
            &[
                event("Home", 10, FIRST_PLAY_TS - 1000, "", "", 0.0),
                event("NextSong", 10, FIRST_PLAY_TS, "Setanta matins", "Elena", 269.58322),
                event("NextSong", 11, FIRST_PLAY_TS + 1000, "Unknown Song", "Nobody", 100.0),
                event("Logout", 11, FIRST_PLAY_TS + 1500, "", "", 0.0),
                event("NextSong", 12, FIRST_PLAY_TS + 2000, "You're The One", "Dwight Yoakam", 239.3073),
                event("NextSong", 13, FIRST_PLAY_TS + 3000, "Der Kleine Dompfaff", "Line Renaud", 152.0),
                event("Settings", 13, FIRST_PLAY_TS + 3500, "", "", 0.0),
                event("NextSong", 14, FIRST_PLAY_TS + 4000, "Setanta matins", "Elena", 269.58322),
            ],
        );
        write_ndjson(
            &log_root.join("2018/11/2018-11-22-events.json"),
            &[
                event("Home", 20, FIRST_PLAY_TS + 90_000_000, "", "", 0.0),
                event("About", 20, FIRST_PLAY_TS + 90_001_000, "", "", 0.0),
            ],
        );

        Fixture {
            _dir: dir,
            song_root,
            log_root,
        }
    }

    async fn counts(db: &Database) -> (u64, u64, u64, u64, u64) {
        (
            songs::Entity::find().count(&db.conn).await.unwrap(),
            artists::Entity::find().count(&db.conn).await.unwrap(),
            time::Entity::find().count(&db.conn).await.unwrap(),
            users::Entity::find().count(&db.conn).await.unwrap(),
            songplays::Entity::find().count(&db.conn).await.unwrap(),
        )
    }

    #[test]
    fn test_progress_lines() {
        assert_eq!(
            files_found_line(71, Path::new("data/song_data")),
            "71 files found in data/song_data"
        );
        assert_eq!(files_processed_line(3, 30), "3/30 files processed.");
    }

    #[tokio::test]
    async fn test_run_loads_every_table() {
        let db = test_db().await;
        let fixture = fixture();

        let loader = Loader::new(&db, ConflictPolicy::Error, CommitScope::File);
        let summary = loader
            .run(&fixture.song_root, &fixture.log_root)
            .await
            .unwrap();

        assert_eq!(
            summary,
            LoadSummary {
                files: 5,
                songs: 3,
                artists: 3,
                time: 5,
                users: 5,
                songplays: 5,
            }
        );
        assert_eq!(counts(&db).await, (3, 3, 5, 5, 5));
    }

    #[tokio::test]
    async fn test_run_resolves_songplays() {
        let db = test_db().await;
        let fixture = fixture();

        Loader::new(&db, ConflictPolicy::Error, CommitScope::File)
            .run(&fixture.song_root, &fixture.log_root)
            .await
            .unwrap();

        let plays = songplays::Entity::find().all(&db.conn).await.unwrap();
        let resolved: Vec<_> = plays
            .iter()
            .map(|play| (play.user_id, play.song_id.as_deref()))
            .collect();

        assert_eq!(
            resolved,
            vec![
                (10, Some("SOZCTXZ12AB0182364")),
                (11, None),
                (12, Some("SOBONKR12A58A7A7E0")),
                (13, None),
                (14, Some("SOZCTXZ12AB0182364")),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_file_keeps_earlier_commits() {
        let db = test_db().await;
        let fixture = fixture();

        // The 4th file's first time row collides with this one
        crate::database::insert_time(
            &db.conn,
            ConflictPolicy::Error,
            time_row(start_time(FIRST_PLAY_TS).unwrap()),
        )
        .await
        .unwrap();

        let result = Loader::new(&db, ConflictPolicy::Error, CommitScope::File)
            .run(&fixture.song_root, &fixture.log_root)
            .await;

        assert!(result.is_err());
        assert_eq!(counts(&db).await, (3, 3, 1, 0, 0));
    }

    #[tokio::test]
    async fn test_failed_run_scope_commits_nothing() {
        let db = test_db().await;
        let fixture = fixture();

        crate::database::insert_time(
            &db.conn,
            ConflictPolicy::Error,
            time_row(start_time(FIRST_PLAY_TS).unwrap()),
        )
        .await
        .unwrap();

        let result = Loader::new(&db, ConflictPolicy::Error, CommitScope::Run)
            .run(&fixture.song_root, &fixture.log_root)
            .await;

        assert!(result.is_err());
        assert_eq!(counts(&db).await, (0, 0, 1, 0, 0));
    }

    #[tokio::test]
    async fn test_run_scope_success() {
        let db = test_db().await;
        let fixture = fixture();

        let summary = Loader::new(&db, ConflictPolicy::Error, CommitScope::Run)
            .run(&fixture.song_root, &fixture.log_root)
            .await
            .unwrap();

        assert_eq!(summary.files, 5);
        assert_eq!(counts(&db).await, (3, 3, 5, 5, 5));
    }

    #[tokio::test]
    async fn test_rerun_with_ignore_skips_natural_keys() {
        let db = test_db().await;
        let fixture = fixture();
        let loader = Loader::new(&db, ConflictPolicy::Ignore, CommitScope::File);

        loader
            .run(&fixture.song_root, &fixture.log_root)
            .await
            .unwrap();
        let second = loader
            .run(&fixture.song_root, &fixture.log_root)
            .await
            .unwrap();

        assert_eq!(second.songs, 0);
        assert_eq!(second.users, 0);
        assert_eq!(second.songplays, 5);
        assert_eq!(counts(&db).await, (3, 3, 5, 5, 10));
    }

    #[tokio::test]
    async fn test_empty_song_file_aborts_run() {
        let db = test_db().await;
        let fixture = fixture();
        std::fs::write(fixture.song_root.join("A/A/A/TRAAAAA000000000.json"), "").unwrap();

        let result = Loader::new(&db, ConflictPolicy::Error, CommitScope::File)
            .run(&fixture.song_root, &fixture.log_root)
            .await;

        let err = result.unwrap_err();
        assert!(
            err.chain()
                .any(|cause| cause.to_string().contains("No records in file"))
        );
        assert_eq!(counts(&db).await, (0, 0, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_missing_root_aborts_run() {
        let db = test_db().await;
        let fixture = fixture();

        let result = Loader::new(&db, ConflictPolicy::Error, CommitScope::File)
            .run(&fixture.song_root, &fixture.log_root.join("missing"))
            .await;

        assert!(result.is_err());
        assert_eq!(counts(&db).await, (3, 3, 0, 0, 0));
    }
}
