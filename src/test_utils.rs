use std::path::Path;
use std::sync::Arc;

use crate::database::Database;

/// Fresh in-memory database with the real migrations applied.
pub async fn test_db() -> Arc<Database> {
    Arc::new(Database::connect("sqlite::memory:").await.unwrap())
}

/// Write `lines` as a newline-delimited JSON file, creating parent directories.
pub fn write_ndjson(path: &Path, lines: &[serde_json::Value]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let body = lines
        .iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(path, body).unwrap();
}
