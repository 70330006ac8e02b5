use std::path::{Path, PathBuf};

use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to resolve absolute path for {path}: {source}")]
    Absolute {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Recursively find every file under `root` whose extension is `extension`.
///
/// Matching follows `*.<extension>` glob rules: file names starting with a
/// dot never match, and a symlink to a regular file does. Paths are
/// absolute and sorted, so two runs over the same tree process
/// files in the same order. A missing or unreadable root is an error.
#[instrument]
pub fn find_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            path: root.to_path_buf(),
            source,
        })?;

        // Hidden files are skipped and symlinked files are kept, like a shell glob
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden
            || entry.path().extension().and_then(|e| e.to_str()) != Some(extension)
            || !entry.path().is_file()
        {
            continue;
        }

        let path =
            std::path::absolute(entry.path()).map_err(|source| DiscoveryError::Absolute {
                path: entry.path().to_path_buf(),
                source,
            })?;
        files.push(path);
    }

    files.sort();
    tracing::debug!(
        "Found {} .{} files under {}",
        files.len(),
        extension,
        root.display()
    );
    Ok(files)
}
