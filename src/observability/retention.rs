//! Age-based cleanup of rotated log files.
//!
//! Size rollover and backup count belong to the rotating sink. Files the
//! sink rotated away are only removed here once they exceed the maximum age.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Delete rotated siblings of `active` in `directory` older than `max_age`.
///
/// A sibling is any regular file whose name starts with the active file's
/// stem followed by a dot. The active file itself is never touched.
/// Returns the number of files removed.
pub fn prune_expired(directory: &Path, active: &str, max_age: Duration) -> io::Result<usize> {
    let stem = Path::new(active)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(active);
    let prefix = format!("{stem}.");
    let now = SystemTime::now();

    let mut removed = 0;
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name == active || !name.starts_with(&prefix) {
            continue;
        }

        // The rotating sink may rename a backup between listing and removal.
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }

        let age = now
            .duration_since(metadata.modified()?)
            .unwrap_or_default();
        if age > max_age {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("retention-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str, age: Duration) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_prunes_only_expired_backups() {
        let dir = scratch_dir();
        let day = Duration::from_secs(86_400);

        touch(&dir, "web_app.log", day * 90);
        touch(&dir, "web_app.log.1", day * 40);
        touch(&dir, "web_app.log.2", day * 2);
        touch(&dir, "other.log.1", day * 90);

        let removed = prune_expired(&dir, "web_app.log", day * 30).unwrap();
        assert_eq!(removed, 1);

        assert!(dir.join("web_app.log").exists());
        assert!(!dir.join("web_app.log.1").exists());
        assert!(dir.join("web_app.log.2").exists());
        assert!(dir.join("other.log.1").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join(format!("retention-{}", uuid::Uuid::new_v4()));
        assert!(prune_expired(&dir, "web_app.log", Duration::from_secs(1)).is_err());
    }
}
