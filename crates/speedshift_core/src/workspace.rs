//! Temp directory reaping.
//!
//! Intermediate and output files are written into one shared temp
//! directory. Anything older than the configured age is deleted here.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// What a reaping pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub removed: usize,
    pub bytes_freed: u64,
}

/// Delete regular files in `dir` last modified more than `max_age` ago.
///
/// Subdirectories are not descended into. A missing directory is an empty
/// pass; errors on individual files are logged and skipped.
pub fn reap_stale_files(dir: &Path, max_age: Duration) -> io::Result<ReapReport> {
    let mut report = ReapReport::default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Temp directory {} does not exist, nothing to reap", dir.display());
            return Ok(report);
        }
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Could not read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();

        let meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Could not stat {}: {}", path.display(), e);
                continue;
            }
        };

        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed stale file {}", path.display());
                report.removed += 1;
                report.bytes_freed += meta.len();
            }
            Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
        }
    }

    if report.removed > 0 {
        tracing::info!(
            "Reaped {} file(s) from {} ({:.2} MB freed)",
            report.removed,
            dir.display(),
            report.bytes_freed as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn backdate(path: &Path, by: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn missing_directory_is_a_no_op() {
        let dir = tempdir().unwrap();
        let report = reap_stale_files(&dir.path().join("absent"), Duration::ZERO).unwrap();
        assert_eq!(report, ReapReport::default());
    }

    #[test]
    fn removes_only_old_files() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.mp3");
        let fresh = dir.path().join("fresh.mp3");
        fs::write(&old, b"12345").unwrap();
        fs::write(&fresh, b"abc").unwrap();
        backdate(&old, Duration::from_secs(48 * 3600));

        let report = reap_stale_files(dir.path(), Duration::from_secs(24 * 3600)).unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.bytes_freed, 5);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn leaves_subdirectories_alone() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        let inner = sub.join("old.wav");
        fs::write(&inner, b"x").unwrap();
        backdate(&inner, Duration::from_secs(3600));

        let report = reap_stale_files(dir.path(), Duration::from_secs(60)).unwrap();
        assert_eq!(report.removed, 0);
        assert!(sub.is_dir());
        assert!(inner.exists());
    }
}
