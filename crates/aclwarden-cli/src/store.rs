//! On-disk rollback files.
//!
//! Each live enforcement run writes one JSON-lines file,
//! `rollback-<UTC timestamp>.jsonl`, holding one [`RollbackRecord`] per
//! line. Records are flushed as they arrive, so a run that dies halfway
//! still leaves a usable file. Timestamps sort lexically, which is what
//! `list` and `purge` rely on.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use aclwarden_engine::rollback::{RollbackRecord, RollbackSink};
use chrono::Utc;

use crate::error::{Error, Result};

const PREFIX: &str = "rollback-";
const SUFFIX: &str = ".jsonl";

/// A directory of rollback files.
#[derive(Debug, Clone)]
pub struct RollbackStore {
    dir: PathBuf,
}

impl RollbackStore {
    /// Use `dir`; it is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Start a new rollback file named after the current time.
    pub fn create(&self) -> Result<RollbackWriter> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io_with_path(e, &self.dir))?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f").to_string();

        // same-millisecond runs get a suffix that still sorts after the base name
        let mut attempt = 0;
        loop {
            let name = match attempt {
                0 => format!("{PREFIX}{stamp}{SUFFIX}"),
                n => format!("{PREFIX}{stamp}_{n}{SUFFIX}"),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    log::info!("Recording rollback to {}", path.display());
                    return Ok(RollbackWriter {
                        path,
                        file,
                        written: 0,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(Error::io_with_path(e, &path)),
            }
        }
    }

    /// Rollback files, newest first. A missing directory has none.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io_with_path(e, &self.dir)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io_with_path(e, &self.dir))?.path();
            let is_rollback = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(SUFFIX));
            if is_rollback && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(files)
    }

    /// Delete all but the newest `keep` files; returns what was removed.
    pub fn purge(&self, keep: usize) -> Result<Vec<PathBuf>> {
        let stale: Vec<PathBuf> = self.list()?.into_iter().skip(keep).collect();
        for path in &stale {
            std::fs::remove_file(path).map_err(|e| Error::io_with_path(e, path))?;
            log::debug!("Purged {}", path.display());
        }
        Ok(stale)
    }

    /// Read a rollback file; blank lines are ignored.
    pub fn load(path: &Path) -> Result<Vec<RollbackRecord>> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    Error::config(format!("{}:{}: {e}", path.display(), index + 1))
                })
            })
            .collect()
    }
}

/// An open rollback file.
#[derive(Debug)]
pub struct RollbackWriter {
    path: PathBuf,
    file: File,
    written: usize,
}

impl RollbackWriter {
    /// Where the records go.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl RollbackSink for RollbackWriter {
    fn record(&mut self, record: RollbackRecord) -> aclwarden_core::Result<()> {
        let line = serde_json::to_string(&record)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aclwarden_core::acl::parse_entries;

    fn record(path: &str) -> RollbackRecord {
        RollbackRecord::new(path, parse_entries(&["world:anyone:r"]).unwrap())
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RollbackStore::new(dir.path().join("rollback"));

        let mut writer = store.create().unwrap();
        writer.record(record("/a")).unwrap();
        writer.record(record("/b")).unwrap();
        assert_eq!(writer.written(), 2);

        let loaded = RollbackStore::load(writer.path()).unwrap();
        assert_eq!(loaded, vec![record("/a"), record("/b")]);
    }

    #[test]
    fn test_records_are_on_disk_before_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RollbackStore::new(dir.path());
        let mut writer = store.create().unwrap();
        writer.record(record("/a")).unwrap();

        let text = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_file_name_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let writer = RollbackStore::new(dir.path()).create().unwrap();
        let name = writer.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("rollback-"));
        assert!(name.ends_with(".jsonl"));
        // rollback-YYYYMMDDTHHMMSSmmm.jsonl
        assert_eq!(name.len(), "rollback-".len() + 18 + ".jsonl".len());
    }

    #[test]
    fn test_same_millisecond_names_do_not_collide() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RollbackStore::new(dir.path());
        let paths: Vec<PathBuf> = (0..3)
            .map(|_| store.create().unwrap().path().to_path_buf())
            .collect();
        assert_eq!(store.list().unwrap().len(), 3);
        assert_ne!(paths[0], paths[1]);
    }

    #[test]
    fn test_list_newest_first_and_ignores_others() {
        let dir = tempfile::TempDir::new().unwrap();
        touch(dir.path(), "rollback-20260101T000000000.jsonl");
        touch(dir.path(), "rollback-20260301T000000000.jsonl");
        touch(dir.path(), "rollback-20260201T000000000.jsonl");
        touch(dir.path(), "notes.txt");

        let names: Vec<String> = RollbackStore::new(dir.path())
            .list()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "rollback-20260301T000000000.jsonl",
                "rollback-20260201T000000000.jsonl",
                "rollback-20260101T000000000.jsonl",
            ]
        );
    }

    #[test]
    fn test_purge_keeps_newest() {
        let dir = tempfile::TempDir::new().unwrap();
        for month in 1..=5 {
            touch(dir.path(), &format!("rollback-20260{month}01T000000000.jsonl"));
        }
        let store = RollbackStore::new(dir.path());
        let removed = store.purge(2).unwrap();
        assert_eq!(removed.len(), 3);

        let kept = store.list().unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept[0].ends_with("rollback-20260501T000000000.jsonl"));
    }

    #[test]
    fn test_list_missing_dir() {
        let store = RollbackStore::new("/nonexistent/aclwarden/rollback");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_load_reports_bad_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rollback-x.jsonl");
        std::fs::write(&path, "{\"path\":\"/a\",\"entries\":[]}\n\nnot json\n").unwrap();
        let err = RollbackStore::load(&path).unwrap_err();
        assert!(err.to_string().contains(":3:"));
    }
}
