//! Disk-backed FIFO queue for batches that failed delivery.
//!
//! One file per entry. Names start with a fixed-width UTC timestamp
//! (`yyyyMMddHHmmssffff`, ffff = ten-thousandths of a second) followed by a
//! random token, so lexicographic order over names is chronological order
//! and same-instant enqueues cannot collide. Entries become visible to
//! `pending()` only after a rename, never half-written.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use uuid::Uuid;

const LOCK_FILE: &str = "agent.lock";

pub struct OfflineQueue {
    dir: PathBuf,
    // Held for the queue's lifetime; released on drop. A second agent
    // pointed at the same path must not interleave deletes with ours.
    _lock: File,
}

impl OfflineQueue {
    /// Opens (creating if needed) the queue directory and takes an exclusive
    /// advisory lock on it. Fails if another instance already holds the lock.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating queue directory {}", dir.display()))?;
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(dir.join(LOCK_FILE))
            .context("opening queue lock file")?;
        lock.try_lock_exclusive().with_context(|| {
            format!(
                "queue {} is locked by another agent instance",
                dir.display()
            )
        })?;
        Ok(Self { dir, _lock: lock })
    }

    /// Stores one serialized batch. Written to a temp sibling first and
    /// renamed into place so readers never observe a partial entry.
    pub fn enqueue(&self, payload: &str) -> Result<PathBuf> {
        let now = Utc::now();
        let name = format!(
            "{}{:04}_{}.json",
            now.format("%Y%m%d%H%M%S"),
            now.timestamp_subsec_micros() / 100,
            Uuid::new_v4().simple()
        );
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, payload)
            .with_context(|| format!("writing queue entry {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("publishing queue entry {}", path.display()))?;
        Ok(path)
    }

    /// Current entries, oldest first. Reflects the directory at call time.
    pub fn pending(&self) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("listing queue directory {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                entries.push(path);
            }
        }
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(entries)
    }

    pub fn read(&self, entry: &Path) -> Result<String> {
        fs::read_to_string(entry)
            .with_context(|| format!("reading queue entry {}", entry.display()))
    }

    /// Removing an already-absent entry is not an error.
    pub fn remove(&self, entry: &Path) -> Result<()> {
        match fs::remove_file(entry) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("removing queue entry {}", entry.display()))
            }
        }
    }
}
