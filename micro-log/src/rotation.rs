//! Size-rotated log file with age and count pruning.
//!
//! The active file is `{dir}/{stem}.log`. When a write would push it past the
//! size limit it is renamed to `{stem}-{timestamp}.log` (UTC, millisecond
//! precision) and a fresh file is opened. Backups are pruned after every
//! rotation and when the writer opens. Rotated files are never compressed.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const EXTENSION: &str = "log";

/// Rotation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size in bytes at which the active file is rotated
    pub max_size: u64,
    /// Age after which a backup is deleted; `None` keeps backups forever
    pub max_age: Option<Duration>,
    /// Number of backups kept; `0` keeps all
    pub max_backups: usize,
}

/// A rotated backup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Path of the backup
    pub path: PathBuf,
    /// When the backup was rotated out
    pub rotated_at: DateTime<Utc>,
}

/// Log file writer that rotates by size and prunes old backups.
///
/// Write failures never reach the caller: the writer retries once on a freshly
/// opened file and otherwise drops the line.
#[derive(Debug)]
pub struct RotatingFileWriter {
    dir: PathBuf,
    stem: String,
    policy: RotationPolicy,
    file: Option<File>,
    size: u64,
}

impl RotatingFileWriter {
    /// Open (or create) `{dir}/{stem}.log`, appending to existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be opened.
    pub fn open(dir: impl AsRef<Path>, stem: impl Into<String>, policy: RotationPolicy) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut writer = Self {
            dir,
            stem: stem.into(),
            policy,
            file: None,
            size: 0,
        };
        writer.open_active()?;
        writer.prune()?;
        Ok(writer)
    }

    /// Path of the active file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", self.stem))
    }

    /// Bytes in the active file.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Rotation thresholds in effect.
    #[must_use]
    pub const fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    fn open_active(&mut self) -> io::Result<()> {
        let path = self.path();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    /// Close the active file, move it to a backup and start a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename or the new file fails.
    pub fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        let active = self.path();
        if active.exists() {
            let backup = self.next_backup_path(Utc::now())?;
            fs::rename(&active, backup)?;
        }

        self.open_active()?;
        self.prune()
    }

    fn backup_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.{EXTENSION}",
            self.stem,
            at.format(BACKUP_TIME_FORMAT)
        ))
    }

    /// Backup path for `at`, kept strictly newer than every existing backup
    /// so that backup order always matches rotation order.
    fn next_backup_path(&self, mut at: DateTime<Utc>) -> io::Result<PathBuf> {
        if let Some(newest) = self.backups()?.first() {
            if newest.rotated_at >= at {
                at = newest.rotated_at + ChronoDuration::milliseconds(1);
            }
        }
        let mut path = self.backup_path(at);
        while path.exists() {
            at += ChronoDuration::milliseconds(1);
            path = self.backup_path(at);
        }
        Ok(path)
    }

    fn parse_backup(&self, path: &Path) -> Option<DateTime<Utc>> {
        let name = path.file_name()?.to_str()?;
        let stamp = name
            .strip_prefix(&self.stem)?
            .strip_prefix('-')?
            .strip_suffix(EXTENSION)?
            .strip_suffix('.')?;
        NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Rotated backups, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn backups(&self) -> io::Result<Vec<Backup>> {
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(rotated_at) = self.parse_backup(&path) {
                backups.push(Backup { path, rotated_at });
            }
        }
        backups.sort_by(|a, b| b.rotated_at.cmp(&a.rotated_at));
        Ok(backups)
    }

    /// Delete backups beyond the count limit and older than the age limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read. Individual deletions
    /// that fail are skipped.
    pub fn prune(&self) -> io::Result<()> {
        let backups = self.backups()?;
        let cutoff = self
            .policy
            .max_age
            .and_then(|age| ChronoDuration::from_std(age).ok())
            .map(|age| Utc::now() - age);

        for (index, backup) in backups.iter().enumerate() {
            let over_count = self.policy.max_backups > 0 && index >= self.policy.max_backups;
            let too_old = cutoff.is_some_and(|cutoff| backup.rotated_at < cutoff);
            if over_count || too_old {
                let _ = fs::remove_file(&backup.path);
            }
        }
        Ok(())
    }

    fn write_line(&mut self, buf: &[u8]) -> io::Result<()> {
        let len = buf.len() as u64;
        if self.size > 0 && self.size.saturating_add(len) > self.policy.max_size {
            self.rotate()?;
        }
        if self.file.is_none() {
            self.open_active()?;
        }

        match self.file.as_mut() {
            Some(file) => {
                file.write_all(buf)?;
                self.size = self.size.saturating_add(len);
                Ok(())
            }
            None => Err(io::Error::other("log file not open")),
        }
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.write_line(buf).is_err() {
            // reopen and retry once, then drop the line
            self.file = None;
            let _ = self.write_line(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}
