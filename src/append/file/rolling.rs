// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;
use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::num::NonZeroU64;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use jiff::SignedDuration;
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::Error;
use crate::ErrorKind;
use crate::append::file::clock::Clock;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// One megabyte, as used for file size limits.
pub const MEGABYTE: u64 = 1024 * 1024;

/// The maximum size of a log file when none is configured.
pub const DEFAULT_MAX_SIZE: u64 = 100 * MEGABYTE;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S.%3f";
const BACKUP_TIME_PATTERN: &str = "%Y-%m-%dT%H-%M-%S.%f";
const COMPRESS_SUFFIX: &str = ".gz";

/// A writer for size-rotated files.
///
/// The active file is opened lazily on the first write.
#[derive(Debug)]
pub struct RollingFileWriter {
    state: State,
    writer: Option<fs::File>,
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            let err = Error::new(ErrorKind::Io, "failed to flush file writer on dropped")
                .with_source(err);
            self.state.trap.trap(&err);
        }
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;
        let max_size = self.state.max_size.get();
        if len > max_size {
            return Err(io::Error::other(format!(
                "write length {len} exceeds maximum file size {max_size}"
            )));
        }

        let mut writer = match self.writer.take() {
            None => self.state.open_existing_or_new(len)?,
            Some(writer) if self.state.current_filesize + len > max_size => {
                // close the active file before it is renamed
                drop(writer);
                self.state.rotate()?
            }
            Some(writer) => writer,
        };

        let result = writer
            .write(buf)
            .inspect(|&n| self.state.current_filesize += n as u64);
        self.writer = Some(writer);
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub struct RollingFileWriterBuilder {
    // required
    basedir: PathBuf,
    filename: String,

    // has default
    max_size: NonZeroU64,
    max_backups: Option<NonZeroUsize>,
    max_age: Option<SignedDuration>,
    local_time: bool,
    compress: bool,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`].
    #[must_use]
    pub fn new(basedir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            basedir: basedir.into(),
            filename: filename.into(),
            max_size: NonZeroU64::new(DEFAULT_MAX_SIZE).unwrap_or(NonZeroU64::MAX),
            max_backups: None,
            max_age: None,
            local_time: false,
            compress: false,
            clock: Clock::DefaultClock,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for the rolling file writer.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Set the maximum size of a log file in bytes.
    ///
    /// Default to [`DEFAULT_MAX_SIZE`].
    #[must_use]
    pub fn max_file_size(mut self, n: NonZeroU64) -> Self {
        self.max_size = n;
        self
    }

    /// Set the maximum number of backups to keep.
    ///
    /// All backups are kept if not set.
    #[must_use]
    pub fn max_backups(mut self, n: NonZeroUsize) -> Self {
        self.max_backups = Some(n);
        self
    }

    /// Set the maximum age of backups, judged by the time in their names.
    ///
    /// Backups are never removed for their age if not set.
    #[must_use]
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(SignedDuration::try_from(age).unwrap_or(SignedDuration::MAX));
        self
    }

    /// Name backups in local time instead of UTC.
    #[must_use]
    pub fn local_time(mut self, yes: bool) -> Self {
        self.local_time = yes;
        self
    }

    /// Gzip backups after rotation.
    #[must_use]
    pub fn compress(mut self, yes: bool) -> Self {
        self.compress = yes;
        self
    }

    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the [`RollingFileWriter`].
    ///
    /// No file is touched until the first write.
    pub fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            basedir,
            filename,
            max_size,
            max_backups,
            max_age,
            local_time,
            compress,
            clock,
            trap,
        } = self;

        if filename.is_empty() {
            return Err(Error::new(ErrorKind::Config, "filename must not be empty"));
        }

        let timezone = if local_time {
            TimeZone::system()
        } else {
            TimeZone::UTC
        };

        let state = State {
            log_dir: basedir,
            filename,
            timezone,
            current_filesize: 0,
            max_size,
            max_backups,
            max_age,
            compress,
            clock,
            trap,
        };

        Ok(RollingFileWriter {
            state,
            writer: None,
        })
    }
}

/// Create the directory and all its parents, permissive before the umask.
pub(crate) fn create_dir_all(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }
    builder.create(dir)
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }
    opts.open(path)
}

// "svc.log" => ("svc", ".log")
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) => filename.split_at(pos),
        None => (filename, ""),
    }
}

#[derive(Debug)]
struct Backup {
    path: PathBuf,
    // file name without the compress suffix
    name: String,
    timestamp: Timestamp,
    compressed: bool,
}

#[derive(Debug)]
struct State {
    log_dir: PathBuf,
    filename: String,
    timezone: TimeZone,
    current_filesize: u64,
    max_size: NonZeroU64,
    max_backups: Option<NonZeroUsize>,
    max_age: Option<SignedDuration>,
    compress: bool,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl State {
    fn current_path(&self) -> PathBuf {
        self.log_dir.join(&self.filename)
    }

    fn backup_path(&self, now: Timestamp) -> PathBuf {
        let (stem, ext) = split_extension(&self.filename);
        let zoned = now.to_zoned(self.timezone.clone());
        let timestamp = zoned.strftime(BACKUP_TIME_FORMAT);
        self.log_dir.join(format!("{stem}-{timestamp}{ext}"))
    }

    fn parse_backup_time(&self, filename: &str, prefix: &str, ext: &str) -> Option<Timestamp> {
        let timestamp = filename.strip_prefix(prefix)?.strip_suffix(ext)?;
        let datetime = DateTime::strptime(BACKUP_TIME_PATTERN, timestamp).ok()?;
        let zoned = datetime.to_zoned(self.timezone.clone()).ok()?;
        Some(zoned.timestamp())
    }

    fn open_existing_or_new(&mut self, write_len: u64) -> io::Result<fs::File> {
        let file = self.open_current(write_len)?;
        // the directory exists only once a file is open
        self.mill();
        Ok(file)
    }

    fn open_current(&mut self, write_len: u64) -> io::Result<fs::File> {
        let path = self.current_path();
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return self.open_new(),
            Err(err) => return Err(err),
        };

        if metadata.len() + write_len >= self.max_size.get() {
            return self.open_new();
        }

        match OpenOptions::new().append(true).open(&path) {
            Ok(file) => {
                self.current_filesize = metadata.len();
                Ok(file)
            }
            // cannot reuse the existing file; move it aside and start over
            Err(_) => self.open_new(),
        }
    }

    fn open_new(&mut self) -> io::Result<fs::File> {
        create_dir_all(&self.log_dir)?;

        let path = self.current_path();
        if fs::exists(&path)? {
            let backup = self.backup_path(self.clock.now());
            fs::rename(&path, &backup)?;
        }

        let file = open_log_file(&path)?;
        self.current_filesize = 0;
        Ok(file)
    }

    fn rotate(&mut self) -> io::Result<fs::File> {
        let file = self.open_new()?;
        self.mill();
        Ok(file)
    }

    fn mill(&self) {
        if let Err(err) = self.clean_up() {
            self.trap.trap(&err);
        }
    }

    fn clean_up(&self) -> Result<(), Error> {
        if self.max_backups.is_none() && self.max_age.is_none() && !self.compress {
            return Ok(());
        }

        let mut backups = self.list_backups()?;
        let mut remove = vec![];

        if let Some(max_backups) = self.max_backups {
            // a backup and its compressed copy count once
            let mut preserved = HashSet::new();
            backups.retain(|backup| {
                preserved.insert(backup.name.clone());
                if preserved.len() > max_backups.get() {
                    remove.push(backup.path.clone());
                    false
                } else {
                    true
                }
            });
        }

        if let Some(max_age) = self.max_age {
            if let Ok(cutoff) = self.clock.now().checked_sub(max_age) {
                backups.retain(|backup| {
                    if backup.timestamp < cutoff {
                        remove.push(backup.path.clone());
                        false
                    } else {
                        true
                    }
                });
            }
        }

        let mut failures: Vec<anyhow::Error> = vec![];
        for path in remove {
            if let Err(err) = fs::remove_file(&path) {
                let err = anyhow::Error::new(err)
                    .context(format!("failed to remove {}", path.display()));
                failures.push(err);
            }
        }

        if self.compress {
            for backup in backups.iter().filter(|backup| !backup.compressed) {
                if let Err(err) = compress_file(&backup.path) {
                    let err = anyhow::Error::new(err)
                        .context(format!("failed to compress {}", backup.path.display()));
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            return Ok(());
        }

        let mut err = Error::new(ErrorKind::Io, "failed to clean up log backups")
            .with_context("dir", self.log_dir.display());
        for failure in failures {
            err = err.with_source(failure);
        }
        Err(err)
    }

    // newest first
    fn list_backups(&self) -> Result<Vec<Backup>, Error> {
        let read_dir = fs::read_dir(&self.log_dir).map_err(|err| {
            Error::new(ErrorKind::Io, "failed to read log dir")
                .with_context("dir", self.log_dir.display())
                .with_source(err)
        })?;

        let (stem, ext) = split_extension(&self.filename);
        let prefix = format!("{stem}-");
        let compressed_ext = format!("{ext}{COMPRESS_SUFFIX}");

        let mut backups = read_dir
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let metadata = entry.metadata().ok()?;
                // the writer only creates files, not directories or symlinks
                if !metadata.is_file() {
                    return None;
                }

                let filename = entry.file_name();
                // if the filename is not a UTF-8 string, skip it.
                let filename = filename.to_str()?;

                if let Some(timestamp) = self.parse_backup_time(filename, &prefix, ext) {
                    return Some(Backup {
                        path: entry.path(),
                        name: filename.to_string(),
                        timestamp,
                        compressed: false,
                    });
                }

                let timestamp = self.parse_backup_time(filename, &prefix, &compressed_ext)?;
                let name = &filename[..filename.len() - COMPRESS_SUFFIX.len()];
                Some(Backup {
                    path: entry.path(),
                    name: name.to_string(),
                    timestamp,
                    compressed: true,
                })
            })
            .collect::<Vec<_>>();

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }
}

fn compress_file(src: &Path) -> io::Result<()> {
    let mut dst = src.as_os_str().to_owned();
    dst.push(COMPRESS_SUFFIX);
    let dst = PathBuf::from(dst);

    if let Err(err) = write_gzip(src, &dst) {
        let _ = fs::remove_file(&dst);
        return Err(err);
    }
    fs::remove_file(src)
}

fn write_gzip(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = fs::File::open(src)?;
    let output = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dst)?;

    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()
}
