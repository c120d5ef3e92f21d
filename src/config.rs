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

//! Construction of a logger that tees records into rotating files.

use std::num::NonZeroU64;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use jiff::tz::TimeZone;

use crate::Error;
use crate::ErrorKind;
use crate::Logger;
use crate::append::file;
use crate::append::file::DEFAULT_MAX_SIZE;
use crate::append::file::FileBuilder;
use crate::append::file::MEGABYTE;
use crate::layout::JsonLayout;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::record::Level;
use crate::record::LevelFilter;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Create a logger that writes to rotating files under `dir`.
///
/// Records at or above `min_level` go to `<dir>/<name>.log`; records at or above warn also go to
/// `<dir>/error.<name>.log`. `min_level` is an integer severity: `-1` is debug, `0` info, `1`
/// warn, `2` error, up to `5` for fatal.
///
/// Both files roll over once a write would take them past `max_size_mb` megabytes (100 if `0`).
/// At most `max_backups` rotated files are kept (all if `0`) and rotated files older than
/// `max_age_days` are removed (never if `0`). Rotated files are named in local time and gzip
/// compressed.
///
/// Every record carries its call site. `caller_skip` skips that many more stack frames, for
/// loggers called through wrapper functions.
///
/// # Errors
///
/// Return an error of kind [`ErrorKind::CreateDirectory`] if `dir` cannot be created.
///
/// # Examples
///
/// ```
/// use teelog::kv::Field;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = teelog::new_file_logger(dir.path(), "svc", 10, 3, 7, 0, 0).unwrap();
/// logger.warn("disk low", &[Field::new("free_mb", 12)]);
/// ```
pub fn new_file_logger(
    dir: impl AsRef<Path>,
    name: &str,
    max_size_mb: u64,
    max_backups: usize,
    max_age_days: u32,
    caller_skip: usize,
    min_level: i8,
) -> Result<Logger, Error> {
    FileLoggerConfig::new(dir.as_ref(), name)
        .max_size_mb(max_size_mb)
        .max_backups(max_backups)
        .max_age_days(max_age_days)
        .caller_skip(caller_skip)
        .min_level(min_level)
        .build()
}

/// The encoding of log lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Encoding {
    /// Tab-separated text, see [`TextLayout`].
    #[default]
    Text,
    /// One JSON object per line, see [`JsonLayout`].
    Json,
}

/// Configuration of a logger writing to an all-records file and an error file.
///
/// With the `serde` feature the configuration can be deserialized; missing keys take their
/// default values, and `min_level` accepts a severity integer or a level name.
///
/// # Examples
///
/// ```
/// use teelog::Encoding;
/// use teelog::FileLoggerConfig;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = FileLoggerConfig::new(dir.path(), "svc")
///     .max_size_mb(10)
///     .max_backups(3)
///     .min_level(-1)
///     .encoding(Encoding::Json)
///     .build()
///     .unwrap();
/// logger.debug("ready", &[]);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FileLoggerConfig {
    dir: PathBuf,
    name: String,
    max_size_mb: u64,
    max_backups: usize,
    max_age_days: u32,
    caller_skip: usize,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "serde_impl::min_level"))]
    min_level: i8,
    local_time: bool,
    compress: bool,
    color: bool,
    encoding: Encoding,
    #[cfg_attr(feature = "serde", serde(skip))]
    trap: Option<Arc<dyn Trap>>,
}

impl Default for FileLoggerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            name: "app".to_string(),
            max_size_mb: 0,
            max_backups: 0,
            max_age_days: 0,
            caller_skip: 0,
            min_level: Level::Info.severity(),
            local_time: true,
            compress: true,
            color: false,
            encoding: Encoding::Text,
            trap: None,
        }
    }
}

impl FileLoggerConfig {
    /// Create a configuration for logs named `name` under `dir`.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Roll over files at this many megabytes. `0` stands for 100.
    pub fn max_size_mb(mut self, n: u64) -> Self {
        self.max_size_mb = n;
        self
    }

    /// Keep at most this many rotated files per log. `0` keeps all.
    pub fn max_backups(mut self, n: usize) -> Self {
        self.max_backups = n;
        self
    }

    /// Remove rotated files older than this many days. `0` disables removal by age.
    pub fn max_age_days(mut self, n: u32) -> Self {
        self.max_age_days = n;
        self
    }

    /// Skip this many more stack frames when resolving the call site.
    pub fn caller_skip(mut self, n: usize) -> Self {
        self.caller_skip = n;
        self
    }

    /// Write records with at least this integer severity to the all-records file.
    ///
    /// Below `-1` everything is written; above `5` nothing is. The error file is unaffected.
    pub fn min_level(mut self, severity: i8) -> Self {
        self.min_level = severity;
        self
    }

    /// Use the local time zone for timestamps and backup names, instead of UTC.
    ///
    /// Default to `true`.
    pub fn local_time(mut self, yes: bool) -> Self {
        self.local_time = yes;
        self
    }

    /// Gzip rotated files. Default to `true`.
    pub fn compress(mut self, yes: bool) -> Self {
        self.compress = yes;
        self
    }

    /// Color the level label of text lines. Default to `false`.
    pub fn color(mut self, yes: bool) -> Self {
        self.color = yes;
        self
    }

    /// Set the encoding of log lines. Default to [`Encoding::Text`].
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the trap for write, rotation and clean-up failures of both files.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Some(Arc::new(trap));
        self
    }

    /// Create the directory and build the logger.
    ///
    /// Log files are created on their first write.
    ///
    /// # Errors
    ///
    /// Return an error of kind [`ErrorKind::CreateDirectory`] if the directory cannot be created;
    /// [`Error::io_error`] gives the cause.
    pub fn build(&self) -> Result<Logger, Error> {
        file::create_dir_all(&self.dir).map_err(|err| {
            Error::new(ErrorKind::CreateDirectory, "failed to create log directory")
                .with_context("path", self.dir.display())
                .with_source(err)
        })?;

        let trap: Arc<dyn Trap> = match &self.trap {
            Some(trap) => trap.clone(),
            None => Arc::new(DefaultTrap::default()),
        };
        let high = self
            .file_builder(format!("error.{}.log", self.name), trap.clone())
            .build()?;
        let all = self
            .file_builder(format!("{}.log", self.name), trap.clone())
            .build()?;

        let logger = crate::builder()
            .dispatch(|d| d.filter(Level::Warn).append(high))
            .dispatch(|d| {
                d.filter(LevelFilter::from_severity(self.min_level))
                    .append(all)
            })
            .add_caller()
            .caller_skip(self.caller_skip)
            .trap(trap)
            .build();
        Ok(logger)
    }

    fn max_size(&self) -> NonZeroU64 {
        let bytes = match self.max_size_mb {
            0 => DEFAULT_MAX_SIZE,
            n => n.saturating_mul(MEGABYTE),
        };
        NonZeroU64::new(bytes).unwrap_or(NonZeroU64::MAX)
    }

    fn file_builder(&self, filename: String, trap: Arc<dyn Trap>) -> FileBuilder {
        let mut builder = FileBuilder::new(self.dir.clone(), filename)
            .rollover_size(self.max_size())
            .layout(self.layout())
            .trap(trap);
        if let Some(n) = NonZeroUsize::new(self.max_backups) {
            builder = builder.max_backups(n);
        }
        if self.max_age_days > 0 {
            let days = u64::from(self.max_age_days);
            builder = builder.max_age(Duration::from_secs(days * SECONDS_PER_DAY));
        }
        if self.local_time {
            builder = builder.local_time();
        }
        if self.compress {
            builder = builder.compress();
        }
        builder
    }

    fn layout(&self) -> Box<dyn Layout> {
        let timezone = if self.local_time {
            TimeZone::system()
        } else {
            TimeZone::UTC
        };

        match self.encoding {
            Encoding::Text => {
                let layout = TextLayout::default().timezone(timezone);
                if self.color {
                    layout.into()
                } else {
                    layout.no_color().into()
                }
            }
            Encoding::Json => JsonLayout::default().timezone(timezone).into(),
        }
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::Deserialize;
    use serde::Deserializer;

    use crate::record::Level;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MinLevel {
        Severity(i8),
        Level(Level),
    }

    pub(super) fn min_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i8, D::Error> {
        match MinLevel::deserialize(deserializer)? {
            MinLevel::Severity(severity) => Ok(severity),
            MinLevel::Level(level) => Ok(level.severity()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_max_size() {
        let config = FileLoggerConfig::default();
        assert_eq!(config.max_size().get(), 100 * 1024 * 1024);

        let config = config.max_size_mb(10);
        assert_eq!(config.max_size().get(), 10 * 1024 * 1024);

        let config = config.max_size_mb(u64::MAX);
        assert_eq!(config.max_size().get(), u64::MAX);
    }

    #[test]
    fn test_build_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("var").join("log").join("svc");

        let logger = FileLoggerConfig::new(&dir, "svc").build().unwrap();
        assert!(dir.is_dir());
        assert!(fs::read_dir(&dir).unwrap().next().is_none());

        logger.info("hello", &[]);
        assert!(dir.join("svc.log").is_file());
        assert!(!dir.join("error.svc.log").exists());
    }

    #[test]
    fn test_build_fails_on_file_in_the_way() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("occupied");
        fs::write(&dir, "not a directory").unwrap();

        let err = FileLoggerConfig::new(&dir, "svc").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CreateDirectory);
        assert!(err.io_error().is_some());
        assert!(err.to_string().contains("occupied"), "{err}");
    }

    #[test]
    fn test_json_encoding() {
        let temp_dir = TempDir::new().unwrap();
        let logger = FileLoggerConfig::new(temp_dir.path(), "svc")
            .encoding(Encoding::Json)
            .compress(false)
            .build()
            .unwrap();
        logger.error("boom", &[]);

        let content = fs::read_to_string(temp_dir.path().join("error.svc.log")).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
        assert_eq!(value["L"], "ERROR");
        assert_eq!(value["M"], "boom");
        assert!(value["C"].as_str().is_some());
    }

    #[derive(Debug, Clone, Default)]
    struct TrapCapture {
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl Trap for TrapCapture {
        fn trap(&self, err: &Error) {
            self.errors.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_trap_reaches_file_sinks() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        // a stale backup whose compressed copy cannot be created
        fs::write(dir.join("svc-2024-08-10T17-12-52.123.log"), "old\n").unwrap();
        fs::create_dir(dir.join("svc-2024-08-10T17-12-52.123.log.gz")).unwrap();

        let trap = TrapCapture::default();
        let logger = FileLoggerConfig::new(dir, "svc")
            .max_size_mb(1)
            .trap(trap.clone())
            .build()
            .unwrap();

        logger.info("hello", &[]);
        let errors = std::mem::take(&mut *trap.errors.lock().unwrap());
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("failed to clean up log backups"), "{errors:?}");

        logger.info(&"x".repeat(2 * 1024 * 1024), &[]);
        let errors = trap.errors.lock().unwrap();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("exceeds maximum file size"), "{errors:?}");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_config() {
        let config: FileLoggerConfig = serde_json::from_str(
            r#"{"dir": "/var/log/svc", "name": "svc", "max_backups": 3, "min_level": "warn", "encoding": "json"}"#,
        )
        .unwrap();
        let expected = FileLoggerConfig::new("/var/log/svc", "svc")
            .max_backups(3)
            .min_level(1)
            .encoding(Encoding::Json);
        assert_eq!(format!("{config:?}"), format!("{expected:?}"));

        let config: FileLoggerConfig = serde_json::from_str(r#"{"min_level": -2}"#).unwrap();
        assert_eq!(config.min_level, -2);
        assert_eq!(config.name, "app");

        assert!(serde_json::from_str::<FileLoggerConfig>(r#"{"min_level": "loud"}"#).is_err());
    }
}
