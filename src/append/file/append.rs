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

use std::io::Write;
use std::num::NonZeroU64;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use crate::Error;
use crate::append::Append;
use crate::append::file::rolling::RollingFileWriter;
use crate::append::file::rolling::RollingFileWriterBuilder;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::record::Record;
use crate::trap::Trap;

/// A builder to configure and create an [`File`] appender.
#[derive(Debug)]
pub struct FileBuilder {
    builder: RollingFileWriterBuilder,
    layout: Box<dyn Layout>,
}

impl FileBuilder {
    /// Create a new file appender builder writing to `<basedir>/<filename>`.
    pub fn new(basedir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            builder: RollingFileWriterBuilder::new(basedir, filename),
            layout: Box::new(TextLayout::default()),
        }
    }

    /// Build the [`File`] appender.
    ///
    /// # Errors
    ///
    /// Return an error if the configured filename is empty.
    pub fn build(self) -> Result<File, Error> {
        let FileBuilder { builder, layout } = self;
        let writer = builder.build()?;
        Ok(File::new(writer, layout))
    }

    /// Set the layout for the logs.
    ///
    /// Default to [`TextLayout`].
    ///
    /// # Examples
    ///
    /// ```
    /// use teelog::append::FileBuilder;
    /// use teelog::layout::JsonLayout;
    ///
    /// let builder = FileBuilder::new("my_service", "my_app.log");
    /// builder.layout(JsonLayout::default());
    /// ```
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the trap for handling errors during rotation and clean-up.
    ///
    /// Default to [`DefaultTrap`](crate::trap::DefaultTrap).
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.builder = self.builder.trap(trap);
        self
    }

    /// Roll over the log file when a write would make it exceed the given size in bytes.
    ///
    /// Default to [`DEFAULT_MAX_SIZE`](super::DEFAULT_MAX_SIZE).
    pub fn rollover_size(mut self, n: NonZeroU64) -> Self {
        self.builder = self.builder.max_file_size(n);
        self
    }

    /// Set the maximum number of backups to keep.
    pub fn max_backups(mut self, n: NonZeroUsize) -> Self {
        self.builder = self.builder.max_backups(n);
        self
    }

    /// Remove backups older than the given age.
    pub fn max_age(mut self, age: Duration) -> Self {
        self.builder = self.builder.max_age(age);
        self
    }

    /// Use the local time zone for backup names. Default to UTC.
    pub fn local_time(mut self) -> Self {
        self.builder = self.builder.local_time(true);
        self
    }

    /// Gzip backups once they are rotated out.
    pub fn compress(mut self) -> Self {
        self.builder = self.builder.compress(true);
        self
    }
}

/// An appender that writes log records to size-rotated files.
#[derive(Debug)]
pub struct File {
    writer: Mutex<RollingFileWriter>,
    layout: Box<dyn Layout>,
}

impl File {
    fn new(writer: RollingFileWriter, layout: Box<dyn Layout>) -> Self {
        let writer = Mutex::new(writer);
        Self { writer, layout }
    }

    fn writer(&self) -> MutexGuard<'_, RollingFileWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Append for File {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        let mut writer = self.writer();
        writer.write_all(&bytes).map_err(Error::from_io_error)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer();
        writer.flush().map_err(Error::from_io_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    use jiff::tz::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;
    use crate::layout::JsonLayout;
    use crate::record::Level;

    #[test]
    fn test_append_lines() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileBuilder::new(temp_dir.path(), "svc.log")
            .layout(TextLayout::default().no_color().timezone(TimeZone::UTC))
            .build()
            .unwrap();

        for payload in ["one", "two"] {
            let record = Record::builder().level(Level::Info).payload(payload).build();
            file.append(&record).unwrap();
        }
        file.flush().unwrap();

        let content = fs::read_to_string(temp_dir.path().join("svc.log")).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\tINFO\tone"), "{content}");
        assert!(lines[1].ends_with("\tINFO\ttwo"), "{content}");
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_drop_leaves_complete_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileBuilder::new(temp_dir.path(), "svc.log")
            .layout(TextLayout::default().no_color())
            .build()
            .unwrap();

        let record = Record::builder().level(Level::Warn).payload("last").build();
        file.append(&record).unwrap();
        drop(file);

        let content = fs::read_to_string(temp_dir.path().join("svc.log")).unwrap();
        assert!(content.ends_with("\tWARN\tlast\n"), "{content}");
    }

    #[test]
    fn test_concurrent_appends_keep_lines_whole() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileBuilder::new(temp_dir.path(), "svc.log")
            .layout(JsonLayout::default())
            .build()
            .unwrap();
        let file = Arc::new(file);

        let handles = (0..4)
            .map(|i| {
                let file = file.clone();
                thread::spawn(move || {
                    let payload = format!("worker-{i}");
                    for _ in 0..100 {
                        let record = Record::builder().payload(&payload).build();
                        file.append(&record).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(temp_dir.path().join("svc.log")).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 400);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["M"].as_str().unwrap().starts_with("worker-"));
        }
    }

    #[test]
    fn test_oversized_record_is_an_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileBuilder::new(temp_dir.path(), "svc.log")
            .rollover_size(NonZeroU64::new(16).unwrap())
            .build()
            .unwrap();

        let record = Record::builder().payload("far too long for the file").build();
        let err = file.append(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.io_error().is_some());
    }
}
