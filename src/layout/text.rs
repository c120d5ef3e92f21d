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

use std::fmt::Write;
use std::io;

use colored::Color;
use colored::ColoredString;
use colored::Colorize;
use jiff::tz::TimeZone;
use serde::Serializer;
use serde::ser::SerializeMap;

use crate::Error;
use crate::kv::KeyValues;
use crate::layout::Layout;
use crate::layout::format_error;
use crate::layout::format_timestamp;
use crate::record::Level;
use crate::record::Record;

/// A layout that formats log records as tab-separated text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172+0800	WARN	svc	handlers/disk.rs:42 disk::check	disk low	{"free_mb": 12}
/// 2024-08-11T22:44:57.173+0800	INFO	svc.http	server/mod.rs:88 server::serve	listening	{"elapsed": "1.5s"}
/// ```
///
/// The columns are time, level, logger name (when set), caller (when resolved) and message,
/// followed by the fields as a JSON object when there are any. A captured stack trace follows
/// on the next line.
///
/// By default, log levels are colored. Coloring honors the usual `NO_COLOR` and `CLICOLOR`
/// conventions and is skipped when standard output is not a terminal. Call
/// [`no_color`](TextLayout::no_color) to disable it.
///
/// # Examples
///
/// ```
/// use teelog::layout::TextLayout;
///
/// let layout = TextLayout::default().no_color();
/// ```
#[derive(Debug, Clone)]
pub struct TextLayout {
    colors: LevelColor,
    no_color: bool,
    timezone: TimeZone,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            colors: LevelColor::default(),
            no_color: false,
            timezone: TimeZone::system(),
        }
    }
}

impl TextLayout {
    /// Customize the color of the debug log level. Default to magenta.
    ///
    /// No effect if `no_color` is set to `true`.
    pub fn debug_color(mut self, color: Color) -> Self {
        self.colors.debug = color;
        self
    }

    /// Customize the color of the info log level. Default to blue.
    ///
    /// No effect if `no_color` is set to `true`.
    pub fn info_color(mut self, color: Color) -> Self {
        self.colors.info = color;
        self
    }

    /// Customize the color of the warn log level. Default to yellow.
    ///
    /// No effect if `no_color` is set to `true`.
    pub fn warn_color(mut self, color: Color) -> Self {
        self.colors.warn = color;
        self
    }

    /// Customize the color of the error, dpanic, panic and fatal log levels. Default to red.
    ///
    /// No effect if `no_color` is set to `true`.
    pub fn error_color(mut self, color: Color) -> Self {
        self.colors.error = color;
        self
    }

    /// Disable colored output.
    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use teelog::layout::TextLayout;
    ///
    /// let layout = TextLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    fn format_record_level(&self, level: Level) -> ColoredString {
        self.colors.colorize_record_level(self.no_color, level)
    }
}

impl Layout for TextLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = format_timestamp(record.time(), &self.timezone)?;

        // SAFETY: write to a string always succeeds
        let level = self.format_record_level(record.level());
        write!(&mut text, "\t{level}").unwrap();
        if let Some(name) = record.name() {
            write!(&mut text, "\t{name}").unwrap();
        }
        if let Some(caller) = record.caller() {
            write!(&mut text, "\t{caller}").unwrap();
        }
        write!(&mut text, "\t{}", record.payload()).unwrap();

        let mut bytes = text.into_bytes();
        let kvs = record.key_values();
        if !kvs.is_empty() {
            bytes.push(b'\t');
            write_fields(&mut bytes, kvs)?;
        }
        if let Some(stack) = record.stack() {
            bytes.push(b'\n');
            bytes.extend_from_slice(stack.as_bytes());
        }

        Ok(bytes)
    }
}

// {"key": value, "other": value}
fn write_fields(bytes: &mut Vec<u8>, kvs: &KeyValues) -> Result<(), Error> {
    let mut ser = serde_json::Serializer::with_formatter(bytes, SpacedFormatter);
    let mut map = ser.serialize_map(Some(kvs.len())).map_err(format_error)?;
    for field in kvs.iter() {
        map.serialize_entry(field.key(), field.value())
            .map_err(format_error)?;
    }
    map.end().map_err(format_error)
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Colors for different log levels.
#[derive(Debug, Clone)]
struct LevelColor {
    debug: Color,
    info: Color,
    warn: Color,
    error: Color,
}

impl Default for LevelColor {
    fn default() -> Self {
        Self {
            debug: Color::Magenta,
            info: Color::Blue,
            warn: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl LevelColor {
    /// Colorize the log level.
    fn colorize_record_level(&self, no_color: bool, level: Level) -> ColoredString {
        if no_color {
            ColoredString::from(level.to_string())
        } else {
            let color = match level {
                Level::Debug => self.debug,
                Level::Info => self.info,
                Level::Warn => self.warn,
                Level::Error | Level::DPanic | Level::Panic | Level::Fatal => self.error,
            };
            level.as_str().color(color)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use std::time::SystemTime;

    use super::*;
    use crate::caller::Caller;
    use crate::kv::Field;

    fn layout() -> TextLayout {
        TextLayout::default().no_color().timezone(TimeZone::UTC)
    }

    fn time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(1_723_387_497_172)
    }

    #[test]
    fn test_format_full_record() {
        let fields = [
            Field::new("free_mb", 12),
            Field::new("elapsed", Duration::from_millis(1500)),
        ];
        let caller = Caller::new("/srv/app/src/handlers/disk.rs", 42)
            .with_function("app::handlers::disk::check");
        let record = Record::builder()
            .time(time())
            .level(Level::Warn)
            .name(Some("svc.disk"))
            .caller(Some(caller))
            .payload("disk low")
            .key_values(&fields)
            .build();

        let text = String::from_utf8(layout().format(&record).unwrap()).unwrap();
        assert_eq!(
            text,
            "2024-08-11T14:44:57.172Z\tWARN\tsvc.disk\thandlers/disk.rs:42 disk::check\tdisk low\t{\"free_mb\": 12, \"elapsed\": \"1.5s\"}"
        );
    }

    #[test]
    fn test_format_minimal_record() {
        let record = Record::builder()
            .time(time())
            .level(Level::Info)
            .payload("started")
            .build();

        let text = String::from_utf8(layout().format(&record).unwrap()).unwrap();
        assert_eq!(text, "2024-08-11T14:44:57.172Z\tINFO\tstarted");
    }

    #[test]
    fn test_format_stack_on_next_line() {
        let record = Record::builder()
            .time(time())
            .level(Level::Error)
            .payload("boom")
            .stack(Some("0: app::main".to_string()))
            .build();

        let text = String::from_utf8(layout().format(&record).unwrap()).unwrap();
        assert_eq!(text, "2024-08-11T14:44:57.172Z\tERROR\tboom\n0: app::main");
    }

    #[test]
    fn test_fields_escaped() {
        let fields = [Field::new("path", "C:\\logs\t\"x\"")];
        let record = Record::builder().time(time()).key_values(&fields).build();

        let text = String::from_utf8(layout().format(&record).unwrap()).unwrap();
        assert!(text.ends_with(r#"{"path": "C:\\logs\t\"x\""}"#), "{text}");
    }
}
