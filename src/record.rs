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

//! Log record and levels.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use crate::Error;
use crate::ErrorKind;
use crate::caller::Caller;
use crate::kv::KeyValues;

/// The payload of a log message.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    // the observed time
    now: SystemTime,

    // the metadata
    level: Level,
    name: Option<&'a str>,
    caller: Option<Caller>,

    // the payload
    payload: &'a str,

    // structural logging
    kvs: KeyValues<'a>,
    stack: Option<String>,
}

impl<'a> Record<'a> {
    /// The observed time.
    pub fn time(&self) -> SystemTime {
        self.now
    }

    /// The severity of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The dotted name of the logger that produced the record, if any.
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// The resolved call site.
    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    /// The message body.
    pub fn payload(&self) -> &'a str {
        self.payload
    }

    /// The key-values, logger context first.
    pub fn key_values(&self) -> &KeyValues<'a> {
        &self.kvs
    }

    /// The captured stack trace.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Returns a new builder.
    pub fn builder() -> RecordBuilder<'a> {
        RecordBuilder::default()
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    record: Record<'a>,
}

impl Default for RecordBuilder<'_> {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                now: SystemTime::now(),
                level: Level::Info,
                name: None,
                caller: None,
                payload: "",
                kvs: KeyValues::default(),
                stack: None,
            },
        }
    }
}

impl<'a> RecordBuilder<'a> {
    /// Set [`time`](Record::time).
    pub fn time(mut self, now: SystemTime) -> Self {
        self.record.now = now;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`name`](Record::name).
    pub fn name(mut self, name: Option<&'a str>) -> Self {
        self.record.name = name;
        self
    }

    /// Set [`caller`](Record::caller).
    pub fn caller(mut self, caller: Option<Caller>) -> Self {
        self.record.caller = caller;
        self
    }

    /// Set [`payload`](Record::payload).
    pub fn payload(mut self, payload: &'a str) -> Self {
        self.record.payload = payload;
        self
    }

    /// Set [`key_values`](Record::key_values).
    pub fn key_values(mut self, kvs: impl Into<KeyValues<'a>>) -> Self {
        self.record.kvs = kvs.into();
        self
    }

    /// Set [`stack`](Record::stack).
    pub fn stack(mut self, stack: Option<String>) -> Self {
        self.record.stack = stack;
        self
    }

    /// Invoke the builder and return a `Record`
    pub fn build(self) -> Record<'a> {
        self.record
    }
}

/// An enum representing the available severity levels, least severe first.
///
/// The integer values returned by [`Level::severity`] follow the widely used zap scale, so that
/// `-1` is debug and `5` is fatal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates lower priority information.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates errors.
    Error,
    /// Designates errors that panic in development mode.
    DPanic,
    /// Designates errors after which the logger panics.
    Panic,
    /// Designates errors after which the process exits.
    Fatal,
}

impl Level {
    const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];

    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::DPanic => "DPANIC",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    /// Return the integer severity of the `Level`.
    ///
    /// # Examples
    ///
    /// ```
    /// use teelog::record::Level;
    ///
    /// assert_eq!(Level::Debug.severity(), -1);
    /// assert_eq!(Level::Warn.severity(), 1);
    /// assert_eq!(Level::Fatal.severity(), 5);
    /// ```
    pub fn severity(&self) -> i8 {
        *self as i8 - 1
    }

    /// Return the `Level` of the given integer severity, if any.
    pub fn from_severity(severity: i8) -> Option<Level> {
        Level::ALL
            .iter()
            .copied()
            .find(|level| level.severity() == severity)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;
    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for level in Level::ALL {
            if s.eq_ignore_ascii_case(level.as_str()) {
                return Ok(level);
            }
        }
        if s.eq_ignore_ascii_case("warning") {
            return Ok(Level::Warn);
        }

        Err(Error::new(ErrorKind::Config, format!("malformed level: {s:?}")))
    }
}

/// An enum representing the available severity level filters.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum LevelFilter {
    /// Disables all levels.
    Off,
    /// Enables if the target level is more severe than or equal to the filter level.
    MoreSevereEqual(Level),
    /// Enables all levels.
    All,
}

impl LevelFilter {
    /// Checks the given level if satisfies the filter condition.
    ///
    /// # Examples
    ///
    /// ```
    /// use teelog::record::Level;
    /// use teelog::record::LevelFilter;
    ///
    /// let level_filter = LevelFilter::MoreSevereEqual(Level::Warn);
    ///
    /// assert_eq!(level_filter.test(Level::Info), false);
    /// assert_eq!(level_filter.test(Level::Warn), true);
    /// assert_eq!(level_filter.test(Level::Error), true);
    /// ```
    pub fn test(&self, level: Level) -> bool {
        match self {
            LevelFilter::Off => false,
            LevelFilter::MoreSevereEqual(l) => level >= *l,
            LevelFilter::All => true,
        }
    }

    /// Create a filter that accepts every level whose severity is at least `min`.
    ///
    /// Thresholds below debug accept everything and thresholds above fatal accept nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use teelog::record::Level;
    /// use teelog::record::LevelFilter;
    ///
    /// assert_eq!(LevelFilter::from_severity(0), LevelFilter::MoreSevereEqual(Level::Info));
    /// assert_eq!(LevelFilter::from_severity(-3), LevelFilter::All);
    /// assert_eq!(LevelFilter::from_severity(6), LevelFilter::Off);
    /// ```
    pub fn from_severity(min: i8) -> LevelFilter {
        if min < Level::Debug.severity() {
            return LevelFilter::All;
        }
        match Level::from_severity(min) {
            Some(level) => LevelFilter::MoreSevereEqual(level),
            None => LevelFilter::Off,
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        LevelFilter::MoreSevereEqual(level)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::fmt;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::de;

    use super::Level;

    struct LevelVisitor;

    impl de::Visitor<'_> for LevelVisitor {
        type Value = Level;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a level name or an integer severity between -1 and 5")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Level, E> {
            i8::try_from(v)
                .ok()
                .and_then(Level::from_severity)
                .ok_or_else(|| E::custom(format!("unknown severity: {v}")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Level, E> {
            i64::try_from(v)
                .map_err(|_| E::custom(format!("unknown severity: {v}")))
                .and_then(|v| self.visit_i64(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Level, E> {
            v.parse().map_err(E::custom)
        }
    }

    impl<'de> Deserialize<'de> for Level {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(LevelVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_scale() {
        let severities = Level::ALL.map(|level| level.severity());
        assert_eq!(severities, [-1, 0, 1, 2, 3, 4, 5]);

        for level in Level::ALL {
            assert_eq!(Level::from_severity(level.severity()), Some(level));
        }
        assert_eq!(Level::from_severity(-2), None);
        assert_eq!(Level::from_severity(6), None);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("DPanic".parse::<Level>().unwrap(), Level::DPanic);
        assert_eq!("fatal".parse::<Level>().unwrap(), Level::Fatal);

        let err = "verbose".parse::<Level>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_display_pads() {
        assert_eq!(format!("{:>6}", Level::Warn), "  WARN");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_filter_from_severity() {
        let info = LevelFilter::from_severity(0);
        assert!(!info.test(Level::Debug));
        assert!(info.test(Level::Info));
        assert!(info.test(Level::Fatal));

        let all = LevelFilter::from_severity(i8::MIN);
        assert!(all.test(Level::Debug));

        let off = LevelFilter::from_severity(i8::MAX);
        assert!(!off.test(Level::Fatal));
    }
}
