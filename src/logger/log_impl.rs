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

use std::backtrace::Backtrace;
use std::panic::Location;
use std::process;
use std::sync::Arc;
use std::time::SystemTime;

use crate::Error;
use crate::append::Append;
use crate::caller;
use crate::kv::Field;
use crate::kv::KeyValues;
use crate::record::Level;
use crate::record::LevelFilter;
use crate::record::Record;
use crate::trap::Trap;

/// A structured logger that dispatches log records to one or more dispatches.
///
/// Cloning is cheap; clones share the appenders. Child loggers created with [`Logger::named`]
/// and [`Logger::with`] share them as well.
///
/// Logging calls never fail. Errors raised by appenders are handed to the configured
/// [`Trap`].
///
/// # Examples
///
/// ```
/// use teelog::kv::Field;
///
/// let logger = teelog::builder().build();
/// let logger = logger.named("svc").with(&[Field::new("region", "eu")]);
/// logger.info("started", &[Field::new("port", 8080)]);
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    core: Arc<Core>,
    name: Option<Arc<str>>,
    context: Arc<[Field]>,
    options: Options,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Options {
    pub(super) add_caller: bool,
    pub(super) caller_skip: usize,
    pub(super) stacktrace: LevelFilter,
    pub(super) development: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            add_caller: false,
            caller_skip: 0,
            stacktrace: LevelFilter::Off,
            development: false,
        }
    }
}

#[derive(Debug)]
struct Core {
    dispatches: Vec<Dispatch>,
    trap: Box<dyn Trap>,
}

impl Logger {
    pub(super) fn new(
        dispatches: Vec<Dispatch>,
        trap: Box<dyn Trap>,
        name: Option<String>,
        options: Options,
    ) -> Self {
        Self {
            core: Arc::new(Core { dispatches, trap }),
            name: name.map(Arc::from),
            context: Arc::from(Vec::new()),
            options,
        }
    }

    /// The name of this logger, dotted from its ancestors.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Create a child logger whose name is appended to this logger's name with a dot.
    ///
    /// # Examples
    ///
    /// ```
    /// let logger = teelog::builder().build().named("svc").named("http");
    /// assert_eq!(logger.name(), Some("svc.http"));
    /// ```
    pub fn named(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }

        let name = match &self.name {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        };
        Logger {
            name: Some(name.into()),
            ..self.clone()
        }
    }

    /// Create a child logger that adds the given fields to every record, ahead of the fields
    /// passed at each call.
    pub fn with(&self, fields: &[Field]) -> Logger {
        if fields.is_empty() {
            return self.clone();
        }

        let context = self
            .context
            .iter()
            .chain(fields)
            .cloned()
            .collect::<Vec<_>>();
        Logger {
            context: context.into(),
            ..self.clone()
        }
    }

    /// Whether any dispatch accepts records of the given level.
    pub fn enabled(&self, level: Level) -> bool {
        self.core
            .dispatches
            .iter()
            .any(|dispatch| dispatch.enabled(level))
    }

    /// Log a message at the debug level.
    #[track_caller]
    pub fn debug(&self, msg: &str, fields: &[Field]) {
        self.log(Level::Debug, msg, fields);
    }

    /// Log a message at the info level.
    #[track_caller]
    pub fn info(&self, msg: &str, fields: &[Field]) {
        self.log(Level::Info, msg, fields);
    }

    /// Log a message at the warn level.
    #[track_caller]
    pub fn warn(&self, msg: &str, fields: &[Field]) {
        self.log(Level::Warn, msg, fields);
    }

    /// Log a message at the error level.
    #[track_caller]
    pub fn error(&self, msg: &str, fields: &[Field]) {
        self.log(Level::Error, msg, fields);
    }

    /// Log a message at the dpanic level, then panic if the logger is in development mode.
    #[track_caller]
    pub fn dpanic(&self, msg: &str, fields: &[Field]) {
        self.log(Level::DPanic, msg, fields);
    }

    /// Log a message at the panic level, then panic.
    ///
    /// The panic happens even if no dispatch accepts the record.
    #[track_caller]
    pub fn panic(&self, msg: &str, fields: &[Field]) -> ! {
        self.write(Level::Panic, msg, fields);
        panic!("{msg}");
    }

    /// Log a message at the fatal level, flush all appenders, then exit the process with
    /// status 1.
    ///
    /// The exit happens even if no dispatch accepts the record.
    #[track_caller]
    pub fn fatal(&self, msg: &str, fields: &[Field]) -> ! {
        self.write(Level::Fatal, msg, fields);
        self.exit()
    }

    /// Log a message at the given level.
    ///
    /// Terminal levels behave as [`dpanic`](Logger::dpanic), [`panic`](Logger::panic) and
    /// [`fatal`](Logger::fatal) do.
    #[track_caller]
    pub fn log(&self, level: Level, msg: &str, fields: &[Field]) {
        self.write(level, msg, fields);

        match level {
            Level::DPanic if self.options.development => panic!("{msg}"),
            Level::Panic => panic!("{msg}"),
            Level::Fatal => self.exit(),
            _ => {}
        }
    }

    /// Flush all appenders.
    ///
    /// Every appender is flushed; the first error is returned.
    pub fn sync(&self) -> Result<(), Error> {
        let mut first = None;
        for dispatch in &self.core.dispatches {
            if let Err(err) = dispatch.flush() {
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    #[track_caller]
    fn write(&self, level: Level, msg: &str, fields: &[Field]) {
        if !self.enabled(level) {
            return;
        }

        let location = Location::caller();
        let caller = self
            .options
            .add_caller
            .then(|| caller::resolve(self.options.caller_skip, location));
        let stack = self
            .options
            .stacktrace
            .test(level)
            .then(|| Backtrace::force_capture().to_string());

        let record = Record::builder()
            .time(SystemTime::now())
            .level(level)
            .name(self.name())
            .caller(caller)
            .payload(msg)
            .key_values(KeyValues::new(&self.context, fields))
            .stack(stack)
            .build();
        self.dispatch(&record);
    }

    pub(crate) fn dispatch(&self, record: &Record) {
        for dispatch in &self.core.dispatches {
            if let Err(err) = dispatch.log(record) {
                self.core.trap.trap(&err);
            }
        }
    }

    #[cfg(feature = "bridge-log")]
    pub(crate) fn context(&self) -> &[Field] {
        &self.context
    }

    #[cfg(feature = "bridge-log")]
    pub(crate) fn trap(&self, err: &Error) {
        self.core.trap.trap(err);
    }

    fn exit(&self) -> ! {
        if let Err(err) = self.sync() {
            self.core.trap.trap(&err);
        }
        process::exit(1)
    }
}

/// A grouped set of appenders behind a level filter.
///
/// The [`Logger`] dispatches log records to one or more [`Dispatch`] instances; a record passes
/// to the appenders when the filter accepts its level.
#[derive(Debug)]
pub(super) struct Dispatch {
    filter: LevelFilter,
    appends: Vec<Box<dyn Append>>,
}

impl Dispatch {
    pub(super) fn new(filter: LevelFilter, appends: Vec<Box<dyn Append>>) -> Self {
        debug_assert!(
            !appends.is_empty(),
            "A Dispatch must have at least one appender"
        );

        Self { filter, appends }
    }

    fn enabled(&self, level: Level) -> bool {
        self.filter.test(level)
    }

    fn log(&self, record: &Record) -> Result<(), Error> {
        if !self.enabled(record.level()) {
            return Ok(());
        }

        for append in &self.appends {
            append.append(record)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        for append in &self.appends {
            append.flush()?;
        }
        Ok(())
    }
}
