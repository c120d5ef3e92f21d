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

use crate::append::Append;
use crate::logger::log_impl::Dispatch;
use crate::logger::log_impl::Logger;
use crate::logger::log_impl::Options;
use crate::record::Level;
use crate::record::LevelFilter;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Create a new empty [`LoggerBuilder`] instance for configuring log dispatching.
///
/// # Examples
///
/// ```
/// use teelog::append::FileBuilder;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = teelog::builder()
///     .dispatch(|d| d.append(FileBuilder::new(dir.path(), "app.log").build().unwrap()))
///     .build();
/// ```
pub fn builder() -> LoggerBuilder {
    LoggerBuilder {
        dispatches: vec![],
        name: None,
        options: Options::default(),
        trap: Box::new(DefaultTrap::default()),
    }
}

/// A builder for configuring log dispatching and constructing a [`Logger`].
#[must_use = "call `build` to construct a logger instance"]
#[derive(Debug)]
pub struct LoggerBuilder {
    // stashed dispatches
    dispatches: Vec<Dispatch>,
    name: Option<String>,
    options: Options,
    trap: Box<dyn Trap>,
}

impl LoggerBuilder {
    /// Register a new dispatch with the [`LoggerBuilder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use teelog::append::FileBuilder;
    /// use teelog::record::Level;
    /// use teelog::record::LevelFilter;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let errors = FileBuilder::new(dir.path(), "error.app.log").build().unwrap();
    /// let logger = teelog::builder()
    ///     .dispatch(|d| d.filter(LevelFilter::MoreSevereEqual(Level::Warn)).append(errors))
    ///     .build();
    /// ```
    pub fn dispatch<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatchBuilder<false>) -> DispatchBuilder<true>,
    {
        self.dispatches.push(f(DispatchBuilder::new()).build());
        self
    }

    /// Set the name of the root logger.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Annotate every record with the call site of the logging call.
    pub fn add_caller(mut self) -> Self {
        self.options.add_caller = true;
        self
    }

    /// Skip this many more stack frames when resolving the call site.
    ///
    /// Useful when the logger is called through wrapper functions. No effect unless
    /// [`add_caller`](LoggerBuilder::add_caller) is set.
    pub fn caller_skip(mut self, skip: usize) -> Self {
        self.options.caller_skip = skip;
        self
    }

    /// Capture a stack trace for records at or above the given level.
    pub fn stacktrace(mut self, level: Level) -> Self {
        self.options.stacktrace = LevelFilter::MoreSevereEqual(level);
        self
    }

    /// Put the logger in development mode, where [`Logger::dpanic`] panics.
    pub fn development(mut self) -> Self {
        self.options.development = true;
        self
    }

    /// Set the trap for errors raised by appenders.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`Logger`].
    pub fn build(self) -> Logger {
        Logger::new(self.dispatches, self.trap, self.name, self.options)
    }
}

/// A builder for configuring a log dispatch, including its filter and appenders.
///
/// A dispatch accepts every level unless a filter is set.
#[derive(Debug)]
pub struct DispatchBuilder<const APPEND: bool> {
    filter: LevelFilter,
    appends: Vec<Box<dyn Append>>,
}

impl DispatchBuilder<false> {
    fn new() -> Self {
        DispatchBuilder {
            filter: LevelFilter::All,
            appends: vec![],
        }
    }

    /// Set the level filter of this dispatch.
    pub fn filter(mut self, filter: impl Into<LevelFilter>) -> Self {
        self.filter = filter.into();
        self
    }
}

impl DispatchBuilder<true> {
    fn build(self) -> Dispatch {
        Dispatch::new(self.filter, self.appends)
    }
}

impl<const APPEND: bool> DispatchBuilder<APPEND> {
    /// Add an appender to this dispatch.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> DispatchBuilder<true> {
        self.appends.push(append.into());
        DispatchBuilder {
            filter: self.filter,
            appends: self.appends,
        }
    }
}
