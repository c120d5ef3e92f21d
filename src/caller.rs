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

//! Call site of a log record.

use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

/// The source location that issued a log call.
///
/// Displayed as `<trimmed-path>:<line> <trimmed-function>`, for example
/// `handlers/disk.rs:42 disk::check_free_space`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    file: Cow<'static, str>,
    line: u32,
    function: Option<Cow<'static, str>>,
}

impl Caller {
    /// Create a caller without function information.
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            function: None,
        }
    }

    /// Attach the fully qualified function name.
    pub fn with_function(mut self, function: impl Into<Cow<'static, str>>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// The full source file path.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The fully qualified function name.
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// The file path reduced to its last directory and file name.
    pub fn trimmed_path(&self) -> &str {
        trim_path(&self.file)
    }

    /// The function name without its package prefix.
    pub fn trimmed_function(&self) -> Option<&str> {
        self.function.as_deref().map(trim_function)
    }
}

impl From<&'static Location<'static>> for Caller {
    fn from(location: &'static Location<'static>) -> Self {
        Caller::new(location.file(), location.line())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.trimmed_path(), self.line)?;
        if let Some(function) = self.trimmed_function() {
            write!(f, " {function}")?;
        }
        Ok(())
    }
}

/// Keep the last two components of a path: `/home/app/src/handlers/disk.rs` becomes
/// `handlers/disk.rs`. Shorter paths are returned whole.
pub fn trim_path(path: &str) -> &str {
    const SEPARATORS: [char; 2] = ['/', '\\'];

    let Some(idx) = path.rfind(SEPARATORS) else {
        return path;
    };
    match path[..idx].rfind(SEPARATORS) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Drop everything up to and including the last `/`, then keep the last two `::` segments.
///
/// `domain.com/org/pkg/sub.Func` becomes `sub.Func` and `my_app::http::sub::handler` becomes
/// `sub::handler`.
pub fn trim_function(function: &str) -> &str {
    let function = match function.rfind('/') {
        Some(idx) => &function[idx + 1..],
        None => function,
    };

    let mut separators = function.rmatch_indices("::");
    match (separators.next(), separators.next()) {
        (Some(_), Some((idx, sep))) => &function[idx + sep.len()..],
        _ => function,
    }
}

const CRATE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
const CRATE_IMPL_PREFIX: &str = concat!("<", env!("CARGO_CRATE_NAME"), "::");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    // frames of the unwinder before the logging call
    Unwinder,
    // frames of this crate
    Internal,
    // frames of the application, counting down the skip
    External(usize),
}

/// A symbol of the frame the walk stopped at. Any part may be missing when the binary carries
/// no debug info.
#[derive(Debug, Default)]
struct Frame {
    function: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

/// Resolve the frame that called into the logger, skipping `skip` more frames above it.
///
/// `location` is the `#[track_caller]` location of the logging call. It stands in for the file
/// and line when the stack cannot be symbolized, for example in builds without debug info.
pub(crate) fn resolve(skip: usize, location: &'static Location<'static>) -> Caller {
    locate(walk(skip), location)
}

fn locate(frame: Option<Frame>, location: &'static Location<'static>) -> Caller {
    let Some(frame) = frame else {
        return Caller::from(location);
    };

    let caller = match (frame.file, frame.line) {
        (Some(file), Some(line)) => Caller::new(file, line),
        _ => Caller::from(location),
    };
    match frame.function {
        Some(function) => caller.with_function(function),
        None => caller,
    }
}

fn walk(skip: usize) -> Option<Frame> {
    let mut walk = Walk::Unwinder;
    let mut found = None;

    backtrace::trace(|frame| {
        // inlined functions show up as several symbols of one frame, innermost first
        let mut symbols = vec![];
        backtrace::resolve_frame(frame, |symbol| {
            symbols.push(Frame {
                function: symbol.name().map(|name| format!("{name:#}")),
                file: symbol
                    .filename()
                    .map(|path| path.to_string_lossy().into_owned()),
                line: symbol.lineno(),
            });
        });

        for symbol in symbols {
            let internal = symbol.function.as_deref().is_some_and(is_internal);
            walk = match (walk, internal) {
                (Walk::Unwinder, false) => Walk::Unwinder,
                (Walk::Unwinder | Walk::Internal, true) => Walk::Internal,
                (Walk::Internal, false) => Walk::External(skip),
                (Walk::External(n), _) => Walk::External(n.saturating_sub(1)),
            };

            if walk == Walk::External(0) {
                found = Some(symbol);
                return false;
            }
        }
        true
    });

    found
}

fn is_internal(name: &str) -> bool {
    name.starts_with(CRATE_PREFIX)
        || name.starts_with(CRATE_IMPL_PREFIX)
        || name.starts_with("backtrace::")
}
