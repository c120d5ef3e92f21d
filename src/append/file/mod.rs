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

//! Appender for writing log records to size-rotated files.
//!
//! The active file is `<dir>/<filename>`. When a write would grow it past the maximum size, it is
//! renamed to a backup named after the rotation time, `<stem>-<YYYY-MM-DDTHH-MM-SS.mmm><ext>`,
//! and a fresh file takes its place. Backups can be pruned by count and by age, and gzip
//! compressed (gaining a `.gz` suffix).
//!
//! # Examples
//!
//! ```
//! use std::num::NonZeroU64;
//! use std::num::NonZeroUsize;
//!
//! use teelog::append::file::FileBuilder;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = FileBuilder::new(dir.path(), "app.log")
//!     .rollover_size(NonZeroU64::new(10 * 1024 * 1024).unwrap())
//!     .max_backups(NonZeroUsize::new(3).unwrap())
//!     .compress()
//!     .build()
//!     .unwrap();
//! ```

pub use self::append::File;
pub use self::append::FileBuilder;
pub use self::rolling::DEFAULT_MAX_SIZE;
pub use self::rolling::MEGABYTE;
pub use self::rolling::RollingFileWriter;
pub use self::rolling::RollingFileWriterBuilder;

pub(crate) use self::rolling::create_dir_all;

mod append;
mod clock;
mod rolling;
