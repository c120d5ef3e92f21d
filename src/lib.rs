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

//! Teelog builds structured loggers that tee records into two rotating files: one with every
//! record at or above a minimum level, and one with warnings and above.
//!
//! # Overview
//!
//! A [`Logger`] dispatches records to one or more dispatches, each a level filter in front of
//! appenders. The [`new_file_logger`] factory assembles the usual pair of dispatches: the
//! all-records file `<name>.log` and the error file `error.<name>.log`, both rotated by size,
//! pruned by count and age, and gzip compressed. Each record carries its call site, rendered as
//! `<dir>/<file>:<line> <module>::<function>`.
//!
//! # Examples
//!
//! Create a logger writing to `/var/log/svc`, keeping three backups of at most 10 MB for a week:
//!
//! ```
//! use std::time::Duration;
//!
//! use teelog::kv::Field;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # let dir = dir.path();
//! let logger = teelog::new_file_logger(dir, "svc", 10, 3, 7, 0, 0).unwrap();
//!
//! logger.info("started", &[Field::new("port", 8080)]);
//! logger.warn("disk low", &[Field::new("free_mb", 12)]);
//! logger.error("request failed", &[Field::new("elapsed", Duration::from_millis(1500))]);
//! ```
//!
//! Custom dispatches:
//!
//! ```
//! use teelog::append::FileBuilder;
//! use teelog::layout::JsonLayout;
//! use teelog::record::Level;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! let logger = teelog::builder()
//!     .dispatch(|d| {
//!         d.filter(Level::Error).append(
//!             FileBuilder::new(dir.path(), "error.json")
//!                 .layout(JsonLayout::default())
//!                 .build()
//!                 .unwrap(),
//!         )
//!     })
//!     .add_caller()
//!     .build();
//!
//! logger.error("boom", &[]);
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod bridge;
pub mod caller;
pub mod kv;
pub mod layout;
pub mod record;
pub mod trap;

mod config;
pub use config::Encoding;
pub use config::FileLoggerConfig;
pub use config::new_file_logger;

mod error;
pub use error::Error;
pub use error::ErrorKind;

mod logger;
pub use logger::*;

pub use kv::Field;
pub use record::Level;
