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

//! A bridge to forward logs from the `log` crate to a [`Logger`].

use std::borrow::Cow;

use crate::Logger;
use crate::caller::Caller;
use crate::kv::Field;
use crate::kv::KeyValues;
use crate::kv::Value;
use crate::record::Level;
use crate::record::Record;

/// Set up the log crate global logger.
///
/// This function calls [`log::set_boxed_logger`] with the given logger, so that all logs from
/// the log crate are forwarded to it.
///
/// This function will set the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// let dir = tempfile::tempdir().unwrap();
/// let logger = teelog::new_file_logger(dir.path(), "svc", 10, 3, 7, 0, 0).unwrap();
/// if let Err(err) = teelog::bridge::log::try_setup_log_crate(logger) {
///     eprintln!("failed to setup log crate: {err}");
/// }
/// log::warn!("disk low");
/// ```
pub fn try_setup_log_crate(logger: Logger) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Logger::enabled(self, metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let level = Level::from(record.level());
        if !Logger::enabled(self, level) {
            return;
        }

        let file: Option<Cow<'static, str>> = match record.file_static() {
            Some(file) => Some(file.into()),
            None => record.file().map(|file| file.to_string().into()),
        };
        let caller = match (file, record.line()) {
            (Some(file), Some(line)) => {
                let caller = Caller::new(file, line);
                Some(match record.module_path() {
                    Some(module_path) => caller.with_function(module_path.to_string()),
                    None => caller,
                })
            }
            _ => None,
        };

        // key-values
        let mut fields = Vec::new();
        let mut visitor = FieldVisitor {
            fields: &mut fields,
        };
        // the visitor never fails
        let _ = record.key_values().visit(&mut visitor);

        let payload = record.args().to_string();
        let record = Record::builder()
            .level(level)
            .name(self.name())
            .caller(caller)
            .payload(&payload)
            .key_values(KeyValues::new(self.context(), &fields))
            .build();
        self.dispatch(&record);
    }

    fn flush(&self) {
        if let Err(err) = self.sync() {
            self.trap(&err);
        }
    }
}

struct FieldVisitor<'a> {
    fields: &'a mut Vec<Field>,
}

impl<'kvs> log::kv::VisitSource<'kvs> for FieldVisitor<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.fields
            .push(Field::new(key.as_str().to_string(), convert_value(&value)));
        Ok(())
    }
}

fn convert_value(value: &log::kv::Value) -> Value {
    if let Some(v) = value.to_bool() {
        Value::Bool(v)
    } else if let Some(v) = value.to_i64() {
        Value::I64(v)
    } else if let Some(v) = value.to_u64() {
        Value::U64(v)
    } else if let Some(v) = value.to_f64() {
        Value::F64(v)
    } else if let Some(v) = value.to_borrowed_str() {
        Value::Str(v.to_string().into())
    } else {
        Value::Str(value.to_string().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(Level::from(log::Level::Trace), Level::Debug);
        assert_eq!(Level::from(log::Level::Debug), Level::Debug);
        assert_eq!(Level::from(log::Level::Warn), Level::Warn);
        assert_eq!(Level::from(log::Level::Error), Level::Error);
    }

    #[test]
    fn test_convert_value() {
        assert_eq!(convert_value(&log::kv::Value::from(true)), Value::Bool(true));
        assert_eq!(convert_value(&log::kv::Value::from(-3i32)), Value::I64(-3));
        assert_eq!(convert_value(&log::kv::Value::from(1.5f64)), Value::F64(1.5));
        assert_eq!(
            convert_value(&log::kv::Value::from("eu")),
            Value::Str("eu".into())
        );
    }
}
