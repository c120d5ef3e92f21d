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

use jiff::tz::TimeZone;
use serde::Serializer;
use serde::ser::SerializeMap;

use crate::Error;
use crate::layout::Layout;
use crate::layout::format_error;
use crate::layout::format_timestamp;
use crate::record::Record;

/// A layout that formats log records as one JSON object per line.
///
/// Output format:
///
/// ```json
/// {"L":"WARN","T":"2024-08-11T22:44:57.172+0800","N":"svc","C":"handlers/disk.rs:42 disk::check","M":"disk low","free_mb":12}
/// ```
///
/// The fixed keys are `L` (level), `T` (time), `N` (logger name), `C` (caller), `M` (message)
/// and `S` (stack trace); fields are placed between the message and the stack trace.
///
/// # Examples
///
/// ```
/// use teelog::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default();
/// ```
#[derive(Debug, Clone)]
pub struct JsonLayout {
    timezone: TimeZone,
}

impl Default for JsonLayout {
    fn default() -> Self {
        Self {
            timezone: TimeZone::system(),
        }
    }
}

impl JsonLayout {
    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let time = format_timestamp(record.time(), &self.timezone)?;

        let mut bytes = vec![];
        let mut ser = serde_json::Serializer::new(&mut bytes);
        let mut map = ser.serialize_map(None).map_err(format_error)?;

        map.serialize_entry("L", record.level().as_str())
            .map_err(format_error)?;
        map.serialize_entry("T", &time).map_err(format_error)?;
        if let Some(name) = record.name() {
            map.serialize_entry("N", name).map_err(format_error)?;
        }
        if let Some(caller) = record.caller() {
            map.serialize_entry("C", &caller.to_string())
                .map_err(format_error)?;
        }
        map.serialize_entry("M", record.payload())
            .map_err(format_error)?;
        for field in record.key_values().iter() {
            map.serialize_entry(field.key(), field.value())
                .map_err(format_error)?;
        }
        if let Some(stack) = record.stack() {
            map.serialize_entry("S", stack).map_err(format_error)?;
        }
        map.end().map_err(format_error)?;

        Ok(bytes)
    }
}
