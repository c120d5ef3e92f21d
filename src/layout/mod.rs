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

//! Layouts for formatting log records.

use std::fmt;
use std::fmt::Write;
use std::time::SystemTime;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::ErrorKind;
use crate::record::Record;

mod json;
mod text;

pub use self::json::JsonLayout;
pub use self::text::TextLayout;

/// A layout for formatting log records.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Formats a log record, without the trailing line ending.
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error>;
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// Render the record time as ISO-8601 with millisecond precision: `2024-08-11T22:44:57.172+0800`,
/// or `2024-08-11T14:44:57.172Z` at a zero offset.
pub(crate) fn format_timestamp(time: SystemTime, tz: &TimeZone) -> Result<String, Error> {
    let ts = Timestamp::try_from(time).map_err(|err| {
        Error::new(ErrorKind::Format, "record time out of range").with_source(err)
    })?;

    let zoned = ts.to_zoned(tz.clone());
    let mut text = zoned.strftime("%Y-%m-%dT%H:%M:%S.%3f").to_string();
    if zoned.offset().seconds() == 0 {
        text.push('Z');
    } else {
        // SAFETY: write to a string always succeeds
        write!(&mut text, "{}", zoned.strftime("%z")).unwrap();
    }
    Ok(text)
}

fn format_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Format, "failed to encode record").with_source(err)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jiff::tz::Offset;

    use super::*;

    #[test]
    fn test_format_timestamp() {
        // 2024-08-11T14:44:57.172Z
        let time = SystemTime::UNIX_EPOCH + Duration::from_millis(1_723_387_497_172);

        let utc = format_timestamp(time, &TimeZone::UTC).unwrap();
        assert_eq!(utc, "2024-08-11T14:44:57.172Z");

        let east = TimeZone::fixed(Offset::constant(8));
        let east = format_timestamp(time, &east).unwrap();
        assert_eq!(east, "2024-08-11T22:44:57.172+0800");
    }
}
