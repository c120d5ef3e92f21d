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

//! Key-value pairs attached to a log record.

use std::borrow::Cow;
use std::fmt;
use std::fmt::Write;
use std::time::Duration;

use serde::Serialize;
use serde::Serializer;

/// A typed value in a key-value pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string.
    Str(Cow<'static, str>),
    /// A signed integer.
    I64(i64),
    /// An unsigned integer.
    U64(u64),
    /// A floating-point number.
    F64(f64),
    /// A boolean.
    Bool(bool),
    /// A duration, rendered in human-readable form such as `1.5s`.
    Duration(Duration),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(v) => f.write_str(v),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Duration(v) => f.write_str(&format_duration(*v)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Str(v) => serializer.serialize_str(v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::F64(v) if v.is_nan() => serializer.serialize_str("NaN"),
            Value::F64(v) if v.is_infinite() => {
                serializer.serialize_str(if *v > 0.0 { "+Inf" } else { "-Inf" })
            }
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Duration(v) => serializer.serialize_str(&format_duration(*v)),
        }
    }
}

macro_rules! impl_value_from {
    ($variant:ident: $target:ty => $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(v: $source) -> Self {
                    Value::$variant(<$target>::from(v))
                }
            }
        )+
    };
}

impl_value_from!(I64: i64 => i8, i16, i32, i64);
impl_value_from!(U64: u64 => u8, u16, u32, u64);
impl_value_from!(F64: f64 => f32, f64);

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::U64(v as u64)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::I64(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<&'static str> for Value {
    fn from(v: &'static str) -> Self {
        Value::Str(Cow::Borrowed(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Cow::Owned(v))
    }
}

impl From<Cow<'static, str>> for Value {
    fn from(v: Cow<'static, str>) -> Self {
        Value::Str(v)
    }
}

/// A structured field: a key and its value.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use teelog::kv::Field;
///
/// let fields = [
///     Field::new("free_mb", 12),
///     Field::new("elapsed", Duration::from_millis(1500)),
///     Field::new("volume", "/dev/sda1"),
/// ];
/// assert_eq!(fields[1].value().to_string(), "1.5s");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: Cow<'static, str>,
    value: Value,
}

impl Field {
    /// Create a field.
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create an `error` field holding the rendered error.
    pub fn error(err: &dyn std::error::Error) -> Self {
        Self::new("error", err.to_string())
    }

    /// The key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// The key-values of a record: fields inherited from the logger come first, then the fields of
/// the logging call.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValues<'a> {
    context: &'a [Field],
    fields: &'a [Field],
}

impl<'a> KeyValues<'a> {
    /// Create key-values from context fields and call fields.
    pub fn new(context: &'a [Field], fields: &'a [Field]) -> Self {
        Self { context, fields }
    }

    /// Get the number of key-value pairs.
    pub fn len(&self) -> usize {
        self.context.len() + self.fields.len()
    }

    /// Check if there are no key-value pairs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get an iterator over the fields.
    pub fn iter(&self) -> impl Iterator<Item = &'a Field> {
        self.context.iter().chain(self.fields.iter())
    }
}

impl<'a> From<&'a [Field]> for KeyValues<'a> {
    fn from(fields: &'a [Field]) -> Self {
        KeyValues::new(&[], fields)
    }
}

impl<'a, const N: usize> From<&'a [Field; N]> for KeyValues<'a> {
    fn from(fields: &'a [Field; N]) -> Self {
        KeyValues::new(&[], fields)
    }
}

/// Render a duration the way Go's `time.Duration` prints itself: `0s`, `750ns`, `1.5µs`,
/// `100ms`, `1.5s`, `1m30s`, `2h0m5s`.
pub fn format_duration(d: Duration) -> String {
    const MICRO: u128 = 1_000;
    const MILLI: u128 = 1_000_000;
    const SECOND: u128 = 1_000_000_000;

    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < MICRO {
        return format!("{nanos}ns");
    }
    if nanos < MILLI {
        return format!("{}µs", format_fraction(nanos, MICRO, 3));
    }
    if nanos < SECOND {
        return format!("{}ms", format_fraction(nanos, MILLI, 6));
    }

    let secs = d.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);

    let mut text = String::new();
    // SAFETY: write to a string always succeeds
    if hours > 0 {
        write!(&mut text, "{hours}h").unwrap();
    }
    if hours > 0 || minutes > 0 {
        write!(&mut text, "{minutes}m").unwrap();
    }
    let nanos = u128::from(seconds) * SECOND + u128::from(d.subsec_nanos());
    write!(&mut text, "{}s", format_fraction(nanos, SECOND, 9)).unwrap();
    text
}

// integer part of `v / unit` plus the non-zero fraction digits
fn format_fraction(v: u128, unit: u128, digits: usize) -> String {
    let (int, frac) = (v / unit, v % unit);
    if frac == 0 {
        return int.to_string();
    }
    let frac = format!("{frac:0digits$}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}
