use crate::{Error, Result, Value, truncate_long};
use std::{
    any,
    borrow::Cow,
    sync::Arc,
    time::SystemTime,
};
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::well_known::Rfc3339,
    macros::format_description,
};

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// This is the abstraction used to move field values into query parameters
/// and result cells back into fields.
///
/// # Conversion contract
/// - `as_empty_value` returns the typed `NULL` of the kind the type maps to,
///   it is used for absent optional data and must not allocate.
/// - `as_value` converts without loss.
/// - `try_from_value` accepts the canonical variant and, because drivers
///   return loosely typed cells (the MySQL text protocol returns bytes,
///   SQLite returns whatever was stored), also other widths with range
///   checks and textual representations.
///
/// # Examples
/// ```rust
/// use keel_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int(Some(42))));
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_empty_value() -> Value
    where
        Self: Sized;
    fn as_value(&self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>()
    ))
}

fn text_of(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Varchar(Some(v)) => Some(Cow::Borrowed(v.trim())),
        Value::Blob(Some(v)) => str::from_utf8(v).ok().map(|v| Cow::Borrowed(v.trim())),
        _ => None,
    }
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(&self) -> Value {
                $destination(Some(*self as _))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let out_of_range = |v: &dyn std::fmt::Display| {
                    Error::msg(format!(
                        "Value {v} is out of range for {}",
                        any::type_name::<Self>()
                    ))
                };
                match value {
                    Value::Int(Some(v)) => <$source>::try_from(v).map_err(|_| out_of_range(&v)),
                    Value::UInt(Some(v)) => <$source>::try_from(v).map_err(|_| out_of_range(&v)),
                    Value::Boolean(Some(v)) => Ok(v as _),
                    Value::Float(Some(v)) if v.fract() == 0.0 => {
                        let i = v as i128;
                        <$source>::try_from(i).map_err(|_| out_of_range(&v))
                    }
                    ref v => {
                        if let Some(text) = text_of(v) {
                            return text.parse::<$source>().map_err(|e| {
                                Error::new(e).context(format!(
                                    "Cannot parse `{}` as {}",
                                    truncate_long!(text),
                                    any::type_name::<Self>()
                                ))
                            });
                        }
                        Err(conversion_error::<Self>(v))
                    }
                }
            }
        }
    };
}

impl_as_value_integer!(i8, Value::Int);
impl_as_value_integer!(i16, Value::Int);
impl_as_value_integer!(i32, Value::Int);
impl_as_value_integer!(i64, Value::Int);
impl_as_value_integer!(isize, Value::Int);
impl_as_value_integer!(u8, Value::UInt);
impl_as_value_integer!(u16, Value::UInt);
impl_as_value_integer!(u32, Value::UInt);
impl_as_value_integer!(u64, Value::UInt);
impl_as_value_integer!(usize, Value::UInt);

macro_rules! impl_as_value_float {
    ($source:ty) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                Value::Float(None)
            }
            fn as_value(&self) -> Value {
                Value::Float(Some(*self as f64))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Float(Some(v)) => Ok(v as _),
                    Value::Int(Some(v)) => Ok(v as _),
                    Value::UInt(Some(v)) => Ok(v as _),
                    ref v => {
                        if let Some(text) = text_of(v) {
                            return text.parse::<$source>().map_err(|e| {
                                Error::new(e).context(format!(
                                    "Cannot parse `{}` as {}",
                                    truncate_long!(text),
                                    any::type_name::<Self>()
                                ))
                            });
                        }
                        Err(conversion_error::<Self>(v))
                    }
                }
            }
        }
    };
}

impl_as_value_float!(f32);
impl_as_value_float!(f64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(&self) -> Value {
        Value::Boolean(Some(*self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            Value::Int(Some(v)) => Ok(v != 0),
            Value::UInt(Some(v)) => Ok(v != 0),
            ref v => match text_of(v).as_deref() {
                Some("1" | "t" | "true" | "TRUE") => Ok(true),
                Some("0" | "f" | "false" | "FALSE") => Ok(false),
                _ => Err(conversion_error::<Self>(v)),
            },
        }
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(&self) -> Value {
        Value::Varchar(Some(self.clone()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Blob(Some(v)) => String::from_utf8(v.into_vec())
                .map_err(|e| Error::new(e).context("The value is not a valid UTF-8 string")),
            Value::Int(Some(v)) => Ok(v.to_string()),
            Value::UInt(Some(v)) => Ok(v.to_string()),
            Value::Float(Some(v)) => Ok(v.to_string()),
            Value::Boolean(Some(v)) => Ok(v.to_string()),
            Value::Time(Some(v)) => format_time(&v),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
}

impl AsValue for Cow<'static, str> {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(&self) -> Value {
        Value::Varchar(Some(self.to_string()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        String::try_from_value(value).map(Cow::Owned)
    }
}

impl AsValue for &str {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(&self) -> Value {
        Value::Varchar(Some((*self).into()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Err(Error::msg(format!(
            "Cannot borrow a string slice out of {value:?}, use String instead"
        )))
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(&self) -> Value {
        Value::Blob(Some(self.as_slice().into()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            Value::Varchar(Some(v)) => Ok(v.into_bytes()),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(&self) -> Value {
        Value::Blob(Some(self.clone()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Vec::<u8>::try_from_value(value).map(Vec::into_boxed_slice)
    }
}

/// Renders a time as RFC 3339 in UTC, the textual form stored by dialects
/// without a native time type.
pub fn format_time(value: &OffsetDateTime) -> Result<String> {
    value
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|e| Error::new(e).context(format!("Cannot format the time {value}")))
}

/// Parses RFC 3339 or `YYYY-MM-DD[ T]HH:MM:SS[.f]` (assumed UTC).
pub fn parse_time(input: &str) -> Result<OffsetDateTime> {
    let input = input.trim();
    if let Ok(v) = OffsetDateTime::parse(input, &Rfc3339) {
        return Ok(v);
    }
    let formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
    ];
    for format in formats {
        if let Ok(v) = PrimitiveDateTime::parse(input, format) {
            return Ok(v.assume_utc());
        }
    }
    Err(Error::msg(format!(
        "Cannot parse `{}` as a time",
        truncate_long!(input)
    )))
}

impl AsValue for OffsetDateTime {
    fn as_empty_value() -> Value {
        Value::Time(None)
    }
    fn as_value(&self) -> Value {
        Value::Time(Some(*self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(Some(v)) => Ok(v),
            Value::Int(Some(v)) => OffsetDateTime::from_unix_timestamp(v).map_err(Error::new),
            ref v => match text_of(v) {
                Some(text) => parse_time(&text),
                None => Err(conversion_error::<Self>(v)),
            },
        }
    }
}

impl AsValue for PrimitiveDateTime {
    fn as_empty_value() -> Value {
        Value::Time(None)
    }
    fn as_value(&self) -> Value {
        Value::Time(Some(self.assume_utc()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let v = OffsetDateTime::try_from_value(value)?.to_offset(UtcOffset::UTC);
        Ok(PrimitiveDateTime::new(v.date(), v.time()))
    }
}

impl AsValue for SystemTime {
    fn as_empty_value() -> Value {
        Value::Time(None)
    }
    fn as_value(&self) -> Value {
        Value::Time(Some(OffsetDateTime::from(*self)))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        OffsetDateTime::try_from_value(value).map(SystemTime::from)
    }
}

impl AsValue for Value {
    fn as_empty_value() -> Value {
        Value::Null
    }
    fn as_value(&self) -> Value {
        self.clone()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(&self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}

macro_rules! impl_as_value_wrapper {
    ($wrapper:ident) => {
        impl<T: AsValue> AsValue for $wrapper<T> {
            fn as_empty_value() -> Value {
                T::as_empty_value()
            }
            fn as_value(&self) -> Value {
                (**self).as_value()
            }
            fn try_from_value(value: Value) -> Result<Self> {
                T::try_from_value(value).map($wrapper::new)
            }
        }
    };
}
impl_as_value_wrapper!(Box);
impl_as_value_wrapper!(Arc);

impl<T: AsValue> From<&T> for Value {
    fn from(value: &T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}
