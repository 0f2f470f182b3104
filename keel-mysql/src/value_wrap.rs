use keel_core::{Error, Value};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

pub(crate) struct ValueWrap(pub(crate) Value);

impl From<Value> for ValueWrap {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<ValueWrap> for Value {
    fn from(value: ValueWrap) -> Self {
        value.0
    }
}

impl mysql_async::prelude::FromValue for ValueWrap {
    type Intermediate = ValueWrap;
}

impl TryFrom<mysql_async::Value> for ValueWrap {
    type Error = mysql_async::FromValueError;

    fn try_from(value: mysql_async::Value) -> Result<Self, Self::Error> {
        type MySqlValue = mysql_async::Value;
        Ok(match value {
            MySqlValue::NULL => Value::Null,
            MySqlValue::Bytes(v) => Value::Blob(Some(v.into())),
            MySqlValue::Int(v) => Value::Int(Some(v)),
            MySqlValue::UInt(v) => Value::UInt(Some(v)),
            MySqlValue::Float(v) => Value::Float(Some(v as f64)),
            MySqlValue::Double(v) => Value::Float(Some(v)),
            MySqlValue::Date(year, month, day, hour, minute, second, microsecond) => {
                let date = Month::try_from(month)
                    .ok()
                    .and_then(|month| Date::from_calendar_date(year as _, month, day).ok());
                let time = Time::from_hms_micro(hour, minute, second, microsecond).ok();
                match (date, time) {
                    (Some(date), Some(time)) => {
                        Value::Time(Some(PrimitiveDateTime::new(date, time).assume_utc()))
                    }
                    _ => return Err(mysql_async::FromValueError(value)),
                }
            }
            MySqlValue::Time(negative, days, hours, minutes, seconds, microseconds) => {
                let hours = days as u64 * 24 + hours as u64;
                Value::Varchar(Some(format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    if negative { "-" } else { "" },
                    hours,
                    minutes,
                    seconds,
                    microseconds
                )))
            }
        }
        .into())
    }
}

fn to_date(value: OffsetDateTime) -> Result<mysql_async::Value, Error> {
    let value = value.to_offset(UtcOffset::UTC);
    let year = u16::try_from(value.year())
        .map_err(|_| Error::msg(format!("Date {} is out of range for MySQL", value)))?;
    Ok(mysql_async::Value::Date(
        year,
        value.month().into(),
        value.day(),
        value.hour(),
        value.minute(),
        value.second(),
        value.microsecond(),
    ))
}

impl TryFrom<ValueWrap> for mysql_async::Value {
    type Error = Error;

    fn try_from(value: ValueWrap) -> Result<Self, Self::Error> {
        type MySqlValue = mysql_async::Value;
        Ok(match value.0 {
            v if v.is_null() => MySqlValue::NULL,
            Value::Boolean(Some(v)) => MySqlValue::from(v),
            Value::Int(Some(v)) => MySqlValue::Int(v),
            Value::UInt(Some(v)) => MySqlValue::UInt(v),
            Value::Float(Some(v)) => MySqlValue::Double(v),
            Value::Varchar(Some(v)) => MySqlValue::Bytes(v.into_bytes()),
            Value::Time(Some(v)) => to_date(v)?,
            Value::Blob(Some(v)) => MySqlValue::Bytes(v.into_vec()),
            v => {
                return Err(Error::msg(format!(
                    "Value `{:?}` cannot be sent to MySQL",
                    v
                )));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn time_round_trip() {
        let time = datetime!(2024-03-15 10:20:30.125 +02:00);
        let sent = mysql_async::Value::try_from(ValueWrap(Value::Time(Some(time)))).unwrap();
        assert_eq!(
            sent,
            mysql_async::Value::Date(2024, 3, 15, 8, 20, 30, 125_000)
        );
        let received = ValueWrap::try_from(sent).unwrap().0;
        assert_eq!(received, Value::Time(Some(time)));
    }

    #[test]
    fn null_and_bytes() {
        let sent = mysql_async::Value::try_from(ValueWrap(Value::Varchar(None))).unwrap();
        assert_eq!(sent, mysql_async::Value::NULL);
        let received = ValueWrap::try_from(mysql_async::Value::Bytes(b"abc".to_vec()))
            .unwrap()
            .0;
        assert_eq!(received, Value::Blob(Some(b"abc".as_slice().into())));
        assert!(
            mysql_async::Value::try_from(ValueWrap(Value::Time(Some(
                OffsetDateTime::UNIX_EPOCH.replace_year(-1).unwrap()
            ))))
            .is_err()
        );
    }
}
