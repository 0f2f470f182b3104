//! JSON storage of complex fields (collections, maps, nested structs that are
//! not inlined). The encoded document is persisted as bytes.

use crate::{Error, Result, Value, truncate_long};
use serde::{Serialize, de::DeserializeOwned};

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Error::new(e).context("Could not encode the field as JSON"))?;
    Ok(Value::Blob(Some(bytes.into_boxed_slice())))
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    let result = match &value {
        Value::Blob(Some(v)) => serde_json::from_slice(v),
        Value::Varchar(Some(v)) => serde_json::from_str(v),
        _ => {
            return Err(Error::msg(format!(
                "Expected a JSON document stored as text or bytes, found {value:?}"
            )));
        }
    };
    result.map_err(|e| {
        let text = match &value {
            Value::Blob(Some(v)) => String::from_utf8_lossy(v).into_owned(),
            Value::Varchar(Some(v)) => v.clone(),
            _ => String::new(),
        };
        Error::new(e).context(format!(
            "Could not decode the JSON document `{}`",
            truncate_long!(text)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn encode_decode() {
        let tags = vec!["a".to_string(), "b".to_string()];
        let value = encode(&tags).unwrap();
        assert_eq!(value, Value::Blob(Some(b"[\"a\",\"b\"]".to_vec().into())));
        let back: Vec<String> = decode(value).unwrap();
        assert_eq!(back, tags);

        let map: BTreeMap<String, i32> = decode(Value::Varchar(Some("{\"x\":1}".into()))).unwrap();
        assert_eq!(map.get("x"), Some(&1));
    }

    #[test]
    fn decode_rejects() {
        assert!(decode::<Vec<i32>>(Value::Int(Some(1))).is_err());
        assert!(decode::<Vec<i32>>(Value::Varchar(Some("{".into()))).is_err());
    }
}
