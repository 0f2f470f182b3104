use crate::{IndexDef, TimeEncoding};
use std::str::FromStr;

/// Modifiers parsed from a field's `#[sql("...")]` annotation.
///
/// The annotation is a comma separated list of `key[=value]` items. Values
/// containing commas can be wrapped in single quotes. A leading bare token
/// that is not a known modifier is the column name, `-` alone skips the
/// field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tag {
    pub skip: bool,
    pub name: Option<String>,
    pub is_where: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub auto_increment_start: Option<u64>,
    pub default: Option<String>,
    pub size: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub not_null: bool,
    pub unique: bool,
    pub comment: Option<String>,
    pub index: Option<IndexDef>,
    pub type_override: Option<String>,
    pub inline: bool,
    pub auto_create_time: Option<TimeEncoding>,
    pub auto_update_time: Option<TimeEncoding>,
}

const MODIFIERS: &[&str] = &[
    "name",
    "where",
    "primary_key",
    "auto_increment",
    "default",
    "size",
    "precision",
    "scale",
    "not_null",
    "notnull",
    "unique",
    "comment",
    "index",
    "unique_index",
    "type",
    "inline",
    "auto_create_time",
    "auto_update_time",
];

impl Tag {
    /// Parses the annotation of `field`.
    ///
    /// # Panics
    /// When a numeric modifier (`size`, `precision`, `scale`,
    /// `auto_increment`) carries a value that is not a number.
    pub fn parse(field: &str, tag: &str) -> Tag {
        let mut result = Tag::default();
        let tag = tag.trim();
        if tag == "-" {
            result.skip = true;
            return result;
        }
        for (i, item) in split_items(tag).into_iter().enumerate() {
            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim(), Some(unquote(v.trim()))),
                None => (item.trim(), None),
            };
            if key.is_empty() {
                continue;
            }
            let lower = key.to_ascii_lowercase();
            match lower.as_str() {
                "name" => result.name = value.filter(|v| !v.is_empty()),
                "where" => result.is_where = true,
                "primary_key" => result.primary_key = true,
                "auto_increment" => {
                    result.auto_increment = true;
                    result.auto_increment_start = parse_number(field, key, value.as_deref());
                }
                "default" => result.default = value,
                "size" => result.size = parse_number(field, key, value.as_deref()),
                "precision" => result.precision = parse_number(field, key, value.as_deref()),
                "scale" => result.scale = parse_number(field, key, value.as_deref()),
                "not_null" | "notnull" => result.not_null = true,
                "unique" => result.unique = true,
                "comment" => result.comment = value,
                "index" | "unique_index" => {
                    result.index = Some(IndexDef {
                        name: value.unwrap_or_default(),
                        unique: lower == "unique_index",
                    })
                }
                "type" => result.type_override = value.filter(|v| !v.is_empty()),
                "inline" => result.inline = true,
                "auto_create_time" => {
                    result.auto_create_time = Some(parse_encoding(field, value.as_deref()))
                }
                "auto_update_time" => {
                    result.auto_update_time = Some(parse_encoding(field, value.as_deref()))
                }
                _ if i == 0 && value.is_none() => result.name = Some(key.to_string()),
                _ => {
                    log::warn!(
                        "Ignoring the unknown modifier `{}` on field `{}` (known modifiers: {})",
                        key,
                        field,
                        MODIFIERS.join(", ")
                    );
                }
            }
        }
        result
    }
}

fn split_items(tag: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in tag.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !items.is_empty() {
        items.push(current);
    }
    items
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
        .to_string()
}

fn parse_number<T: FromStr>(field: &str, key: &str, value: Option<&str>) -> Option<T> {
    let value = value?;
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => panic!("Field `{field}` has a malformed numeric value for `{key}`: `{value}`"),
    }
}

fn parse_encoding(field: &str, value: Option<&str>) -> TimeEncoding {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("native") => TimeEncoding::Native,
        Some("second" | "seconds") => TimeEncoding::UnixSecond,
        Some("milli" | "millis") => TimeEncoding::UnixMilli,
        Some("nano" | "nanos") => TimeEncoding::UnixNano,
        Some(other) => {
            log::warn!(
                "Unknown time unit `{other}` on field `{field}`, expected second, milli or nano"
            );
            TimeEncoding::Native
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip() {
        assert!(Tag::parse("f", "-").skip);
        assert!(!Tag::parse("f", "").skip);
        assert_eq!(Tag::parse("f", ""), Tag::default());
    }

    #[test]
    fn modifiers() {
        let tag = Tag::parse(
            "id",
            "name=user_id, primary_key,auto_increment=1000,where,not_null,unique,comment='a, b'",
        );
        assert_eq!(tag.name.as_deref(), Some("user_id"));
        assert!(tag.primary_key);
        assert!(tag.auto_increment);
        assert_eq!(tag.auto_increment_start, Some(1000));
        assert!(tag.is_where);
        assert!(tag.not_null);
        assert!(tag.unique);
        assert_eq!(tag.comment.as_deref(), Some("a, b"));
    }

    #[test]
    fn leading_name() {
        let tag = Tag::parse("email", "mail,size=512,index");
        assert_eq!(tag.name.as_deref(), Some("mail"));
        assert_eq!(tag.size, Some(512));
        assert_eq!(
            tag.index,
            Some(IndexDef {
                name: String::new(),
                unique: false
            })
        );
        let tag = Tag::parse("email", "unique_index=idx_mail,notnull");
        assert_eq!(tag.name, None);
        assert!(tag.not_null);
        assert_eq!(
            tag.index,
            Some(IndexDef {
                name: "idx_mail".into(),
                unique: true
            })
        );
    }

    #[test]
    fn numeric_and_default() {
        let tag = Tag::parse("price", "precision=10,scale=2,default=1.5,type=decimal(10,2)");
        assert_eq!(tag.precision, Some(10));
        assert_eq!(tag.scale, Some(2));
        assert_eq!(tag.default.as_deref(), Some("1.5"));
        // The unquoted comma splits the type, the remainder is ignored
        assert_eq!(tag.type_override.as_deref(), Some("decimal(10"));
        let tag = Tag::parse("price", "type='decimal(10,2)'");
        assert_eq!(tag.type_override.as_deref(), Some("decimal(10,2)"));
    }

    #[test]
    fn time_modifiers() {
        let tag = Tag::parse("stamp", "auto_create_time=milli,auto_update_time");
        assert_eq!(tag.auto_create_time, Some(TimeEncoding::UnixMilli));
        assert_eq!(tag.auto_update_time, Some(TimeEncoding::Native));
    }

    #[test]
    fn unknown_modifier_is_ignored() {
        let tag = Tag::parse("f", "size=3,whatever,inline");
        assert_eq!(tag.size, Some(3));
        assert_eq!(tag.name, None);
        assert!(tag.inline);
    }

    #[test]
    #[should_panic(expected = "malformed numeric value for `size`")]
    fn malformed_size() {
        Tag::parse("f", "size=big");
    }

    #[test]
    #[should_panic]
    fn malformed_auto_increment() {
        Tag::parse("f", "auto_increment=-");
    }
}
