use crate::{Error, Result};
use std::ffi::CString;

/// Writes every item with `f`, putting `separator` between the items that
/// actually produced some output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

pub fn as_c_string<S: Into<Vec<u8>>>(str: S) -> Result<CString> {
    CString::new(str.into())
        .map_err(|e| Error::new(e).context("The string contains an interior nul byte"))
}

/// Lower snake case used for table and column names derived from Rust identifiers.
pub fn snake_case(name: &str) -> String {
    use convert_case::{Case, Casing};
    name.to_case(Case::Snake)
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$crate::floor_char_boundary(&$query, 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

#[doc(hidden)]
pub fn floor_char_boundary(value: &str, index: usize) -> usize {
    if index >= value.len() {
        return value.len();
    }
    (0..=index)
        .rev()
        .find(|i| value.is_char_boundary(*i))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated() {
        let mut out = String::from("(");
        separated_by(&mut out, ["a", "", "b"], |out, v| out.push_str(v), ", ");
        out.push(')');
        assert_eq!(out, "(a, b)");
    }

    #[test]
    fn snake() {
        assert_eq!(snake_case("UserProfile"), "user_profile");
        assert_eq!(snake_case("createdAt"), "created_at");
        assert_eq!(snake_case("id"), "id");
    }

    #[test]
    fn truncate() {
        let long = "é".repeat(400);
        let printed = format!("{}", truncate_long!(long));
        assert!(printed.ends_with("..."));
        assert!(printed.len() <= 500);
        assert_eq!(format!("{}", truncate_long!("SELECT 1")), "SELECT 1");
    }
}
