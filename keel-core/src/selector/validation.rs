use regex::Regex;
use std::sync::LazyLock;

const NAME_MAX_LENGTH: usize = 63;
const SUBDOMAIN_MAX_LENGTH: usize = 253;

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").unwrap());
static SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

/// Qualified name: an optional DNS subdomain prefix followed by `/`, then a
/// name of at most 63 characters, alphanumeric at both ends with `-_.`
/// allowed inside.
pub fn validate_key(key: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let parts = key.split('/').collect::<Vec<_>>();
    let name = match parts.as_slice() {
        [name] => *name,
        [prefix, name] => {
            if prefix.is_empty() {
                errors.push(format!("key `{key}`: prefix part must be non-empty"));
            } else if prefix.len() > SUBDOMAIN_MAX_LENGTH {
                errors.push(format!(
                    "key `{key}`: prefix part must be no more than {SUBDOMAIN_MAX_LENGTH} characters"
                ));
            } else if !SUBDOMAIN.is_match(prefix) {
                errors.push(format!(
                    "key `{key}`: prefix part must be a lowercase DNS subdomain"
                ));
            }
            *name
        }
        _ => {
            errors.push(format!(
                "key `{key}`: a qualified name must consist of an optional prefix and a name separated by a single '/'"
            ));
            return errors;
        }
    };
    if name.is_empty() {
        errors.push(format!("key `{key}`: name part must be non-empty"));
    } else if name.len() > NAME_MAX_LENGTH {
        errors.push(format!(
            "key `{key}`: name part must be no more than {NAME_MAX_LENGTH} characters"
        ));
    } else if !NAME.is_match(name) {
        errors.push(format!(
            "key `{key}`: name part must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
        ));
    }
    errors
}

/// Label value: empty, or at most 63 characters with the name character rules.
pub fn validate_value(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    if value.len() > NAME_MAX_LENGTH {
        return vec![format!(
            "value `{value}`: must be no more than {NAME_MAX_LENGTH} characters"
        )];
    }
    if !NAME.is_match(value) {
        return vec![format!(
            "value `{value}`: a valid value must be empty or consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
        )];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys() {
        for key in ["x", "user_id", "a.b-c", "example.com/name", "A1", "1"] {
            assert!(validate_key(key).is_empty(), "{key}");
        }
        for key in ["", "-x", "x-", "/x", "a/b/c", "Example.com/x", "x/", "a b"] {
            assert!(!validate_key(key).is_empty(), "{key}");
        }
        assert!(!validate_key(&"k".repeat(64)).is_empty());
        assert!(validate_key(&"k".repeat(63)).is_empty());
    }

    #[test]
    fn values() {
        for value in ["", "tom", "a_b.c-d", "42"] {
            assert!(validate_value(value).is_empty(), "{value}");
        }
        for value in ["_x", "x.", "a%b"] {
            assert_eq!(validate_value(value).len(), 1, "{value}");
        }
        assert!(!validate_value(&"v".repeat(64)).is_empty());
    }
}
