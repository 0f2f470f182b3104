//! Compact selector language compiled to SQL predicates.
//!
//! A selector is a comma separated list of requirements, all of which must
//! hold:
//!
//! | syntax              | meaning                      |
//! |---------------------|------------------------------|
//! | `k=v`, `k==v`       | equals                       |
//! | `k!=v`              | not equals                   |
//! | `k in (a,b)`        | one of                       |
//! | `k notin (a,b)`     | none of                      |
//! | `k>v`, `k<v`        | greater / less than          |
//! | `k~v`, `k!~v`       | contains / does not contain  |
//! | `k=~v`, `k~=v`      | has prefix / has suffix      |
//! | `k`, `!k`           | not null / null              |
//!
//! ```rust
//! use keel_core::Selector;
//! let selector: Selector = "x=y,z,!w".parse().unwrap();
//! let (sql, args) = selector.sql();
//! assert_eq!(sql, "`x` = ? and `z` NOT NULL and `w` IS NULL");
//! assert_eq!(args.len(), 1);
//! ```

mod lexer;
mod parser;
mod validation;

use crate::{GenericSqlWriter, SqlWriter, Value, separated_by};
use validation::{validate_key, validate_value};
use std::{
    fmt::{self, Display},
    str::FromStr,
};

pub use lexer::{Lexer, Token};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectorError {
    #[error(
        "Unable to parse the selector: found '{found}', expected: {expected} (token {position})"
    )]
    Syntax {
        position: usize,
        found: String,
        expected: String,
    },
    #[error("Invalid selector: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    DoubleEquals,
    NotEquals,
    In,
    NotIn,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    HasPrefix,
    HasSuffix,
    Exists,
    DoesNotExist,
}

impl Operator {
    pub fn is_set(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

/// One clause of a selector, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

impl Requirement {
    /// Validates the key, every value and the number of values the operator
    /// takes: one for the comparisons, none for the null checks, any for the
    /// set operators.
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: Vec<String>,
    ) -> Result<Self, SelectorError> {
        let key = key.into();
        let errors = Self::problems(&key, operator, &values);
        if !errors.is_empty() {
            return Err(SelectorError::Invalid(errors));
        }
        Ok(Self {
            key,
            operator,
            values,
        })
    }

    pub(crate) fn problems(key: &str, operator: Operator, values: &[String]) -> Vec<String> {
        let mut errors = validate_key(key);
        for value in values {
            errors.extend(validate_value(value));
        }
        let expected = match operator {
            Operator::In | Operator::NotIn => None,
            Operator::Exists | Operator::DoesNotExist => Some(0),
            _ => Some(1),
        };
        if let Some(expected) = expected.filter(|v| *v != values.len()) {
            errors.push(format!(
                "key `{key}`: operator {operator:?} takes {expected} value(s), found {}",
                values.len()
            ));
        }
        errors
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn write_sql(&self, writer: &dyn SqlWriter, out: &mut String, args: &mut Vec<Value>) {
        let value = || self.values.first().cloned().unwrap_or_default();
        let mut binary = |out: &mut String, op: &str, arg: String| {
            writer.write_identifier_quoted(out, &self.key);
            out.push(' ');
            out.push_str(op);
            out.push_str(" ?");
            args.push(Value::Varchar(Some(arg)));
        };
        match self.operator {
            Operator::Equals | Operator::DoubleEquals => binary(out, "=", value()),
            Operator::NotEquals => binary(out, "!=", value()),
            Operator::GreaterThan => binary(out, ">", value()),
            Operator::LessThan => binary(out, "<", value()),
            Operator::Contains => binary(out, "like", format!("%{}%", value())),
            Operator::NotContains => binary(out, "not like", format!("%{}%", value())),
            Operator::HasPrefix => binary(out, "like", format!("{}%", value())),
            Operator::HasSuffix => binary(out, "like", format!("%{}", value())),
            Operator::In | Operator::NotIn => {
                if self.values.is_empty() {
                    out.push_str(if self.operator == Operator::In {
                        "1 = 0"
                    } else {
                        "1 = 1"
                    });
                    return;
                }
                writer.write_identifier_quoted(out, &self.key);
                out.push_str(if self.operator == Operator::In {
                    " in ("
                } else {
                    " not in ("
                });
                separated_by(out, &self.values, |out, _| out.push('?'), ",");
                out.push(')');
                args.extend(self.values.iter().map(|v| Value::Varchar(Some(v.clone()))));
            }
            Operator::Exists => writer.write_null_check(out, &self.key, false),
            Operator::DoesNotExist => writer.write_null_check(out, &self.key, true),
        }
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator == Operator::DoesNotExist {
            return write!(f, "!{}", self.key);
        }
        f.write_str(&self.key)?;
        let op = match self.operator {
            Operator::Equals => "=",
            Operator::DoubleEquals => "==",
            Operator::NotEquals => "!=",
            Operator::In => " in ",
            Operator::NotIn => " notin ",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::Contains => "~",
            Operator::NotContains => "!~",
            Operator::HasPrefix => "=~",
            Operator::HasSuffix => "~=",
            Operator::Exists | Operator::DoesNotExist => return Ok(()),
        };
        f.write_str(op)?;
        if self.operator.is_set() {
            let mut values = self.values.iter().map(String::as_str).collect::<Vec<_>>();
            values.sort_unstable();
            write!(f, "({})", values.join(","))
        } else {
            f.write_str(self.values.first().map(String::as_str).unwrap_or_default())
        }
    }
}

/// Parsed selector: requirements in source order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            requirements: parser::Parser::new(input).parse()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// New selector with `requirement` appended, `self` is left as is.
    pub fn add(&self, requirement: Requirement) -> Self {
        let mut requirements = self.requirements.clone();
        requirements.push(requirement);
        Self { requirements }
    }

    /// Predicate with backtick quoted columns and `?` placeholders, the
    /// fragments joined by ` and `, with the arguments in clause order.
    pub fn sql(&self) -> (String, Vec<Value>) {
        self.sql_with(&GenericSqlWriter)
    }

    /// Same as [`Selector::sql`], rendered by a dialect.
    pub fn sql_with(&self, writer: &dyn SqlWriter) -> (String, Vec<Value>) {
        let mut out = String::new();
        let mut args = Vec::new();
        separated_by(
            &mut out,
            &self.requirements,
            |out, v| v.write_sql(writer, out, &mut args),
            " and ",
        );
        (out, args)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            requirement.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &str) -> String {
        Selector::parse(input)
            .unwrap_or_else(|e| panic!("{input}: {e}"))
            .to_string()
    }

    #[test]
    fn canonical_form() {
        assert_eq!(round_trip("x=y,z,!w"), "x=y,z,!w");
        assert_eq!(round_trip("x in (a,b)"), "x in (a,b)");
        assert_eq!(round_trip("x notin ()"), "x notin ()");
        assert_eq!(round_trip(" x in ( b , a ) , y==z "), "x in (a,b),y==z");
        assert_eq!(
            round_trip("a~b,c!~d,e=~f,g~=h,i>1,j<2,k!=l"),
            "a~b,c!~d,e=~f,g~=h,i>1,j<2,k!=l"
        );
        assert_eq!(round_trip(""), "");
    }

    #[test]
    fn empty_operands() {
        let selector = Selector::parse("x=,y in (, ),z notin (a,)").unwrap();
        let requirements = selector.requirements();
        assert_eq!(requirements[0].values(), [String::new()]);
        assert_eq!(requirements[1].values(), [String::new(), String::new()]);
        assert_eq!(requirements[2].values(), ["a".to_string(), String::new()]);
        assert!(
            Selector::parse("x notin ()").unwrap().requirements()[0]
                .values()
                .is_empty()
        );
    }

    #[test]
    fn in_is_a_value_inside_parentheses() {
        let selector = Selector::parse("x in (in,notin)").unwrap();
        assert_eq!(selector.requirements()[0].values(), ["in", "notin"]);
    }

    #[test]
    fn sql() {
        let (sql, args) = Selector::parse("x=y,z,!w").unwrap().sql();
        assert_eq!(sql, "`x` = ? and `z` NOT NULL and `w` IS NULL");
        assert_eq!(args, vec![Value::Varchar(Some("y".into()))]);

        let (sql, args) = Selector::parse("x in (tom,jerry)").unwrap().sql();
        assert_eq!(sql, "`x` in (?,?)");
        assert_eq!(
            args,
            vec![
                Value::Varchar(Some("tom".into())),
                Value::Varchar(Some("jerry".into()))
            ]
        );

        let (sql, args) = Selector::parse("a~b,c!~d,e=~f,g~=h").unwrap().sql();
        assert_eq!(
            sql,
            "`a` like ? and `c` not like ? and `e` like ? and `g` like ?"
        );
        assert_eq!(
            args,
            ["%b%", "%d%", "f%", "%h"]
                .map(|v| Value::Varchar(Some(v.into())))
                .to_vec()
        );

        let (sql, args) = Selector::parse("x in (),y notin (),n>3")
            .unwrap()
            .sql();
        assert_eq!(sql, "1 = 0 and 1 = 1 and `n` > ?");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn syntax_errors() {
        for input in [
            "x=y,", ",x", "x in a", "x in (a", "x y", "!", "x=(a)", "=x", "x in (a b)",
        ] {
            assert!(
                matches!(Selector::parse(input), Err(SelectorError::Syntax { .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn validation_errors_are_aggregated() {
        let Err(SelectorError::Invalid(errors)) = Selector::parse("-x=_y,ok=fine,z/w/q") else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn requirement_constructor() {
        let requirement =
            Requirement::new("example.com/owner", Operator::Equals, vec!["root".into()]).unwrap();
        assert_eq!(requirement.key(), "example.com/owner");
        assert_eq!(requirement.operator(), Operator::Equals);
        assert_eq!(requirement.values(), ["root"]);
        assert!(Requirement::new("x", Operator::In, Vec::new()).is_ok());
        assert!(Requirement::new("x", Operator::Exists, Vec::new()).is_ok());

        for (key, operator, values) in [
            ("-x", Operator::Equals, vec!["y".to_string()]),
            ("x", Operator::Equals, vec!["_y".to_string()]),
            ("x", Operator::GreaterThan, Vec::new()),
            ("x", Operator::NotEquals, vec!["a".to_string(), "b".to_string()]),
            ("x", Operator::DoesNotExist, vec!["a".to_string()]),
        ] {
            assert!(
                matches!(
                    Requirement::new(key, operator, values.clone()),
                    Err(SelectorError::Invalid(..))
                ),
                "{key} {operator:?} {values:?}"
            );
        }
    }

    #[test]
    fn add_returns_a_new_selector() {
        let selector = Selector::parse("x=y").unwrap();
        let extended = selector.add(Requirement::new("z", Operator::Exists, Vec::new()).unwrap());
        assert_eq!(selector.to_string(), "x=y");
        assert_eq!(extended.to_string(), "x=y,z");
        assert_eq!(extended.sql().0, "`x` = ? and `z` NOT NULL");
        let built = Selector::default().add(
            Requirement::new("tag", Operator::NotIn, vec!["b".into(), "a".into()]).unwrap(),
        );
        assert_eq!(built, Selector::parse("tag notin (b,a)").unwrap());
    }
}
