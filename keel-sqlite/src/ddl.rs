//! Textual rewriting of a `CREATE TABLE` statement, the only way to change
//! or remove a column definition in SQLite.

use keel_core::{Error, Result, truncate_long};

/// A `CREATE TABLE` statement split into its top level clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    /// Column definitions and table constraints, trimmed.
    pub clauses: Vec<String>,
    /// Text after the closing parenthesis (`WITHOUT ROWID`, `STRICT`).
    pub options: String,
}

const CONSTRAINTS: &[&str] = &["constraint", "primary", "unique", "check", "foreign"];

impl TableDdl {
    pub fn parse(ddl: &str) -> Result<Self> {
        let open = ddl.find('(').ok_or_else(|| {
            Error::msg(format!(
                "Missing the column list in `{}`",
                truncate_long!(ddl)
            ))
        })?;
        let body = &ddl[open + 1..];
        let parts = split_top_level(body)?;
        let Some((last, clauses)) = parts.split_last() else {
            return Err(Error::msg(format!(
                "Missing the closing parenthesis in `{}`",
                truncate_long!(ddl)
            )));
        };
        Ok(Self {
            clauses: clauses.iter().map(|v| v.trim().to_string()).collect(),
            options: last.trim().trim_end_matches(';').trim().to_string(),
        })
    }

    /// Column name defined by the clause at `index`, `None` for table
    /// constraints.
    pub fn column_name(&self, index: usize) -> Option<String> {
        column_name(self.clauses.get(index)?)
    }

    pub fn column_names(&self) -> Vec<String> {
        (0..self.clauses.len())
            .filter_map(|i| self.column_name(i))
            .collect()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        (0..self.clauses.len()).find(|i| {
            self.column_name(*i)
                .is_some_and(|v| v.eq_ignore_ascii_case(column))
        })
    }

    /// Replaces the definition of `column` with `definition`.
    pub fn replace_column(&mut self, column: &str, definition: String) -> Result<()> {
        let index = self.position(column).ok_or_else(|| missing(column))?;
        self.clauses[index] = definition;
        Ok(())
    }

    pub fn remove_column(&mut self, column: &str) -> Result<()> {
        let index = self.position(column).ok_or_else(|| missing(column))?;
        self.clauses.remove(index);
        Ok(())
    }

    /// `CREATE TABLE <table> (...)<options>` with the current clauses.
    pub fn render(&self, table: &str) -> String {
        let mut out = String::from("CREATE TABLE ");
        out.push_str(table);
        out.push_str(" (\n    ");
        out.push_str(&self.clauses.join(",\n    "));
        out.push_str("\n)");
        if !self.options.is_empty() {
            out.push(' ');
            out.push_str(&self.options);
        }
        out
    }
}

fn missing(column: &str) -> Error {
    Error::msg(format!("Column `{}` not found in the table definition", column))
}

/// Splits at the commas outside parentheses and quotes. The text after the
/// parenthesis closing the column list is the last item.
fn split_top_level(body: &str) -> Result<Vec<&str>> {
    let mut result = Vec::new();
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                // doubled quote is an escaped quote
                if chars.peek().is_some_and(|(_, n)| *n == q) && q != ']' {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '[' => quote = Some(']'),
            '(' => depth += 1,
            ')' if depth == 0 => {
                result.push(&body[start..i]);
                result.push(&body[i + 1..]);
                return Ok(result);
            }
            ')' => depth -= 1,
            ',' if depth == 0 => {
                result.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    Err(Error::msg(format!(
        "Unbalanced table definition `{}`",
        truncate_long!(body)
    )))
}

fn column_name(clause: &str) -> Option<String> {
    let clause = clause.trim_start();
    let first = clause.chars().next()?;
    let close = match first {
        '`' | '"' | '\'' => first,
        '[' => ']',
        _ => {
            let word = clause
                .split(|c: char| c.is_whitespace() || c == '(')
                .next()
                .unwrap_or_default();
            if CONSTRAINTS.iter().any(|v| word.eq_ignore_ascii_case(v)) {
                return None;
            }
            return Some(word.to_string());
        }
    };
    let mut name = String::new();
    let mut chars = clause[first.len_utf8()..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == close {
            if close != ']' && chars.peek() == Some(&close) {
                chars.next();
                name.push(c);
                continue;
            }
            return Some(name);
        }
        name.push(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const DDL: &str = indoc! {"
        CREATE TABLE `people` (
            `id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,
            `name` varchar(64) NOT NULL DEFAULT 'a, (b)',
            \"odd `` name\" decimal(10, 2),
            [age] integer,
            note text CHECK (length(note) < 10),
            UNIQUE (`name`, [age])
        ) WITHOUT ROWID;"};

    #[test]
    fn split() {
        let ddl = TableDdl::parse(DDL).unwrap();
        assert_eq!(ddl.clauses.len(), 6);
        assert_eq!(
            ddl.clauses[1],
            "`name` varchar(64) NOT NULL DEFAULT 'a, (b)'"
        );
        assert_eq!(ddl.clauses[2], "\"odd `` name\" decimal(10, 2)");
        assert_eq!(ddl.options, "WITHOUT ROWID");
        assert_eq!(
            ddl.column_names(),
            vec!["id", "name", "odd `` name", "age", "note"]
        );
        assert_eq!(ddl.column_name(5), None);
    }

    #[test]
    fn rewrite() {
        let mut ddl = TableDdl::parse(DDL).unwrap();
        ddl.replace_column("NAME", "`name` varchar(128)".into())
            .unwrap();
        ddl.remove_column("note").unwrap();
        assert!(ddl.remove_column("missing").is_err());
        assert_eq!(
            ddl.render("`people__temp`"),
            indoc! {"
                CREATE TABLE `people__temp` (
                    `id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,
                    `name` varchar(128),
                    \"odd `` name\" decimal(10, 2),
                    [age] integer,
                    UNIQUE (`name`, [age])
                ) WITHOUT ROWID"}
        );
    }

    #[test]
    fn malformed() {
        assert!(TableDdl::parse("CREATE TABLE t").is_err());
        assert!(TableDdl::parse("CREATE TABLE t (a integer, b text").is_err());
        assert!(TableDdl::parse("CREATE TABLE t (a text DEFAULT ')").is_err());
    }
}
