use crate::{ColumnDef, ColumnSet, Statement, Value, format_time, separated_by};
use std::fmt::Write;

/// Dialect specific SQL text.
///
/// Every method has a default producing MySQL flavoured SQL with backtick
/// quoted identifiers, which SQLite accepts as well. Dialects override what
/// differs, most notably [`SqlWriter::write_column_type`].
pub trait SqlWriter: Send + Sync {
    /// Dialect name, the key used by the dialect registry and the column cache.
    fn name(&self) -> &'static str;

    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(out, value, '`', "``");
        out.push('`');
    }

    /// `` `column` IS NULL `` or `` `column` NOT NULL ``.
    fn write_null_check(&self, out: &mut String, column: &str, is_null: bool) {
        self.write_identifier_quoted(out, column);
        out.push_str(if is_null { " IS NULL" } else { " NOT NULL" });
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => out.push_str("NULL"),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int(Some(v)) => drop(write!(out, "{v}")),
            Value::UInt(Some(v)) => drop(write!(out, "{v}")),
            Value::Float(Some(v)) => drop(write!(out, "{v:?}")),
            Value::Varchar(Some(v)) => self.write_value_string(out, v),
            Value::Time(Some(v)) => match format_time(v) {
                Ok(v) => self.write_value_string(out, &v),
                Err(e) => {
                    log::error!("{:#}", e);
                    out.push_str("NULL");
                }
            },
            Value::Blob(Some(v)) => self.write_value_blob(out, v),
            _ => out.push_str("NULL"),
        }
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(if value { "1" } else { "0" });
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        for b in value {
            let _ = write!(out, "{:02X}", b);
        }
        out.push('\'');
    }

    /// Physical type of the column. Without a dialect only an explicit
    /// `type=` override can be emitted.
    fn write_column_type(&self, out: &mut String, column: &ColumnDef) {
        if let Some(value) = &column.type_override {
            out.push_str(value);
        }
    }

    fn column_type(&self, column: &ColumnDef) -> String {
        let mut out = String::new();
        self.write_column_type(&mut out, column);
        out
    }

    /// The primary key is part of the column type rather than a table constraint.
    fn primary_key_inline(&self, _column: &ColumnDef) -> bool {
        false
    }

    /// Type, `NOT NULL`, `UNIQUE`, `DEFAULT` in this order, then dialect extras.
    fn write_column_clause(&self, out: &mut String, column: &ColumnDef) {
        if column.sql_type.is_empty() {
            self.write_column_type(out, column);
        } else {
            out.push_str(&column.sql_type);
        }
        if column.is_not_null() {
            out.push_str(" NOT NULL");
        }
        if column.unique && !column.primary_key {
            out.push_str(" UNIQUE");
        }
        self.write_column_default(out, column);
        self.write_column_extras(out, column);
    }

    fn write_column_default(&self, out: &mut String, column: &ColumnDef) {
        match (&column.default_value, &column.default) {
            (Some(value), _) => {
                out.push_str(" DEFAULT ");
                self.write_value(out, value);
            }
            (None, Some(raw)) if !raw.trim().is_empty() => {
                out.push_str(" DEFAULT ");
                out.push_str(raw.trim());
            }
            _ => {}
        }
    }

    fn write_column_extras(&self, _out: &mut String, _column: &ColumnDef) {}

    fn write_column_definition(&self, out: &mut String, column: &ColumnDef) {
        self.write_identifier_quoted(out, &column.name);
        out.push(' ');
        self.write_column_clause(out, column);
    }

    fn write_create_table(
        &self,
        out: &mut String,
        table: &str,
        columns: &ColumnSet,
        if_not_exists: bool,
    ) {
        out.push_str("CREATE TABLE ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_identifier_quoted(out, table);
        out.push_str(" (\n");
        separated_by(
            out,
            columns.iter(),
            |out, v| {
                out.push_str("    ");
                self.write_column_definition(out, v);
            },
            ",\n",
        );
        let primary_key = columns
            .primary_key()
            .filter(|v| !self.primary_key_inline(v))
            .collect::<Vec<_>>();
        if !primary_key.is_empty() {
            out.push_str(",\n    PRIMARY KEY (");
            separated_by(
                out,
                primary_key,
                |out, v| self.write_identifier_quoted(out, &v.name),
                ", ",
            );
            out.push(')');
        }
        out.push_str("\n)");
        self.write_create_table_options(out, columns);
        out.push(';');
        self.write_after_create_table(out, table, columns);
    }

    fn write_create_table_options(&self, _out: &mut String, _columns: &ColumnSet) {}

    /// Statements executed right after the table is created.
    fn write_after_create_table(&self, _out: &mut String, _table: &str, _columns: &ColumnSet) {}

    fn write_drop_table(&self, out: &mut String, table: &str, if_exists: bool) {
        out.push_str("DROP TABLE ");
        if if_exists {
            out.push_str("IF EXISTS ");
        }
        self.write_identifier_quoted(out, table);
        out.push(';');
    }

    fn write_add_column(&self, out: &mut String, table: &str, column: &ColumnDef) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" ADD COLUMN ");
        self.write_column_definition(out, column);
        out.push(';');
    }

    fn write_drop_column(&self, out: &mut String, table: &str, column: &str) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" DROP COLUMN ");
        self.write_identifier_quoted(out, column);
        out.push(';');
    }

    fn write_alter_column(&self, out: &mut String, table: &str, column: &ColumnDef) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" MODIFY COLUMN ");
        self.write_column_definition(out, column);
        out.push(';');
    }

    fn write_create_index(
        &self,
        out: &mut String,
        table: &str,
        name: &str,
        unique: bool,
        columns: &[&str],
    ) {
        out.push_str("CREATE ");
        if unique {
            out.push_str("UNIQUE ");
        }
        out.push_str("INDEX ");
        self.write_identifier_quoted(out, name);
        out.push_str(" ON ");
        self.write_identifier_quoted(out, table);
        out.push_str(" (");
        separated_by(
            out,
            columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str(");");
    }

    fn write_drop_index(&self, out: &mut String, table: &str, name: &str) {
        out.push_str("DROP INDEX ");
        self.write_identifier_quoted(out, name);
        out.push_str(" ON ");
        self.write_identifier_quoted(out, table);
        out.push(';');
    }

    /// Returns one row when the table exists.
    fn has_table_query(&self, table: &str) -> Statement {
        Statement::with_args(
            "SELECT table_name AS name FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
            [table.into()],
        )
    }

    /// One row per table, column `name`.
    fn list_tables_query(&self) -> Statement {
        Statement::new(
            "SELECT table_name AS name FROM information_schema.tables WHERE table_schema = DATABASE() ORDER BY table_name",
        )
    }

    /// One row per column with the labels `name`, `type`, `length` (optional,
    /// otherwise read from the type) and `nullable`.
    fn column_types_query(&self, table: &str) -> Statement {
        Statement::with_args(
            "SELECT column_name AS name, data_type AS type, character_maximum_length AS length, is_nullable = 'YES' AS nullable FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = ? ORDER BY ordinal_position",
            [table.into()],
        )
    }

    /// Returns one row when the index exists.
    fn has_index_query(&self, table: &str, name: &str) -> Statement {
        Statement::with_args(
            "SELECT index_name AS name FROM information_schema.statistics WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ? LIMIT 1",
            [table.into(), name.into()],
        )
    }

    /// The live `CREATE TABLE` text, for dialects that keep it.
    fn table_ddl_query(&self, _table: &str) -> Option<Statement> {
        None
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }
}

/// Writer used for unregistered dialects: no physical type translation.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericSqlWriter;

impl SqlWriter for GenericSqlWriter {
    fn name(&self) -> &'static str {
        "generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataKind, IndexDef};
    use indoc::indoc;

    fn column(name: &str) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            kind: DataKind::Int,
            type_override: Some("integer".into()),
            ..Default::default()
        }
    }

    #[test]
    fn quoting() {
        let writer = GenericSqlWriter;
        let mut out = String::new();
        writer.write_identifier_quoted(&mut out, "we`ird");
        out.push(' ');
        writer.write_value_string(&mut out, "it's");
        out.push(' ');
        writer.write_value_blob(&mut out, &[0, 171]);
        assert_eq!(out, "`we``ird` 'it''s' X'00AB'");
    }

    #[test]
    fn generic_types_are_not_translated() {
        let writer = GenericSqlWriter;
        let plain = ColumnDef {
            name: "a".into(),
            kind: DataKind::String,
            ..Default::default()
        };
        assert_eq!(writer.column_type(&plain), "");
        assert_eq!(writer.column_type(&column("b")), "integer");
    }

    #[test]
    fn column_clause_order() {
        let writer = GenericSqlWriter;
        let column = ColumnDef {
            not_null: true,
            unique: true,
            default: Some("5".into()),
            default_value: Some(Value::Int(Some(5))),
            ..column("count")
        };
        let mut out = String::new();
        writer.write_column_clause(&mut out, &column);
        assert_eq!(out, "integer NOT NULL UNIQUE DEFAULT 5");

        let column = ColumnDef {
            default: Some("CURRENT_TIMESTAMP()".into()),
            ..self::column("stamp")
        };
        let mut out = String::new();
        writer.write_column_clause(&mut out, &column);
        assert_eq!(out, "integer DEFAULT CURRENT_TIMESTAMP()");
    }

    #[test]
    fn create_table() {
        let writer = GenericSqlWriter;
        let columns = ColumnSet::new(vec![
            ColumnDef {
                primary_key: true,
                ..column("id")
            },
            ColumnDef {
                index: Some(IndexDef::default()),
                ..column("value")
            },
        ]);
        let mut out = String::new();
        writer.write_create_table(&mut out, "things", &columns, true);
        assert_eq!(
            out,
            indoc! {"
                CREATE TABLE IF NOT EXISTS `things` (
                    `id` integer NOT NULL,
                    `value` integer,
                    PRIMARY KEY (`id`)
                );"}
        );
        let mut out = String::new();
        writer.write_create_index(&mut out, "things", "idx_things_value", true, &["value"]);
        assert_eq!(
            out,
            "CREATE UNIQUE INDEX `idx_things_value` ON `things` (`value`);"
        );
    }
}
