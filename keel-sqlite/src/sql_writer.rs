use keel_core::{ColumnDef, ColumnSet, DataKind, SqlWriter, Statement};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqliteSqlWriter {
    fn is_rowid_alias(column: &ColumnDef) -> bool {
        column.primary_key && column.auto_increment
    }
}

impl SqlWriter for SqliteSqlWriter {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_column_type(&self, out: &mut String, column: &ColumnDef) {
        if let Some(value) = &column.type_override {
            out.push_str(value);
            return;
        }
        match column.kind {
            DataKind::Bool => out.push_str("numeric"),
            DataKind::Int | DataKind::Uint => {
                out.push_str("integer");
                if Self::is_rowid_alias(column) {
                    out.push_str(" PRIMARY KEY AUTOINCREMENT");
                }
            }
            DataKind::Float => match (column.precision, column.scale) {
                (Some(precision), scale) => {
                    let _ = write!(out, "decimal({},{})", precision, scale.unwrap_or(0));
                }
                _ => out.push_str("real"),
            },
            DataKind::String => match column.size {
                Some(size) if !column.json => {
                    let _ = write!(out, "varchar({})", size);
                }
                _ => out.push_str("text"),
            },
            DataKind::Time if column.is_unix_time() => out.push_str("integer"),
            DataKind::Time => out.push_str("datetime"),
            DataKind::Bytes => out.push_str("blob"),
        }
    }

    fn primary_key_inline(&self, column: &ColumnDef) -> bool {
        Self::is_rowid_alias(column) && column.type_override.is_none()
    }

    fn write_after_create_table(&self, out: &mut String, table: &str, columns: &ColumnSet) {
        let Some(start) = columns
            .auto_increment()
            .filter(|v| self.primary_key_inline(v))
            .and_then(|v| v.auto_increment_start)
            .filter(|v| *v > 1)
        else {
            return;
        };
        out.push_str("\nINSERT INTO sqlite_sequence (name, seq) SELECT ");
        self.write_value_string(out, table);
        let _ = write!(
            out,
            ", {} WHERE NOT EXISTS (SELECT 1 FROM sqlite_sequence WHERE name = ",
            start - 1
        );
        self.write_value_string(out, table);
        out.push_str(");");
    }

    fn write_drop_index(&self, out: &mut String, _table: &str, name: &str) {
        out.push_str("DROP INDEX IF EXISTS ");
        self.write_identifier_quoted(out, name);
        out.push(';');
    }

    fn has_table_query(&self, table: &str) -> Statement {
        Statement::with_args(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table.into()],
        )
    }

    fn list_tables_query(&self) -> Statement {
        Statement::new(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
    }

    fn column_types_query(&self, table: &str) -> Statement {
        Statement::with_args(
            "SELECT name, type, \"notnull\" = 0 AS nullable FROM pragma_table_info(?) ORDER BY cid",
            [table.into()],
        )
    }

    fn has_index_query(&self, table: &str, name: &str) -> Statement {
        Statement::with_args(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ? AND name = ?",
            [table.into(), name.into()],
        )
    }

    fn table_ddl_query(&self, table: &str) -> Option<Statement> {
        Some(Statement::with_args(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table.into()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use keel_core::{IndexDef, TimeEncoding};

    fn column(name: &str, kind: DataKind) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    #[test]
    fn types() {
        let writer = SqliteSqlWriter {};
        let cases = [
            (column("a", DataKind::Bool), "numeric"),
            (column("a", DataKind::Uint), "integer"),
            (column("a", DataKind::Float), "real"),
            (
                ColumnDef {
                    precision: Some(10),
                    scale: Some(2),
                    ..column("a", DataKind::Float)
                },
                "decimal(10,2)",
            ),
            (column("a", DataKind::String), "text"),
            (
                ColumnDef {
                    size: Some(64),
                    ..column("a", DataKind::String)
                },
                "varchar(64)",
            ),
            (column("a", DataKind::Time), "datetime"),
            (
                ColumnDef {
                    auto_create_time: Some(TimeEncoding::UnixMilli),
                    ..column("a", DataKind::Time)
                },
                "integer",
            ),
            (column("a", DataKind::Bytes), "blob"),
            (
                ColumnDef {
                    type_override: Some("char(2)".into()),
                    ..column("a", DataKind::Int)
                },
                "char(2)",
            ),
        ];
        for (column, expected) in cases {
            assert_eq!(writer.column_type(&column), expected, "{:?}", column);
        }
    }

    #[test]
    fn create_table() {
        let writer = SqliteSqlWriter {};
        let columns = ColumnSet::new(vec![
            ColumnDef {
                primary_key: true,
                auto_increment: true,
                auto_increment_start: Some(100),
                ..column("id", DataKind::Int)
            },
            ColumnDef {
                size: Some(32),
                not_null: true,
                index: Some(IndexDef::default()),
                ..column("name", DataKind::String)
            },
        ]);
        let mut out = String::new();
        writer.write_create_table(&mut out, "people", &columns, false);
        assert_eq!(
            out,
            indoc! {"
                CREATE TABLE `people` (
                    `id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,
                    `name` varchar(32) NOT NULL
                );
                INSERT INTO sqlite_sequence (name, seq) SELECT 'people', 99 WHERE NOT EXISTS (SELECT 1 FROM sqlite_sequence WHERE name = 'people');"}
        );
    }

    #[test]
    fn composite_primary_key() {
        let writer = SqliteSqlWriter {};
        let columns = ColumnSet::new(vec![
            ColumnDef {
                primary_key: true,
                ..column("a", DataKind::Int)
            },
            ColumnDef {
                primary_key: true,
                ..column("b", DataKind::String)
            },
        ]);
        let mut out = String::new();
        writer.write_create_table(&mut out, "pairs", &columns, true);
        assert_eq!(
            out,
            indoc! {"
                CREATE TABLE IF NOT EXISTS `pairs` (
                    `a` integer NOT NULL,
                    `b` text NOT NULL,
                    PRIMARY KEY (`a`, `b`)
                );"}
        );
    }
}
