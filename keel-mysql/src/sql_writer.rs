use keel_core::{ColumnDef, ColumnSet, DataKind, SqlWriter};
use std::fmt::Write;

const VARCHAR_MAX: u64 = 65_535;
const MEDIUM_MAX: u64 = 16_777_215;
/// Default width of a string column.
const DEFAULT_SIZE: u64 = 256;
/// Default width of an indexed string column (utf8mb4 key prefix limit).
const DEFAULT_KEY_SIZE: u64 = 191;
const DEFAULT_TIME_PRECISION: u32 = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlSqlWriter {}

impl MySqlSqlWriter {
    fn write_integer(out: &mut String, column: &ColumnDef) {
        out.push_str(match column.bits {
            1..=8 => "tinyint",
            9..=16 => "smallint",
            17..=24 => "mediumint",
            25..=32 => "int",
            _ => "bigint",
        });
        if column.kind == DataKind::Uint {
            out.push_str(" unsigned");
        }
        if column.auto_increment {
            out.push_str(" AUTO_INCREMENT");
        }
    }
}

impl SqlWriter for MySqlSqlWriter {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn write_null_check(&self, out: &mut String, column: &str, is_null: bool) {
        self.write_identifier_quoted(out, column);
        out.push_str(if is_null { " IS NULL" } else { " IS NOT NULL" });
    }

    fn write_column_type(&self, out: &mut String, column: &ColumnDef) {
        if let Some(value) = &column.type_override {
            out.push_str(value);
            return;
        }
        match column.kind {
            DataKind::Bool => out.push_str("boolean"),
            DataKind::Int | DataKind::Uint => Self::write_integer(out, column),
            DataKind::Float => match (column.precision, column.scale) {
                (Some(precision), scale) => {
                    let _ = write!(out, "decimal({},{})", precision, scale.unwrap_or(0));
                }
                _ if column.bits == 32 => out.push_str("float"),
                _ => out.push_str("double"),
            },
            DataKind::String => {
                let size = column.size.unwrap_or(if column.is_key() {
                    DEFAULT_KEY_SIZE
                } else {
                    DEFAULT_SIZE
                });
                match size {
                    0..VARCHAR_MAX => {
                        let _ = write!(out, "varchar({})", size);
                    }
                    VARCHAR_MAX..=MEDIUM_MAX => out.push_str("mediumtext"),
                    _ => out.push_str("longtext"),
                }
            }
            DataKind::Time if column.is_unix_time() => Self::write_integer(
                out,
                &ColumnDef {
                    bits: 64,
                    auto_increment: false,
                    ..column.clone()
                },
            ),
            DataKind::Time => {
                let _ = write!(
                    out,
                    "datetime({})",
                    column.precision.unwrap_or(DEFAULT_TIME_PRECISION).min(6)
                );
            }
            DataKind::Bytes => match column.size {
                Some(size) if !column.json && size < VARCHAR_MAX => {
                    let _ = write!(out, "varbinary({})", size);
                }
                Some(size) if !column.json && size <= MEDIUM_MAX => out.push_str("mediumblob"),
                _ => out.push_str("longblob"),
            },
        }
    }

    fn write_column_extras(&self, out: &mut String, column: &ColumnDef) {
        if let Some(comment) = &column.comment {
            out.push_str(" COMMENT ");
            self.write_value_string(out, comment);
        }
    }

    fn write_create_table_options(&self, out: &mut String, columns: &ColumnSet) {
        if let Some(start) = columns
            .auto_increment()
            .and_then(|v| v.auto_increment_start)
            .filter(|v| *v > 1)
        {
            let _ = write!(out, " AUTO_INCREMENT = {}", start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use keel_core::{IndexDef, TimeEncoding};

    fn column(name: &str, kind: DataKind, bits: u8) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            kind,
            bits,
            ..Default::default()
        }
    }

    #[test]
    fn types() {
        let writer = MySqlSqlWriter {};
        let cases = [
            (column("a", DataKind::Bool, 1), "boolean"),
            (column("a", DataKind::Int, 8), "tinyint"),
            (column("a", DataKind::Uint, 16), "smallint unsigned"),
            (column("a", DataKind::Int, 32), "int"),
            (column("a", DataKind::Uint, 64), "bigint unsigned"),
            (
                ColumnDef {
                    auto_increment: true,
                    ..column("a", DataKind::Int, 64)
                },
                "bigint AUTO_INCREMENT",
            ),
            (column("a", DataKind::Float, 32), "float"),
            (column("a", DataKind::Float, 64), "double"),
            (
                ColumnDef {
                    precision: Some(10),
                    scale: Some(2),
                    ..column("a", DataKind::Float, 64)
                },
                "decimal(10,2)",
            ),
            (column("a", DataKind::String, 0), "varchar(256)"),
            (
                ColumnDef {
                    index: Some(IndexDef::default()),
                    ..column("a", DataKind::String, 0)
                },
                "varchar(191)",
            ),
            (
                ColumnDef {
                    size: Some(65_535),
                    ..column("a", DataKind::String, 0)
                },
                "mediumtext",
            ),
            (
                ColumnDef {
                    size: Some(1 << 24),
                    ..column("a", DataKind::String, 0)
                },
                "longtext",
            ),
            (column("a", DataKind::Time, 0), "datetime(3)"),
            (
                ColumnDef {
                    auto_update_time: Some(TimeEncoding::UnixNano),
                    ..column("a", DataKind::Time, 0)
                },
                "bigint",
            ),
            (column("a", DataKind::Bytes, 0), "longblob"),
            (
                ColumnDef {
                    size: Some(16),
                    ..column("a", DataKind::Bytes, 0)
                },
                "varbinary(16)",
            ),
            (
                ColumnDef {
                    size: Some(100_000),
                    ..column("a", DataKind::Bytes, 0)
                },
                "mediumblob",
            ),
            (
                ColumnDef {
                    json: true,
                    size: Some(16),
                    ..column("a", DataKind::Bytes, 0)
                },
                "longblob",
            ),
        ];
        for (column, expected) in cases {
            assert_eq!(writer.column_type(&column), expected, "{:?}", column);
        }
    }

    #[test]
    fn create_table() {
        let writer = MySqlSqlWriter {};
        let mut id = ColumnDef {
            primary_key: true,
            auto_increment: true,
            auto_increment_start: Some(1000),
            ..column("id", DataKind::Uint, 64)
        };
        id.sql_type = writer.column_type(&id);
        let mut name = ColumnDef {
            size: Some(64),
            unique: true,
            comment: Some("Display name, it's unique".into()),
            ..column("name", DataKind::String, 0)
        };
        name.sql_type = writer.column_type(&name);
        let columns = ColumnSet::new(vec![id, name]);
        let mut out = String::new();
        writer.write_create_table(&mut out, "users", &columns, true);
        assert_eq!(
            out,
            indoc! {"
                CREATE TABLE IF NOT EXISTS `users` (
                    `id` bigint unsigned AUTO_INCREMENT NOT NULL,
                    `name` varchar(64) UNIQUE COMMENT 'Display name, it''s unique',
                    PRIMARY KEY (`id`)
                ) AUTO_INCREMENT = 1000;"}
        );
    }

    #[test]
    fn null_check() {
        let writer = MySqlSqlWriter {};
        let mut out = String::new();
        writer.write_null_check(&mut out, "a", false);
        out.push_str(", ");
        writer.write_null_check(&mut out, "b", true);
        assert_eq!(out, "`a` IS NOT NULL, `b` IS NULL");
    }
}
