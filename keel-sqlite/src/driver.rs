use crate::{
    SqliteConnection, SqlitePrepared, SqliteTransaction, ddl::TableDdl,
    sql_writer::SqliteSqlWriter,
};
use keel_core::{
    AsValue, ColumnDef, Context, Driver, Error, Executor, Query, Result, SqlWriter, Statement,
    dialect, fetch_one, register_dialect, stream::TryStreamExt, truncate_long,
};
use std::sync::{Arc, Once};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver {}

impl SqliteDriver {
    pub const fn new() -> Self {
        Self {}
    }

    /// Makes the SQLite writer available in the dialect registry.
    pub fn register() {
        static REGISTER: Once = Once::new();
        REGISTER.call_once(|| register_dialect(Self::NAME, Arc::new(SqliteSqlWriter {})));
    }
}

enum Change {
    Replace { column: String, definition: String },
    Remove(String),
}

async fn execute<E: Executor<Driver = SqliteDriver>>(executor: &mut E, sql: String) -> Result<()> {
    log::debug!("{}", truncate_long!(sql));
    let context = format!("While running the statement:\n{}", truncate_long!(sql));
    executor
        .execute(Query::Raw(sql))
        .await
        .map(|_| ())
        .context(context)
}

async fn fetch_texts<E: Executor<Driver = SqliteDriver>>(
    executor: &mut E,
    statement: Statement,
) -> Result<Vec<String>> {
    let context = format!("While running the query:\n{}", statement);
    executor
        .fetch_statement(statement)
        .and_then(|row| async move {
            let value = row.values.into_vec().into_iter().next().unwrap_or_default();
            String::try_from_value(value)
        })
        .try_collect()
        .await
        .context(context)
}

/// True when the column list of an index definition names `column`.
fn index_uses(ddl: &str, column: &str) -> bool {
    let Some((_, columns)) = ddl.split_once('(') else {
        return false;
    };
    columns
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|v| v.eq_ignore_ascii_case(column))
}

impl SqliteDriver {
    /// SQLite cannot alter or drop a column in place: the table is recreated
    /// with the edited definition and the data copied over.
    async fn rebuild_table<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        change: Change,
    ) -> Result<()> {
        let writer = self.sql_writer();
        let Some(query) = writer.table_ddl_query(table) else {
            return Err(Error::msg("The dialect does not expose the table definitions"));
        };
        let Some(source) = fetch_texts(executor, query).await?.into_iter().next() else {
            return Err(Error::msg(format!("Table `{}` does not exist", table)));
        };
        let mut ddl = TableDdl::parse(&source)?;
        let before = ddl.column_names();
        let dropped = match change {
            Change::Replace { column, definition } => {
                ddl.replace_column(&column, definition)?;
                None
            }
            Change::Remove(column) => {
                ddl.remove_column(&column)?;
                Some(column)
            }
        };
        let after = ddl.column_names();
        let copied = before
            .iter()
            .filter(|v| after.iter().any(|a| a.eq_ignore_ascii_case(v)))
            .collect::<Vec<_>>();
        let indexes = fetch_texts(
            executor,
            Statement::with_args(
                "SELECT sql FROM sqlite_master \
                 WHERE type = 'index' AND tbl_name = ? AND sql IS NOT NULL",
                [table.into()],
            ),
        )
        .await?;
        // Dropping the original table also deletes its counter
        let sequence = if source.to_ascii_uppercase().contains("AUTOINCREMENT") {
            fetch_one::<i64, _>(
                executor,
                Statement::with_args(
                    "SELECT seq FROM sqlite_sequence WHERE name = ?",
                    [table.into()],
                ),
            )
            .await?
        } else {
            None
        };

        let temp = format!("{}__temp", table);
        let mut quoted_table = String::new();
        writer.write_identifier_quoted(&mut quoted_table, table);
        let mut quoted_temp = String::new();
        writer.write_identifier_quoted(&mut quoted_temp, &temp);
        let mut list = String::new();
        for (i, column) in copied.iter().enumerate() {
            if i > 0 {
                list.push_str(", ");
            }
            writer.write_identifier_quoted(&mut list, column);
        }

        log::debug!("Rebuilding the table `{}`", table);
        execute(executor, format!("DROP TABLE IF EXISTS {};", quoted_temp)).await?;
        execute(executor, ddl.render(&quoted_temp)).await?;
        execute(
            executor,
            format!(
                "INSERT INTO {} ({}) SELECT {} FROM {};",
                quoted_temp, list, list, quoted_table
            ),
        )
        .await?;
        execute(executor, format!("DROP TABLE {};", quoted_table)).await?;
        execute(
            executor,
            format!("ALTER TABLE {} RENAME TO {};", quoted_temp, quoted_table),
        )
        .await?;
        for index in indexes {
            if let Some(column) = &dropped {
                if index_uses(&index, column) {
                    log::debug!("Index dropped with the column `{}`: {}", column, index);
                    continue;
                }
            }
            execute(executor, index).await?;
        }
        if let Some(sequence) = sequence {
            log::debug!("Restoring the sequence of `{}` to {}", table, sequence);
            executor
                .execute_statement(Statement::with_args(
                    "DELETE FROM sqlite_sequence WHERE name = ?",
                    [table.into()],
                ))
                .await
                .context("While clearing the sequence of the rebuilt table")?;
            executor
                .execute_statement(Statement::with_args(
                    "INSERT INTO sqlite_sequence (name, seq) VALUES (?, ?)",
                    [table.into(), sequence.as_value()],
                ))
                .await
                .context("While restoring the sequence of the rebuilt table")?;
        }
        Ok(())
    }
}

impl Driver for SqliteDriver {
    const NAME: &'static str = "sqlite";
    type Connection = SqliteConnection;
    type Prepared = SqlitePrepared;
    type Transaction<'c> = SqliteTransaction<'c>;

    fn sql_writer(&self) -> Arc<dyn SqlWriter> {
        Self::register();
        dialect(Self::NAME)
    }

    async fn drop_column<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        column: &str,
    ) -> Result<()> {
        self.rebuild_table(executor, table, Change::Remove(column.to_string()))
            .await
            .with_context(|| format!("While dropping the column `{}` of `{}`", column, table))
    }

    async fn alter_column<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        column: &ColumnDef,
    ) -> Result<()> {
        let mut definition = String::new();
        self.sql_writer()
            .write_column_definition(&mut definition, column);
        let change = Change::Replace {
            column: column.name.clone(),
            definition,
        };
        self.rebuild_table(executor, table, change)
            .await
            .with_context(|| format!("While altering the column `{}` of `{}`", column.name, table))
    }
}

#[cfg(test)]
mod tests {
    use super::index_uses;

    #[test]
    fn index_columns() {
        let ddl = "CREATE UNIQUE INDEX `idx_people_name` ON `people` (`name`, \"age\")";
        assert!(index_uses(ddl, "name"));
        assert!(index_uses(ddl, "AGE"));
        assert!(!index_uses(ddl, "people"));
        assert!(!index_uses(ddl, "nam"));
    }
}
