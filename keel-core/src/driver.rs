use crate::{
    AsValue, ColumnDef, ColumnSet, Connection, Context, Error, Executor, Prepared, Query, Result,
    RowLabeled, SqlWriter, Statement, Transaction, stream::TryStreamExt, truncate_long,
};
use std::{fmt::Debug, future::Future, pin::pin, sync::Arc};

/// Live column as reported by the database catalog.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnType {
    pub name: String,
    /// Lower case type name without parameters (`varchar`, `integer`, ...).
    pub database_type: String,
    /// Declared width, when the type has one.
    pub length: Option<u64>,
    pub nullable: bool,
}

impl ColumnType {
    /// Builds the column from a row of [`SqlWriter::column_types_query`].
    pub fn from_row(row: &RowLabeled) -> Result<Self> {
        let get = |label: &str| {
            row.get_column(label)
                .cloned()
                .ok_or_else(|| Error::msg(format!("The catalog row has no column `{label}`")))
        };
        let name = String::try_from_value(get("name")?)?;
        let declared = String::try_from_value(get("type")?)?.to_lowercase();
        let (database_type, parameters) = match declared.split_once('(') {
            Some((base, rest)) => (base.trim().to_string(), Some(rest)),
            None => (declared.trim().to_string(), None),
        };
        let mut length = match row.get_column("length") {
            Some(v) => Option::<u64>::try_from_value(v.clone())?,
            None => None,
        };
        if length.is_none() {
            length = parameters.and_then(|v| {
                v.split([',', ')'])
                    .next()
                    .and_then(|v| v.trim().parse().ok())
            });
        }
        let nullable = bool::try_from_value(get("nullable")?)?;
        Ok(Self {
            name,
            database_type,
            length,
            nullable,
        })
    }

    /// Variable or fixed width character and binary types.
    pub fn has_width(&self) -> bool {
        matches!(
            self.database_type.as_str(),
            "varchar" | "char" | "varbinary" | "binary"
        )
    }
}

async fn run_ddl<E: Executor>(executor: &mut E, sql: String) -> Result<()> {
    log::debug!("{}", truncate_long!(sql));
    let context = format!("While running the statement:\n{}", truncate_long!(sql));
    executor
        .execute(Query::Raw(sql))
        .await
        .map(|_| ())
        .context(context)
}

async fn fetch_rows<E: Executor>(
    executor: &mut E,
    statement: Statement,
) -> Result<Vec<RowLabeled>> {
    let context = format!("While running the query:\n{}", statement);
    executor
        .fetch_statement(statement)
        .try_collect()
        .await
        .context(context)
}

async fn has_rows<E: Executor>(executor: &mut E, statement: Statement) -> Result<bool> {
    let context = format!("While running the query:\n{}", statement);
    let mut stream = pin!(executor.fetch_statement(statement));
    Ok(stream.try_next().await.context(context)?.is_some())
}

/// A database backend.
///
/// Besides the associated connection types, a driver carries the executed
/// schema operations. They all have default implementations built on the
/// dialect [`SqlWriter`], backends override what their engine cannot do
/// through plain DDL.
///
/// ```rust,ignore
/// let driver = connection.driver().clone();
/// if !driver.has_table(&mut connection, "users").await? {
///     driver.create_table(&mut connection, "users", &columns, false).await?;
/// }
/// ```
pub trait Driver: Debug + Clone + Send + Sync + 'static {
    const NAME: &'static str;
    type Connection: Connection<Driver = Self>;
    type Prepared: Prepared;
    type Transaction<'c>: Transaction<'c, Driver = Self>;

    fn sql_writer(&self) -> Arc<dyn SqlWriter>;

    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Connection>> + Send {
        Self::Connection::connect(url)
    }

    fn create_table<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        columns: &ColumnSet,
        if_not_exists: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut sql = String::new();
            self.sql_writer()
                .write_create_table(&mut sql, table, columns, if_not_exists);
            run_ddl(executor, sql).await
        }
    }

    fn drop_table<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        if_exists: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut sql = String::new();
            self.sql_writer().write_drop_table(&mut sql, table, if_exists);
            run_ddl(executor, sql).await
        }
    }

    fn has_table<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
    ) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let statement = self.sql_writer().has_table_query(table);
            has_rows(executor, statement).await
        }
    }

    fn list_tables<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        async move {
            let statement = self.sql_writer().list_tables_query();
            fetch_rows(executor, statement)
                .await?
                .into_iter()
                .map(|row| {
                    let name = row.values.into_vec().into_iter().next().unwrap_or_default();
                    String::try_from_value(name)
                })
                .collect()
        }
    }

    fn add_column<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        column: &ColumnDef,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut sql = String::new();
            self.sql_writer().write_add_column(&mut sql, table, column);
            run_ddl(executor, sql).await
        }
    }

    fn drop_column<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut sql = String::new();
            self.sql_writer().write_drop_column(&mut sql, table, column);
            run_ddl(executor, sql).await
        }
    }

    fn alter_column<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        column: &ColumnDef,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut sql = String::new();
            self.sql_writer().write_alter_column(&mut sql, table, column);
            run_ddl(executor, sql).await
        }
    }

    fn column_types<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
    ) -> impl Future<Output = Result<Vec<ColumnType>>> + Send {
        async move {
            let statement = self.sql_writer().column_types_query(table);
            fetch_rows(executor, statement)
                .await?
                .iter()
                .map(ColumnType::from_row)
                .collect()
        }
    }

    fn has_column<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<bool>> + Send {
        async move {
            Ok(self
                .column_types(executor, table)
                .await?
                .iter()
                .any(|v| v.name.eq_ignore_ascii_case(column)))
        }
    }

    fn create_index<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        name: &str,
        unique: bool,
        columns: &[&str],
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut sql = String::new();
            self.sql_writer()
                .write_create_index(&mut sql, table, name, unique, columns);
            run_ddl(executor, sql).await
        }
    }

    fn drop_index<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        name: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut sql = String::new();
            self.sql_writer().write_drop_index(&mut sql, table, name);
            run_ddl(executor, sql).await
        }
    }

    fn has_index<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        name: &str,
    ) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let statement = self.sql_writer().has_index_query(table, name);
            has_rows(executor, statement).await
        }
    }

    /// Additive migration: creates the table when missing, otherwise adds the
    /// missing columns and alters the ones whose width or nullability
    /// changed, then creates the missing indexes. Columns are never dropped.
    fn auto_migrate<E: Executor<Driver = Self>>(
        &self,
        executor: &mut E,
        table: &str,
        columns: &ColumnSet,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            if !self.has_table(executor, table).await? {
                log::debug!("Creating the table `{}`", table);
                self.create_table(executor, table, columns, true).await?;
            } else {
                let live = self.column_types(executor, table).await?;
                for column in columns.iter() {
                    let Some(actual) = live
                        .iter()
                        .find(|v| v.name.eq_ignore_ascii_case(&column.name))
                    else {
                        log::debug!("Adding the column `{}` to `{}`", column.name, table);
                        self.add_column(executor, table, column).await?;
                        continue;
                    };
                    let width_changed = actual.has_width()
                        && column.size.is_some()
                        && actual.length.is_some()
                        && column.size != actual.length;
                    let nullability_changed =
                        !column.primary_key && actual.nullable == column.is_not_null();
                    if width_changed || nullability_changed {
                        log::debug!(
                            "Altering the column `{}` of `{}` (width {:?} -> {:?}, nullable {} -> {})",
                            column.name,
                            table,
                            actual.length,
                            column.size,
                            actual.nullable,
                            !column.is_not_null(),
                        );
                        self.alter_column(executor, table, column)
                            .await
                            .with_context(|| {
                                format!("While migrating the column `{}`", column.name)
                            })?;
                    }
                }
            }
            for (name, unique, indexed) in columns.indexes(table) {
                if self.has_index(executor, table, &name).await? {
                    continue;
                }
                let names = indexed.iter().map(|v| v.name.as_str()).collect::<Vec<_>>();
                self.create_index(executor, table, &name, unique, &names)
                    .await?;
            }
            Ok(())
        }
    }
}
