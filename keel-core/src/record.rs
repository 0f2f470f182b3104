use crate::{
    ColumnCache, ColumnSet, Context, DataKind, Driver, Executor, NotFound, QueryOptions, Result,
    Rows, RowsAffected, SqlWriter, Statement, Value,
    binder::{self, FromRow, logged},
    generator::{gen_delete_sql, gen_get_sql, gen_insert_sql, gen_list_sql, gen_update_sql},
    snake_case,
};
use std::{future::Future, sync::Arc};

/// Compile time description of a record struct, emitted by
/// `#[derive(Record)]`.
#[derive(Debug)]
pub struct Shape {
    /// Rust name of the struct.
    pub name: &'static str,
    /// Table override from `#[keel(table = "...")]`, empty when absent.
    pub table: &'static str,
    pub fields: &'static [FieldDef],
}

impl Shape {
    pub fn table_name(&self) -> String {
        if self.table.is_empty() {
            snake_case(self.name)
        } else {
            self.table.to_string()
        }
    }
}

/// One registered field of a [`Shape`].
#[derive(Debug)]
pub struct FieldDef {
    pub ident: &'static str,
    /// Raw content of the `#[sql("...")]` attribute.
    pub tag: &'static str,
    pub kind: DataKind,
    /// Stored as a JSON document.
    pub json: bool,
    /// Declared as `Option<T>`.
    pub nullable: bool,
    pub bits: u8,
    /// Nested shape of an `inline` field.
    pub inline: Option<fn() -> &'static Shape>,
}

async fn execute<E: Executor>(executor: &mut E, statement: Statement) -> Result<RowsAffected> {
    let context = format!("While executing the statement:\n{}", statement);
    logged(executor.execute_statement(statement).await.context(context))
}

/// A struct persisted as one table row.
///
/// Implemented by `#[derive(Record)]`: the derive provides the shape and the
/// field accessors, every other method has a default implementation.
///
/// ```rust,ignore
/// #[derive(Default, Record)]
/// struct User {
///     #[sql("primary_key,auto_increment,where")]
///     id: i64,
///     #[sql("size=64,unique")]
///     name: String,
/// }
///
/// let mut user = User { name: "ann".into(), ..Default::default() };
/// user.insert(&mut connection, QueryOptions::new()).await?;
/// let user = User::get(&mut connection, QueryOptions::new().selector("name=ann")).await?;
/// ```
pub trait Record: FromRow + Default + Send + Sync + Sized + 'static {
    fn shape() -> &'static Shape;

    /// Value of the field reached through `path` (field indexes, one per
    /// inline level).
    fn column_value(&self, path: &[usize]) -> Result<Value>;

    /// Assigns the field reached through `path`, converting `value` to the
    /// field type.
    fn set_column_value(&mut self, path: &[usize], value: Value) -> Result<()>;

    fn table_name() -> String {
        Self::shape().table_name()
    }

    /// Cached columns for the dialect.
    fn columns(writer: &dyn SqlWriter) -> Arc<ColumnSet> {
        ColumnCache::global().get::<Self>(writer)
    }

    /// Inserts the record. A zero auto increment key is assigned the
    /// generated identifier.
    fn insert<E: Executor>(
        &mut self,
        executor: &mut E,
        options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let writer = executor.driver().sql_writer();
            let statement = gen_insert_sql(self, writer.as_ref(), &options)?;
            let result = execute(executor, statement).await?;
            let columns = Self::columns(writer.as_ref());
            if let (Some(id), Some(column)) = (result.last_affected_id, columns.auto_increment()) {
                if self.column_value(&column.path)?.is_zero() {
                    self.set_column_value(&column.path, Value::Int(Some(id)))?;
                }
            }
            Ok(result)
        }
    }

    /// Updates the row matched by the `where` fields, `NotFound` when none is.
    fn update<E: Executor>(
        &self,
        executor: &mut E,
        options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let writer = executor.driver().sql_writer();
            let statement = gen_update_sql(self, writer.as_ref(), &options)?;
            let result = execute(executor, statement).await?;
            if result.rows_affected == 0 {
                return Err(NotFound::new(options.table_or::<Self>()).into());
            }
            Ok(result)
        }
    }

    /// First row matching the options.
    fn get<E: Executor>(
        executor: &mut E,
        options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<Self>> + Send {
        async move {
            let writer = executor.driver().sql_writer();
            let statement = gen_get_sql::<Self>(writer.as_ref(), &options)?;
            match binder::fetch_one::<Self, _>(executor, statement).await? {
                Some(v) => Ok(v),
                None if options.is_ignore_not_found() => Ok(Self::default()),
                None => Err(NotFound::new(options.table_or::<Self>()).into()),
            }
        }
    }

    /// Rows matching the options, at most `row_cap` of them. The total is
    /// written before the page is read when the options ask for it.
    fn list<E: Executor>(
        executor: &mut E,
        mut options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<Vec<Self>>> + Send {
        async move {
            let writer = executor.driver().sql_writer();
            let (statement, count) = gen_list_sql::<Self>(writer.as_ref(), &options)?;
            if let Some(count) = count {
                let total = binder::fetch_one::<u64, _>(executor, count)
                    .await?
                    .unwrap_or_default();
                options.set_total(total);
            }
            let result =
                binder::fetch_many::<Self, _>(executor, statement, options.row_cap()).await?;
            if result.is_empty() && !options.is_ignore_not_found() {
                return Err(NotFound::new(options.table_or::<Self>()).into());
            }
            Ok(result)
        }
    }

    /// Cursor over the rows matching the options.
    fn rows<'e, E: Executor>(
        executor: &'e mut E,
        options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<Rows<'e, Self>>> + Send {
        async move {
            let writer = executor.driver().sql_writer();
            let (statement, _) = gen_list_sql::<Self>(writer.as_ref(), &options)?;
            let stream = executor.fetch_statement(statement);
            Ok(Rows::new(stream, writer))
        }
    }

    /// Deletes the rows matching the selector of the options, `NotFound`
    /// when none is.
    fn delete<E: Executor>(
        executor: &mut E,
        options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let writer = executor.driver().sql_writer();
            let statement = gen_delete_sql::<Self>(writer.as_ref(), &options)?;
            let result = execute(executor, statement).await?;
            if result.rows_affected == 0 {
                return Err(NotFound::new(options.table_or::<Self>()).into());
            }
            Ok(result)
        }
    }

    fn create_table<E: Executor>(
        executor: &mut E,
        if_not_exists: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let driver = executor.driver().clone();
            let columns = Self::columns(driver.sql_writer().as_ref());
            driver
                .create_table(executor, &Self::table_name(), &columns, if_not_exists)
                .await
        }
    }

    fn drop_table<E: Executor>(
        executor: &mut E,
        if_exists: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let driver = executor.driver().clone();
            driver
                .drop_table(executor, &Self::table_name(), if_exists)
                .await
        }
    }

    /// Brings the table in line with the record, see [`Driver::auto_migrate`].
    fn auto_migrate<E: Executor>(executor: &mut E) -> impl Future<Output = Result<()>> + Send {
        async move {
            let driver = executor.driver().clone();
            let columns = Self::columns(driver.sql_writer().as_ref());
            let table = Self::table_name();
            driver
                .auto_migrate(executor, &table, &columns)
                .await
                .with_context(|| format!("While migrating the table `{}`", table))
        }
    }
}
