use crate::{
    AsValue, ColumnSet, Context, Driver, Error, Executor, Record, Result, RowLabeled, SqlWriter,
    Statement, Value,
    stream::{self, Stream, TryStreamExt},
};
use std::{
    borrow::Cow,
    marker::PhantomData,
    pin::{Pin, pin},
    sync::Arc,
};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Something a result row can be turned into: a record, a scalar read from
/// the first column, or an optional scalar.
pub trait FromRow: Sized {
    fn from_row(row: RowLabeled, writer: &dyn SqlWriter) -> Result<Self>;
}

fn first_value(row: RowLabeled) -> Result<Value> {
    row.values
        .into_vec()
        .into_iter()
        .next()
        .ok_or_else(|| Error::msg("The row has no columns"))
}

macro_rules! impl_from_row {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: RowLabeled, _writer: &dyn SqlWriter) -> Result<Self> {
                    <$ty>::try_from_value(first_value(row)?)
                }
            }
        )+
    };
}

impl_from_row!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
    Cow<'static, str>,
    Vec<u8>,
    Box<[u8]>,
    OffsetDateTime,
    PrimitiveDateTime,
    Value,
);

impl<T: AsValue> FromRow for Option<T> {
    fn from_row(row: RowLabeled, _writer: &dyn SqlWriter) -> Result<Self> {
        Option::<T>::try_from_value(first_value(row)?)
    }
}

/// Builds a record from a row: labels are matched case insensitively
/// against the columns, unknown labels are ignored and fields without a
/// matching label keep their default.
pub fn bind_record<R: Record>(row: RowLabeled, columns: &ColumnSet) -> Result<R> {
    let mut record = R::default();
    let RowLabeled { labels, values } = row;
    for (label, value) in labels.iter().zip(values.into_vec()) {
        let Some(column) = columns.get(label) else {
            log::trace!("Ignoring the label `{}` while binding `{}`", label, R::shape().name);
            continue;
        };
        let value = column.decode(value)?;
        record
            .set_column_value(&column.path, value)
            .with_context(|| {
                format!(
                    "While binding the column `{}` into `{}.{}`",
                    column.name,
                    R::shape().name,
                    column.field
                )
            })?;
    }
    Ok(record)
}

pub(crate) fn logged<T>(result: Result<T>) -> Result<T> {
    result.inspect_err(|e| log::error!("{:#}", e))
}

/// First row of the result, `None` when it is empty.
pub async fn fetch_one<T: FromRow, E: Executor>(
    executor: &mut E,
    statement: Statement,
) -> Result<Option<T>> {
    let writer = executor.driver().sql_writer();
    let context = format!("While running the query:\n{}", statement);
    let mut stream = pin!(executor.fetch_statement(statement));
    let Some(row) = logged(stream.try_next().await.context(context))? else {
        return Ok(None);
    };
    Ok(Some(T::from_row(row, writer.as_ref())?))
}

/// Every row of the result up to `cap`, the rows past the cap are discarded.
pub async fn fetch_many<T: FromRow, E: Executor>(
    executor: &mut E,
    statement: Statement,
    cap: usize,
) -> Result<Vec<T>> {
    let writer = executor.driver().sql_writer();
    let context = format!("While running the query:\n{}", statement);
    let mut stream = pin!(executor.fetch_statement(statement));
    let mut result = Vec::new();
    while let Some(row) = logged(stream.try_next().await.with_context(|| context.clone()))? {
        if result.len() >= cap {
            log::warn!(
                "The query returned more than {} rows, the rest is discarded:\n{}",
                cap,
                context
            );
            break;
        }
        result.push(T::from_row(row, writer.as_ref())?);
    }
    Ok(result)
}

/// Forward only cursor over a result, rows are bound one at a time.
///
/// ```rust,ignore
/// let mut rows = User::rows(&mut connection, QueryOptions::new()).await?;
/// while rows.next().await? {
///     let user = rows.row()?;
/// }
/// rows.close();
/// ```
pub struct Rows<'e, T> {
    stream: Pin<Box<dyn Stream<Item = Result<RowLabeled>> + Send + 'e>>,
    writer: Arc<dyn SqlWriter>,
    current: Option<RowLabeled>,
    closed: bool,
    _row: PhantomData<fn() -> T>,
}

impl<'e, T: FromRow> Rows<'e, T> {
    pub fn new(
        stream: impl Stream<Item = Result<RowLabeled>> + Send + 'e,
        writer: Arc<dyn SqlWriter>,
    ) -> Self {
        Self {
            stream: Box::pin(stream),
            writer,
            current: None,
            closed: false,
            _row: PhantomData,
        }
    }

    /// Advances to the next row, `false` once the result is exhausted.
    pub async fn next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.current = logged(self.stream.try_next().await)?;
        if self.current.is_none() {
            self.close();
            return Ok(false);
        }
        Ok(true)
    }

    /// Binds the current row.
    pub fn row(&mut self) -> Result<T> {
        let row = self
            .current
            .take()
            .ok_or_else(|| Error::msg("There is no current row, `next` must return true first"))?;
        T::from_row(row, self.writer.as_ref())
    }

    /// Releases the underlying statement, later calls to `next` return `false`.
    pub fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.stream = Box::pin(stream::empty());
    }
}

impl<'e, T> std::fmt::Debug for Rows<'e, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("dialect", &self.writer.name())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenericSqlWriter;

    fn row(labels: &[&str], values: Vec<Value>) -> RowLabeled {
        RowLabeled::new(
            labels.iter().map(|v| v.to_string()).collect::<Vec<_>>().into(),
            values.into(),
        )
    }

    #[test]
    fn scalars_read_the_first_column() {
        let writer = GenericSqlWriter;
        let value = i64::from_row(row(&["count(*)"], vec![Value::Int(Some(7))]), &writer).unwrap();
        assert_eq!(value, 7);
        let value = u64::from_row(row(&["n"], vec![Value::Varchar(Some("12".into()))]), &writer)
            .unwrap();
        assert_eq!(value, 12);
        let value = Option::<String>::from_row(row(&["name"], vec![Value::Null]), &writer).unwrap();
        assert_eq!(value, None);
        assert!(i32::from_row(row(&[], vec![]), &writer).is_err());
    }
}
