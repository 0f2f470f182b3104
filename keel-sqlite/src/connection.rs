use crate::{
    CBox, SqliteDriver, SqlitePrepared, SqliteTransaction, error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use async_stream::try_stream;
use keel_core::{
    Connection, Driver, Error, Executor, Query, QueryResult, Result, Row, RowLabeled, RowNames,
    RowsAffected, as_c_string,
    future::Either,
    stream::{Stream, StreamExt},
    truncate_long,
};
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_close, sqlite3_column_count, sqlite3_db_handle,
    sqlite3_errmsg, sqlite3_finalize, sqlite3_last_insert_rowid, sqlite3_open_v2,
    sqlite3_prepare_v2, sqlite3_sql, sqlite3_step, sqlite3_stmt, sqlite3_stmt_readonly,
    sqlite3_total_changes64,
};
use std::{
    ffi::{CStr, CString, c_int},
    pin::pin,
    ptr,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
};
use tokio::task::spawn_blocking;

type StatementHandle = CBox<*mut sqlite3_stmt>;

pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
}

fn last_error(connection: *mut sqlite3) -> Error {
    Error::msg(error_message_from_ptr(&unsafe { sqlite3_errmsg(connection) }).to_string())
}

/// Prepares the first statement of `sql` starting at byte `offset`, returns it
/// with the offset of the remaining text. The statement is null when only
/// whitespace or comments were left.
fn prepare_next(
    connection: *mut sqlite3,
    sql: &CStr,
    offset: usize,
) -> Result<(StatementHandle, usize)> {
    unsafe {
        let mut statement = CBox::new(ptr::null_mut(), |p| {
            sqlite3_finalize(p);
        });
        let start = sql.as_ptr().add(offset);
        let mut tail = ptr::null();
        let rc = sqlite3_prepare_v2(connection, start, -1, &mut *statement, &mut tail);
        if rc != SQLITE_OK {
            return Err(last_error(connection));
        }
        let next = if tail.is_null() {
            sql.to_bytes().len()
        } else {
            tail.offset_from(sql.as_ptr()) as usize
        };
        Ok((statement, next))
    }
}

fn column_labels(statement: &StatementHandle) -> Result<RowNames> {
    unsafe {
        let count = sqlite3_column_count(**statement);
        (0..count).map(|i| extract_name(**statement, i)).collect()
    }
}

fn step(statement: &StatementHandle, count: usize) -> Result<Option<Row>> {
    unsafe {
        loop {
            match sqlite3_step(**statement) {
                SQLITE_BUSY => continue,
                SQLITE_DONE => return Ok(None),
                SQLITE_ROW => {
                    return (0..count as c_int)
                        .map(|i| extract_value(**statement, i))
                        .collect::<Result<_>>()
                        .map(Some);
                }
                _ => {
                    let error = last_error(sqlite3_db_handle(**statement));
                    log::error!("{:#}", error);
                    return Err(error);
                }
            }
        }
    }
}

fn total_changes(connection: &CBox<*mut sqlite3>) -> i64 {
    unsafe { sqlite3_total_changes64(**connection) }
}

fn is_insert(statement: &StatementHandle) -> bool {
    unsafe {
        if sqlite3_stmt_readonly(**statement) != 0 {
            return false;
        }
        let sql = sqlite3_sql(**statement);
        if sql.is_null() {
            return false;
        }
        let sql = CStr::from_ptr(sql).to_string_lossy();
        let verb = sql.trim_start().split_whitespace().next().unwrap_or_default();
        verb.eq_ignore_ascii_case("insert") || verb.eq_ignore_ascii_case("replace")
    }
}

fn affected(
    connection: &CBox<*mut sqlite3>,
    statement: &StatementHandle,
    before: i64,
) -> RowsAffected {
    let rows_affected = (total_changes(connection) - before).max(0) as u64;
    let last_affected_id = if rows_affected > 0 && is_insert(statement) {
        Some(unsafe { sqlite3_last_insert_rowid(**connection) })
    } else {
        None
    };
    RowsAffected {
        rows_affected,
        last_affected_id,
    }
}

/// Steps a prepared statement to completion: rows for the statements
/// returning columns, a single count for the others.
fn run_statement(
    connection: CBox<*mut sqlite3>,
    statement: StatementHandle,
) -> impl Stream<Item = Result<QueryResult>> + Send {
    try_stream! {
        let labels = column_labels(&statement)?;
        if labels.is_empty() {
            let before = total_changes(&connection);
            while step(&statement, 0)?.is_some() {}
            yield QueryResult::Affected(affected(&connection, &statement, before));
        } else {
            while let Some(values) = step(&statement, labels.len())? {
                yield QueryResult::Row(RowLabeled::new(labels.clone(), values));
            }
        }
    }
}

impl SqliteConnection {
    /// Handle sharing the connection pointer without closing it on drop.
    fn borrowed(&self) -> CBox<*mut sqlite3> {
        CBox::new(*self.connection, |_| {})
    }

    pub(crate) fn run_unprepared(
        &mut self,
        sql: String,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.borrowed();
        try_stream! {
            let sql = Arc::new(as_c_string(sql)?);
            let len = sql.as_bytes().len();
            let mut offset = 0;
            while offset < len {
                let handle = AtomicPtr::new(*connection);
                let text = sql.clone();
                let (statement, next) = spawn_blocking(move || {
                    prepare_next(handle.load(Ordering::Relaxed), &text, offset)
                })
                .await??;
                if next <= offset {
                    break;
                }
                offset = next;
                if statement.is_null() {
                    continue;
                }
                let alias = CBox::new(*connection, |_| {});
                let mut stream = pin!(run_statement(alias, statement));
                while let Some(value) = stream.next().await {
                    yield value?;
                }
            }
        }
    }
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        &SqliteDriver {}
    }

    async fn prepare(&mut self, query: String) -> Result<Query<SqliteDriver>> {
        let connection = AtomicPtr::new(*self.connection);
        let context = format!("While preparing the query:\n{}", truncate_long!(query));
        let prepared = spawn_blocking(move || {
            let connection = connection.load(Ordering::Relaxed);
            let sql = as_c_string(query)?;
            let (statement, next) = prepare_next(connection, &sql, 0)?;
            if statement.is_null() {
                return Err(Error::msg("The query does not contain any statement"));
            }
            let rest = &sql.to_bytes()[next..];
            if rest.iter().any(|c| !c.is_ascii_whitespace() && *c != b';') {
                return Err(Error::msg(
                    "Cannot prepare more than one statement at a time",
                ));
            }
            Ok(statement)
        })
        .await?
        .map_err(|e| e.context(context))
        .inspect_err(|e| log::error!("{:#}", e))?;
        Ok(Query::Prepared(SqlitePrepared::new(prepared)))
    }

    fn run(
        &mut self,
        query: Query<SqliteDriver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        match query {
            Query::Raw(sql) => Either::Left(self.run_unprepared(sql)),
            Query::Prepared(prepared) => {
                Either::Right(run_statement(self.borrowed(), prepared.statement))
            }
        }
    }
}

impl Connection for SqliteConnection {
    /// Opens `sqlite://<path>[?<uri parameters>]`, the path and parameters
    /// follow the SQLite URI filename rules (`mode=ro|rw|rwc|memory`, ...).
    async fn connect(url: &str) -> Result<SqliteConnection> {
        let prefix = format!("{}://", SqliteDriver::NAME);
        let Some(path) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected the sqlite connection url to start with `{}`, found `{}`",
                prefix, url
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let uri: CString = as_c_string(format!("file:{}", path))?;
        let context = format!("While opening the database `{}`", url);
        let connection = spawn_blocking(move || unsafe {
            let mut connection = CBox::new(ptr::null_mut(), |p| {
                sqlite3_close(p);
            });
            let rc = sqlite3_open_v2(
                uri.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                return Err(last_error(*connection));
            }
            Ok(connection)
        })
        .await?
        .map_err(|e| e.context(context))
        .inspect_err(|e| log::error!("{:#}", e))?;
        SqliteDriver::register();
        log::debug!("Connected to `{}`", url);
        Ok(Self { connection })
    }

    fn begin(&mut self) -> impl Future<Output = Result<SqliteTransaction<'_>>> + Send {
        SqliteTransaction::new(self)
    }
}
