use crate::{CBox, error_message_from_ptr};
use keel_core::{AsValue, Error, Prepared, Result, Value, format_time, truncate_long};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    fmt::{self, Display},
    os::raw::{c_char, c_void},
};

pub struct SqlitePrepared {
    pub(crate) statement: CBox<*mut sqlite3_stmt>,
    pub(crate) index: u64,
}

impl SqlitePrepared {
    pub(crate) fn new(statement: CBox<*mut sqlite3_stmt>) -> Self {
        unsafe {
            sqlite3_clear_bindings(*statement);
        }
        Self {
            statement,
            index: 1,
        }
    }

    fn bind_text(&self, index: c_int, value: &str) -> c_int {
        unsafe {
            sqlite3_bind_text(
                *self.statement,
                index,
                value.as_ptr() as *const c_char,
                value.len() as c_int,
                SQLITE_TRANSIENT(),
            )
        }
    }

    fn error(&self, index: c_int, message: String) -> Error {
        let query = unsafe {
            let sql = sqlite3_sql(*self.statement);
            if sql.is_null() {
                String::new()
            } else {
                CStr::from_ptr(sql).to_string_lossy().into_owned()
            }
        };
        let error = Error::msg(message).context(format!(
            "Cannot bind parameter {} to query:\n{}",
            index,
            truncate_long!(query)
        ));
        log::error!("{:#}", error);
        error
    }
}

impl Prepared for SqlitePrepared {
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.index = 1;
        unsafe {
            let rc = sqlite3_reset(*self.statement);
            if rc != SQLITE_OK {
                let db = sqlite3_db_handle(*self.statement);
                return Err(Error::msg(
                    error_message_from_ptr(&sqlite3_errmsg(db)).to_string(),
                ));
            }
            sqlite3_clear_bindings(*self.statement);
        }
        Ok(self)
    }

    fn bind<V: AsValue>(&mut self, value: V) -> Result<&mut Self> {
        let index = self.index;
        self.bind_index(value, index)
    }

    fn bind_index<V: AsValue>(&mut self, v: V, index: u64) -> Result<&mut Self> {
        let index = index as c_int;
        let value = v.as_value();
        let rc = unsafe {
            match &value {
                v if v.is_null() => sqlite3_bind_null(*self.statement, index),
                Value::Boolean(Some(v)) => sqlite3_bind_int(*self.statement, index, *v as c_int),
                Value::Int(Some(v)) => sqlite3_bind_int64(*self.statement, index, *v),
                Value::UInt(Some(v)) => {
                    let Ok(v) = i64::try_from(*v) else {
                        return Err(self.error(
                            index,
                            format!("The value {} is out of bounds for a sqlite integer", v),
                        ));
                    };
                    sqlite3_bind_int64(*self.statement, index, v)
                }
                Value::Float(Some(v)) => sqlite3_bind_double(*self.statement, index, *v),
                Value::Varchar(Some(v)) => self.bind_text(index, v),
                Value::Time(Some(v)) => {
                    let v = format_time(v)?;
                    self.bind_text(index, &v)
                }
                Value::Blob(Some(v)) => sqlite3_bind_blob(
                    *self.statement,
                    index,
                    v.as_ptr() as *const c_void,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
                _ => {
                    return Err(self.error(
                        index,
                        format!("Cannot use {:?} as a query parameter", value),
                    ));
                }
            }
        };
        if rc != SQLITE_OK {
            let message = unsafe {
                let db = sqlite3_db_handle(*self.statement);
                error_message_from_ptr(&sqlite3_errmsg(db)).to_string()
            };
            return Err(self.error(index, message));
        }
        self.index = index as u64 + 1;
        Ok(self)
    }
}

impl Display for SqlitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = unsafe { sqlite3_sql(*self.statement) };
        if sql.is_null() {
            return write!(f, "{:p}", *self.statement);
        }
        let sql = unsafe { CStr::from_ptr(sql) }.to_string_lossy();
        write!(f, "{}", truncate_long!(sql))
    }
}
