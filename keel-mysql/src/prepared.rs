use crate::ValueWrap;
use keel_core::{AsValue, Error, Prepared, Result, Value};
use mysql_async::Statement;
use std::{
    fmt::{self, Display},
    mem,
};

#[derive(Debug)]
pub struct MySqlPrepared {
    pub(crate) statement: Statement,
    pub(crate) params: Vec<Value>,
    pub(crate) index: u64,
}

impl MySqlPrepared {
    pub(crate) fn new(statement: Statement) -> Self {
        Self {
            statement,
            params: Vec::new(),
            index: 0,
        }
    }

    /// Moves the bound values out as positional parameters, unbound
    /// placeholders are sent as `NULL`.
    pub(crate) fn take_params(&mut self) -> Result<mysql_async::Params> {
        let expected = self.statement.num_params() as usize;
        let mut params = mem::take(&mut self.params);
        params.resize_with(expected, Default::default);
        self.index = 0;
        if expected == 0 {
            return Ok(mysql_async::Params::Empty);
        }
        Ok(mysql_async::Params::Positional(
            params
                .into_iter()
                .map(|v| ValueWrap(v).try_into())
                .collect::<Result<_>>()?,
        ))
    }
}

impl Prepared for MySqlPrepared {
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.params.clear();
        self.index = 0;
        Ok(self)
    }

    fn bind<V: AsValue>(&mut self, value: V) -> Result<&mut Self> {
        self.bind_index(value, self.index)
    }

    fn bind_index<V: AsValue>(&mut self, value: V, index: u64) -> Result<&mut Self> {
        let len = self.statement.num_params();
        if self.params.is_empty() {
            self.params.resize_with(len as _, Default::default);
        }
        let target = self.params.get_mut(index as usize).ok_or_else(|| {
            Error::msg(format!(
                "Index {} cannot be bound, the query has only {} parameters",
                index, len
            ))
        })?;
        *target = value.as_value();
        self.index = index + 1;
        Ok(self)
    }
}

impl Display for MySqlPrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MySqlPrepared(statement {}, {} parameters)",
            self.statement.id(),
            self.statement.num_params()
        )
    }
}
