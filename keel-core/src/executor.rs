use crate::{
    Driver, Query, QueryResult, Result, RowLabeled, RowsAffected, Statement,
    future::TryFutureExt,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::future::Future;

/// Something able to run SQL: a connection or a transaction.
pub trait Executor: Send + Sized {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    fn prepare(
        &mut self,
        query: String,
    ) -> impl Future<Output = Result<Query<Self::Driver>>> + Send;

    /// General method to send any query and return any result type (either row or count)
    fn run(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the query and returns the rows.
    fn fetch(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(query).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    /// Turns a generated statement into a query: raw when it has no
    /// arguments, prepared and bound otherwise.
    fn compile(
        &mut self,
        statement: Statement,
    ) -> impl Future<Output = Result<Query<Self::Driver>>> + Send {
        async move {
            log::debug!("{}", statement);
            if statement.args.is_empty() {
                return Ok(Query::Raw(statement.sql));
            }
            log::trace!("Binding {} arguments", statement.args.len());
            let mut query = self.prepare(statement.sql).await?;
            for arg in statement.args {
                query.bind(arg)?;
            }
            Ok(query)
        }
    }

    fn fetch_statement(
        &mut self,
        statement: Statement,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        async move {
            let query = self.compile(statement).await?;
            Ok(self.fetch(query))
        }
        .try_flatten_stream()
    }

    fn execute_statement(
        &mut self,
        statement: Statement,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let query = self.compile(statement).await?;
            self.execute(query).await
        }
    }
}
