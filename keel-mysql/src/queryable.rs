use crate::{MySqlDriver, MySqlPrepared, RowWrap};
use async_stream::try_stream;
use keel_core::{
    Error, Executor, Query, QueryResult, Result, RowsAffected,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::sync::Arc;

/// Executor over anything `mysql_async` can query: a connection or a
/// transaction.
pub(crate) struct MySqlQueryable<T: mysql_async::prelude::Queryable> {
    pub(crate) executor: T,
}

fn affected(rows_affected: u64, last_insert_id: Option<u64>) -> QueryResult {
    QueryResult::Affected(RowsAffected {
        rows_affected,
        last_affected_id: last_insert_id.map(|v| v as _),
    })
}

impl<T: mysql_async::prelude::Queryable> Executor for MySqlQueryable<T> {
    type Driver = MySqlDriver;

    fn driver(&self) -> &Self::Driver {
        &MySqlDriver {}
    }

    async fn prepare(&mut self, query: String) -> Result<Query<Self::Driver>> {
        let context = format!("While preparing the query:\n{}", query);
        let statement = self
            .executor
            .prep(query)
            .await
            .map_err(|e| Error::new(e).context(context))
            .inspect_err(|e| log::error!("{:#}", e))?;
        Ok(Query::Prepared(MySqlPrepared::new(statement)))
    }

    fn run(
        &mut self,
        query: Query<Self::Driver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = Arc::new(format!("While running the query:\n{}", query));
        try_stream! {
            match query {
                Query::Raw(sql) => {
                    let mut result = self.executor.query_iter(sql).await?;
                    let mut rows = 0;
                    while let Some(mut stream) = result.stream::<RowWrap>().await? {
                        while let Some(row) = stream.next().await.transpose()? {
                            rows += 1;
                            yield QueryResult::Row(row.0);
                        }
                    }
                    if rows == 0 {
                        yield affected(result.affected_rows(), result.last_insert_id());
                    }
                }
                Query::Prepared(mut prepared) => {
                    let params = prepared.take_params()?;
                    let mut result = self.executor.exec_iter(&prepared.statement, params).await?;
                    let mut rows = 0;
                    while let Some(mut stream) = result.stream::<RowWrap>().await? {
                        while let Some(row) = stream.next().await.transpose()? {
                            rows += 1;
                            yield QueryResult::Row(row.0);
                        }
                    }
                    if rows == 0 {
                        yield affected(result.affected_rows(), result.last_insert_id());
                    }
                }
            }
        }
        .map_err(move |e: Error| {
            let error = e.context(context.clone());
            log::error!("{:#}", error);
            error
        })
    }
}
