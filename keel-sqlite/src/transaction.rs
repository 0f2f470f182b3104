use crate::{SqliteConnection, SqliteDriver};
use keel_core::{Driver, Executor, Query, QueryResult, Result, Transaction, stream::Stream};

pub struct SqliteTransaction<'c> {
    connection: &'c mut SqliteConnection,
}

impl<'c> SqliteTransaction<'c> {
    pub async fn new(connection: &'c mut SqliteConnection) -> Result<Self> {
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_transaction_begin(&mut sql);
        connection.execute(Query::Raw(sql)).await?;
        Ok(Self { connection })
    }

    async fn finish(self, commit: bool) -> Result<()> {
        let mut sql = String::new();
        let writer = self.driver().sql_writer();
        if commit {
            writer.write_transaction_commit(&mut sql);
        } else {
            writer.write_transaction_rollback(&mut sql);
        }
        self.connection.execute(Query::Raw(sql)).await.map(|_| ())
    }
}

impl<'c> Executor for SqliteTransaction<'c> {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        self.connection.driver()
    }

    fn prepare(
        &mut self,
        query: String,
    ) -> impl Future<Output = Result<Query<SqliteDriver>>> + Send {
        self.connection.prepare(query)
    }

    fn run(
        &mut self,
        query: Query<SqliteDriver>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.connection.run(query)
    }
}

impl<'c> Transaction<'c> for SqliteTransaction<'c> {
    fn commit(self) -> impl Future<Output = Result<()>> + Send {
        self.finish(true)
    }

    fn rollback(self) -> impl Future<Output = Result<()>> + Send {
        self.finish(false)
    }
}
