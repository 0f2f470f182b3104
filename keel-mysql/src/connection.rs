use crate::{MySqlDriver, MySqlQueryable, MySqlTransaction};
use keel_core::{
    Connection, Context, Driver, Error, Executor, Query, QueryResult, Result, stream::Stream,
    truncate_long,
};
use mysql_async::{Conn, Opts, OptsBuilder};
use url::Url;

pub struct MySqlConnection {
    pub(crate) conn: MySqlQueryable<Conn>,
}

impl Executor for MySqlConnection {
    type Driver = MySqlDriver;

    fn driver(&self) -> &Self::Driver {
        self.conn.driver()
    }

    fn prepare(
        &mut self,
        query: String,
    ) -> impl Future<Output = Result<Query<MySqlDriver>>> + Send {
        self.conn.prepare(query)
    }

    fn run(&mut self, query: Query<MySqlDriver>) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.conn.run(query)
    }
}

impl Connection for MySqlConnection {
    async fn connect(url: &str) -> Result<MySqlConnection> {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let prefix = format!("{}://", MySqlDriver::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "MySQL connection url must start with `{}`",
                &prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let url = Url::parse(url).with_context(context)?;
        let opts = Opts::from_url(url.as_str()).with_context(context)?;
        let opts = OptsBuilder::from_opts(opts).client_found_rows(true);
        let connection = Conn::new(opts)
            .await
            .with_context(context)
            .inspect_err(|e| log::error!("{:#}", e))?;
        MySqlDriver::register();
        Ok(MySqlConnection {
            conn: MySqlQueryable {
                executor: connection,
            },
        })
    }

    #[allow(refining_impl_trait)]
    async fn begin(&mut self) -> Result<MySqlTransaction<'_>> {
        MySqlTransaction::new(self).await
    }
}
