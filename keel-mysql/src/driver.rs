use crate::{MySqlConnection, MySqlPrepared, MySqlSqlWriter, MySqlTransaction};
use keel_core::{Driver, SqlWriter, dialect, register_dialect};
use std::sync::{Arc, Once};

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDriver {}

impl MySqlDriver {
    pub const fn new() -> Self {
        Self {}
    }

    /// Makes the MySQL writer available in the dialect registry.
    pub fn register() {
        static REGISTER: Once = Once::new();
        REGISTER.call_once(|| register_dialect(Self::NAME, Arc::new(MySqlSqlWriter {})));
    }
}

impl Driver for MySqlDriver {
    const NAME: &'static str = "mysql";
    type Connection = MySqlConnection;
    type Prepared = MySqlPrepared;
    type Transaction<'c> = MySqlTransaction<'c>;

    fn sql_writer(&self) -> Arc<dyn SqlWriter> {
        Self::register();
        dialect(Self::NAME)
    }
}
