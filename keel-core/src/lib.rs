mod as_value;
mod binder;
mod column;
mod connection;
mod dialect;
mod driver;
mod error;
mod executor;
mod generator;
pub mod json;
mod options;
mod prepared;
mod query;
mod record;
mod selector;
mod sql_writer;
mod tag;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use binder::*;
pub use column::*;
pub use connection::*;
pub use dialect::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use generator::*;
pub use options::*;
pub use prepared::*;
pub use query::*;
pub use record::*;
pub use selector::*;
pub use sql_writer::*;
pub use tag::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
