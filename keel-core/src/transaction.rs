use crate::{Executor, Result};
use std::future::Future;

/// A transaction exposes the whole executor surface; it ends only through an
/// explicit `commit` or `rollback`.
pub trait Transaction<'c>: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
