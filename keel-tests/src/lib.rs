mod crud;
mod kinds;
mod list;
mod migrate;
mod rows;
mod selector;
mod transaction;

use crate::{
    crud::crud, kinds::kinds, list::list, migrate::migrate, rows::rows, selector::selector,
};
use keel::Connection;
use log::LevelFilter;
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs the whole driver independent suite on `connection`.
pub async fn execute_tests<C: Connection>(mut connection: C) {
    kinds(&mut connection).await;
    crud(&mut connection).await;
    list(&mut connection).await;
    selector(&mut connection).await;
    rows(&mut connection).await;
    migrate(&mut connection).await;
    #[cfg(not(feature = "disable-transactions"))]
    transaction::transaction(&mut connection).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
