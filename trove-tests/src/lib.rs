mod cursor;
mod lifecycle;
mod model;
mod paging;
mod pool;
mod relations;

#[cfg(not(feature = "disable-multiple-statements"))]
use crate::cursor::scripts;
#[cfg(not(feature = "disable-generated-keys"))]
use crate::cursor::generated_keys;
use crate::{cursor::cursor, lifecycle::lifecycle, paging::paging, pool::pool, relations::relations};
use log::LevelFilter;
use std::env;
use trove::Connection;

pub use model::{DocType, Document};

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

/// Run every scenario on `connection`, `url` must lead to the same database.
pub fn execute_tests<C: Connection>(mut connection: C, url: &str) {
    lifecycle(&mut connection);
    relations(&mut connection);
    paging(&mut connection);
    cursor(&mut connection);
    #[cfg(not(feature = "disable-multiple-statements"))]
    scripts(&mut connection);
    #[cfg(not(feature = "disable-generated-keys"))]
    generated_keys(&mut connection);
    pool::<C>(url);
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
