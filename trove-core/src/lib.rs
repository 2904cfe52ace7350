mod as_value;
mod connection;
mod driver;
mod entity;
mod error;
mod executor;
mod pager;
mod pool;
mod prepared;
mod query;
mod record;
mod relations;
mod results;
mod schema;
mod sql_writer;
mod util;
mod value;

pub use ::anyhow::{self, Context};
pub use as_value::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::Executor;
pub use pager::*;
pub use pool::*;
pub use prepared::*;
pub use query::*;
pub use record::*;
pub use relations::*;
pub use results::*;
pub use schema::*;
pub use sql_writer::*;
pub use util::*;
pub use value::*;

pub type Result<T, E = Error> = std::result::Result<T, E>;
