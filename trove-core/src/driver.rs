use crate::{Connection, Prepared, SqlWriter};

/// Backend entry point, ties together the connection, the statement handle and the SQL dialect.
pub trait Driver: Default + Send + Sync + 'static {
    type Connection: Connection<Driver = Self>;
    type SqlWriter: SqlWriter;
    type Prepared: Prepared;

    /// Url scheme accepted by [`Connection::connect`], `sqlite` for `sqlite://...`.
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;
}
