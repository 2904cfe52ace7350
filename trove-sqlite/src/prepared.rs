use crate::{CBox, SqliteSqlWriter, error_message_from_ptr};
use libsqlite3_sys::*;
use rust_decimal::prelude::ToPrimitive;
use std::{
    ffi::{CStr, c_int},
    fmt::{self, Display},
    os::raw::{c_char, c_void},
};
use trove_core::{
    Prepared, RowNames, SqlWriter, Value,
    anyhow::{Error, Result},
    truncate_long,
};

/// A script of one or more statements, compiled one at a time while it runs.
///
/// Bound values are kept until the statement that uses them starts, then each
/// statement takes as many values as it has placeholders, in order.
pub struct SqlitePrepared {
    pub(crate) statement: CBox<*mut sqlite3_stmt>,
    /// Source of the statements not compiled yet.
    pub(crate) tail: String,
    pub(crate) params: Vec<Value>,
    /// Values taken by the statements already started.
    pub(crate) consumed: usize,
    /// The current statement received its values and was stepped at least once.
    pub(crate) started: bool,
    pub(crate) labels: RowNames,
    /// Total changes of the connection before the current statement started.
    pub(crate) changes: i64,
}

pub(crate) fn finalize(statement: *mut sqlite3_stmt) {
    unsafe {
        sqlite3_finalize(statement);
    }
}

impl SqlitePrepared {
    pub(crate) fn new(sql: String) -> Self {
        Self {
            statement: CBox::new(std::ptr::null_mut(), finalize),
            tail: sql,
            params: Vec::new(),
            consumed: 0,
            started: false,
            labels: Vec::new().into(),
            changes: 0,
        }
    }

    /// Sql of the current statement.
    pub(crate) fn sql(&self) -> String {
        if self.statement.is_null() {
            return String::new();
        }
        unsafe {
            let sql = sqlite3_sql(*self.statement);
            if sql.is_null() {
                String::new()
            } else {
                CStr::from_ptr(sql).to_string_lossy().into_owned()
            }
        }
    }

    /// Bind to the current statement the values it needs.
    pub(crate) fn bind_pending(&mut self) -> Result<()> {
        let count = unsafe { sqlite3_bind_parameter_count(*self.statement) } as usize;
        let end = (self.consumed + count).min(self.params.len());
        for (i, value) in self.params[self.consumed..end].iter().enumerate() {
            bind_value(*self.statement, i as c_int + 1, value)?;
        }
        self.consumed += count;
        Ok(())
    }
}

impl Prepared for SqlitePrepared {
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.params.clear();
        self.consumed = 0;
        if !self.statement.is_null() {
            unsafe {
                sqlite3_clear_bindings(*self.statement);
            }
        }
        Ok(self)
    }
    fn bind<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self> {
        self.params.push(value.into());
        Ok(self)
    }
    fn bind_index<V: Into<Value>>(&mut self, value: V, index: u64) -> Result<&mut Self> {
        let index = index as usize;
        if self.params.len() <= index {
            self.params.resize(index + 1, Value::Null);
        }
        self.params[index] = value.into();
        Ok(self)
    }
}

fn bind_text(statement: *mut sqlite3_stmt, index: c_int, value: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            value.as_ptr() as *const c_char,
            value.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}

/// Bind `value` to the placeholder `index` (from 1).
pub(crate) fn bind_value(statement: *mut sqlite3_stmt, index: c_int, value: &Value) -> Result<()> {
    unsafe {
        let rc = match value {
            v if v.is_null() => sqlite3_bind_null(statement, index),
            Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int32(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, *v),
            Value::UInt8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt32(Some(v)) => sqlite3_bind_int64(statement, index, *v as sqlite3_int64),
            Value::UInt64(Some(v)) => {
                let Ok(v) = sqlite3_int64::try_from(*v) else {
                    let error = Error::msg(format!(
                        "Cannot bind u64 value `{}` into sqlite integer because it's out of bounds",
                        v
                    ));
                    log::error!("{:#}", error);
                    return Err(error);
                };
                sqlite3_bind_int64(statement, index, v)
            }
            Value::Float32(Some(v)) => sqlite3_bind_double(statement, index, *v as f64),
            Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, *v),
            Value::Decimal(Some(v), ..) => sqlite3_bind_double(
                statement,
                index,
                v.to_f64().ok_or_else(|| {
                    Error::msg(format!("Cannot convert the Decimal value `{}` to f64", v))
                })?,
            ),
            Value::Char(Some(v)) => {
                let mut buffer = [0; 4];
                bind_text(statement, index, v.encode_utf8(&mut buffer))
            }
            Value::Varchar(Some(v)) => bind_text(statement, index, v),
            Value::Blob(Some(v)) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            // Temporal values and uuids are stored as text, in the format their literals use
            v => {
                let mut text = String::new();
                SqliteSqlWriter {}.write_value(&mut text, v);
                bind_text(statement, index, text.trim_matches('\''))
            }
        };
        if rc != SQLITE_OK {
            let db = sqlite3_db_handle(statement);
            let query = sqlite3_sql(statement);
            let error = Error::msg(error_message_from_ptr(&sqlite3_errmsg(db)).to_string())
                .context(format!(
                    "Cannot bind parameter {} to query:\n{}",
                    index,
                    truncate_long!(CStr::from_ptr(query).to_string_lossy())
                ));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }
}

impl Display for SqlitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = self.sql();
        if sql.is_empty() {
            write!(f, "{}", truncate_long!(self.tail))
        } else {
            write!(f, "{}", truncate_long!(sql))
        }
    }
}
