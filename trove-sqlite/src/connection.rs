use crate::{
    CBox, SqliteDriver, SqlitePrepared, error_message_from_ptr,
    extract::{extract_name, extract_value},
    prepared::finalize,
};
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_MEMORY,
    SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE, SQLITE_ROW, sqlite3, sqlite3_close,
    sqlite3_column_count, sqlite3_errmsg, sqlite3_last_insert_rowid, sqlite3_open_v2,
    sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt, sqlite3_stmt_readonly,
    sqlite3_total_changes64,
};
use std::{
    ffi::{CString, c_char, c_int},
    mem, ptr,
    sync::Arc,
};
use trove_core::{
    CatalogColumn, Connection, Context, Driver, Executor, Query, QueryResult, RowLabeled,
    RowsAffected, TypeCategory, TypeInfo, Value,
    anyhow::{Error, Result},
    truncate_long,
};

pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
}

impl SqliteConnection {
    fn last_error(&self) -> Error {
        unsafe { Error::msg(error_message_from_ptr(&sqlite3_errmsg(*self.connection)).to_string()) }
    }

    /// Compile the next statement of the script, false once the script is over.
    fn compile_next(&mut self, prepared: &mut SqlitePrepared) -> Result<bool> {
        prepared.statement = CBox::new(ptr::null_mut(), finalize);
        prepared.started = false;
        while !prepared.tail.trim().is_empty() {
            let mut statement: *mut sqlite3_stmt = ptr::null_mut();
            let mut tail: *const c_char = ptr::null();
            let start = prepared.tail.as_ptr() as *const c_char;
            let rc = unsafe {
                sqlite3_prepare_v2(
                    *self.connection,
                    start,
                    prepared.tail.len() as c_int,
                    &mut statement,
                    &mut tail,
                )
            };
            let statement = CBox::new(statement, finalize);
            if rc != SQLITE_OK {
                let error = self.last_error().context(format!(
                    "While preparing the query:\n{}",
                    truncate_long!(prepared.tail)
                ));
                log::error!("{:#}", error);
                prepared.tail.clear();
                return Err(error);
            }
            let offset = if tail.is_null() {
                prepared.tail.len()
            } else {
                unsafe { tail.offset_from(start) as usize }
            };
            if offset == 0 || offset >= prepared.tail.len() {
                prepared.tail.clear();
            } else {
                prepared.tail.drain(..offset);
            }
            // Comments and whitespace compile to nothing
            if !statement.is_null() {
                prepared.statement = statement;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run `sql` to completion and return its rows.
    fn rows(&mut self, sql: &str, params: &[Value]) -> Result<Vec<RowLabeled>> {
        let query = self.prepare_with(sql.to_string(), params)?;
        self.fetch(query)
    }

    fn quoted(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &Self::Driver {
        &SqliteDriver {}
    }

    fn prepare(&mut self, sql: String) -> Result<Query<Self::Driver>> {
        let mut prepared = SqlitePrepared::new(sql);
        self.compile_next(&mut prepared)?;
        Ok(Query::Prepared(prepared))
    }

    fn step(&mut self, query: &mut Query<Self::Driver>) -> Result<Option<QueryResult>> {
        if let Query::Raw(sql) = query {
            let sql = mem::take(sql);
            *query = self.prepare(sql)?;
        }
        let Query::Prepared(prepared) = query else {
            return Err(Error::msg("The query could not be prepared"));
        };
        loop {
            if prepared.statement.is_null() {
                return Ok(None);
            }
            if !prepared.started {
                prepared.bind_pending()?;
                let count = unsafe { sqlite3_column_count(*prepared.statement) };
                prepared.labels = (0..count)
                    .map(|i| extract_name(*prepared.statement, i))
                    .collect::<Result<Arc<[_]>>>()?;
                prepared.changes = unsafe { sqlite3_total_changes64(*self.connection) };
                prepared.started = true;
            }
            match unsafe { sqlite3_step(*prepared.statement) } {
                SQLITE_BUSY => {
                    continue;
                }
                SQLITE_ROW => {
                    let values = (0..prepared.labels.len() as c_int)
                        .map(|i| extract_value(*prepared.statement, i))
                        .collect::<Result<_>>()?;
                    return Ok(Some(
                        RowLabeled::new(prepared.labels.clone(), values).into(),
                    ));
                }
                SQLITE_DONE => {
                    let modifying = unsafe { sqlite3_stmt_readonly(*prepared.statement) } == 0;
                    let inserting = {
                        let sql = prepared.sql();
                        let verb = sql.trim_start().get(..7).unwrap_or_default().to_ascii_lowercase();
                        verb.starts_with("insert") || verb.starts_with("replace")
                    };
                    let rows_affected = unsafe { sqlite3_total_changes64(*self.connection) }
                        - prepared.changes;
                    let result = RowsAffected {
                        rows_affected: rows_affected.max(0) as u64,
                        last_affected_id: (inserting && rows_affected > 0)
                            .then(|| unsafe { sqlite3_last_insert_rowid(*self.connection) }),
                    };
                    self.compile_next(prepared)?;
                    if modifying {
                        return Ok(Some(result.into()));
                    }
                }
                _ => {
                    let error = self
                        .last_error()
                        .context(format!("While executing the query:\n{}", prepared));
                    log::error!("{:#}", error);
                    prepared.statement = CBox::new(ptr::null_mut(), finalize);
                    prepared.tail.clear();
                    return Err(error);
                }
            }
        }
    }
}

/// Native types, sqlite stores everything under five storage classes.
const TYPES: &[(&str, &[TypeCategory])] = &[
    (
        "INTEGER",
        &[
            TypeCategory::Boolean,
            TypeCategory::TinyInt,
            TypeCategory::SmallInt,
            TypeCategory::Integer,
            TypeCategory::BigInt,
        ],
    ),
    ("REAL", &[TypeCategory::Real, TypeCategory::Double]),
    ("NUMERIC", &[TypeCategory::Decimal]),
    (
        "TEXT",
        &[
            TypeCategory::Char,
            TypeCategory::Varchar,
            TypeCategory::Date,
            TypeCategory::Time,
            TypeCategory::Timestamp,
            TypeCategory::TimestampWithTimezone,
            TypeCategory::Uuid,
        ],
    ),
    ("BLOB", &[TypeCategory::Binary]),
];

/// Length declared in a column type like `TEXT(50)`.
fn declared_length(type_name: &str) -> Option<u32> {
    let (_, rest) = type_name.split_once('(')?;
    let (length, _) = rest.split_once([')', ','])?;
    length.trim().parse().ok()
}

impl Connection for SqliteConnection {
    fn connect(url: &str) -> Result<SqliteConnection> {
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        let Some(location) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                &prefix
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let (path, parameters) = location.split_once('?').unwrap_or((location, ""));
        let context = || format!("Error while decoding connection URL: `{}`", url);
        let path = urlencoding::decode(path).with_context(context)?;
        let mut flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE;
        for (key, value) in parameters
            .split('&')
            .filter_map(|parameter| parameter.split_once('='))
        {
            match (key, value) {
                ("mode", "ro") => flags = SQLITE_OPEN_READONLY,
                ("mode", "rw") => flags = SQLITE_OPEN_READWRITE,
                ("mode", "rwc") => flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                ("mode", "memory") => {
                    flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_MEMORY
                }
                _ => log::warn!("Ignoring the connection parameter {}={}", key, value),
            }
        }
        let filename = CString::new(path.as_bytes()).with_context(context)?;
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe { sqlite3_open_v2(filename.as_ptr(), &mut *connection, flags, ptr::null()) };
        let result = Self { connection };
        if rc != SQLITE_OK {
            let error = if result.connection.is_null() {
                Error::msg("Unknown error (sqlite could not allocate the connection)")
            } else {
                result.last_error()
            }
            .context(format!("While opening the database {}", path));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(result)
    }

    fn is_alive(&mut self) -> bool {
        !self.connection.is_null()
            && self
                .rows("SELECT 1", &[])
                .is_ok_and(|rows| rows.len() == 1)
    }

    fn product_name(&self) -> &str {
        "SQLite"
    }

    fn type_info(&mut self) -> Result<Vec<TypeInfo>> {
        Ok(TYPES
            .iter()
            .flat_map(|(name, categories)| {
                categories
                    .iter()
                    .map(|category| TypeInfo::new(*name, *category, None))
            })
            .collect())
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        let rows = self.rows(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
            &[table.to_string().into()],
        )?;
        Ok(!rows.is_empty())
    }

    fn columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>> {
        self.rows(&format!("PRAGMA table_info({})", Self::quoted(table)), &[])?
            .into_iter()
            .map(|row| {
                let text = |name: &str| -> Result<String> {
                    match row.get_column(name) {
                        Some(Value::Varchar(Some(v))) => Ok(v.clone()),
                        Some(v) if v.is_null() => Ok(String::new()),
                        _ => Err(Error::msg(format!(
                            "Unexpected table_info column {} for {}",
                            name, table
                        ))),
                    }
                };
                let type_name = text("type")?;
                Ok(CatalogColumn {
                    name: text("name")?,
                    length: declared_length(&type_name),
                    type_name,
                    not_null: matches!(row.get_column("notnull"), Some(Value::Int64(Some(1)))),
                })
            })
            .collect()
    }

    fn primary_keys(&mut self, table: &str) -> Result<Vec<String>> {
        let mut keys = self
            .rows(&format!("PRAGMA table_info({})", Self::quoted(table)), &[])?
            .into_iter()
            .filter_map(|row| match (row.get_column("pk"), row.get_column("name")) {
                (Some(Value::Int64(Some(position))), Some(Value::Varchar(Some(name))))
                    if *position > 0 =>
                {
                    Some((*position, name.clone()))
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        keys.sort();
        Ok(keys.into_iter().map(|(_, name)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::declared_length;

    #[test]
    fn lengths() {
        assert_eq!(declared_length("TEXT(50)"), Some(50));
        assert_eq!(declared_length("NUMERIC(10, 2)"), Some(10));
        assert_eq!(declared_length("INTEGER"), None);
        assert_eq!(declared_length("TEXT(abc)"), None);
    }
}
