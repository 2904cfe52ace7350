use crate::{
    AsValue, Connection, Driver, Entity, Error, Executor, Page, Query, QueryResult, Record, Result,
    Schema, SqlWriter, Value, executor::fetch_first, truncate_long,
};
use regex::Regex;
use std::{
    ops::Deref,
    sync::{Arc, LazyLock},
};

static GROUPING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\b(group|order)\s+by\b.*").expect("valid grouping pattern"));

/// Lazy cursor over the records returned by a statement.
///
/// Nothing runs until the records are requested. The records can be walked
/// once, through [`Results::iter`] or [`Results::list`]; the size is computed
/// separately with a count query. Scripts and procedure calls producing several
/// result sets are walked in order and their update counts summed.
pub struct Results<'c, E: Entity, C: Connection> {
    connection: &'c mut C,
    schema: Arc<Schema>,
    sql: String,
    params: Vec<Value>,
    /// Rows inserted by the statement are read back by their generated key.
    generated_keys: bool,
    /// Statement before pagination.
    origin: Option<(String, Vec<Value>)>,
    /// Page number and page size.
    page: Option<(u64, u64)>,
    taken: bool,
    size: Option<u64>,
    total: Option<u64>,
    update_count: Option<u64>,
    list: Option<List<E>>,
}

impl<'c, E: Entity, C: Connection> Results<'c, E, C> {
    pub fn new(
        connection: &'c mut C,
        schema: Arc<Schema>,
        sql: String,
        params: Vec<Value>,
        generated_keys: bool,
    ) -> Self {
        Self {
            connection,
            schema,
            sql,
            params,
            generated_keys,
            origin: None,
            page: None,
            taken: false,
            size: None,
            total: None,
            update_count: None,
            list: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Start the statement, the records can be walked only once.
    pub fn iter(&mut self) -> Result<ResultsIter<'_, 'c, E, C>> {
        if self.taken {
            return Err(Error::Usage(format!(
                "The results of `{}` were already iterated",
                truncate_long!(self.sql)
            )));
        }
        self.taken = true;
        log::debug!("{}", truncate_long!(self.sql));
        let query = self
            .connection
            .prepare_with(self.sql.clone(), &self.params)?;
        Ok(ResultsIter {
            results: self,
            query,
            last: None,
            affected: 0,
            done: false,
        })
    }

    /// Every record, read on the first call and kept for the next ones.
    pub fn list(&mut self) -> Result<&List<E>> {
        let list = match self.list.take() {
            Some(list) => list,
            None => {
                let items = self.iter()?.collect::<Result<Vec<_>>>()?;
                let total = if self.page.is_some() {
                    self.total()?
                } else {
                    items.len() as u64
                };
                List { items, total }
            }
        };
        Ok(self.list.insert(list))
    }

    /// Number of records, limited to the page when paged.
    pub fn size(&mut self) -> Result<u64> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let size = if let Some(list) = &self.list {
            list.len() as u64
        } else if let Some((page, per_page)) = self.page {
            page_size(self.total()?, page, per_page)
        } else {
            let (sql, params) = (self.sql.clone(), self.params.clone());
            self.count(&sql, &params)?
        };
        self.size = Some(size);
        Ok(size)
    }

    /// Number of records of the statement before pagination.
    pub fn total(&mut self) -> Result<u64> {
        if let Some(total) = self.total {
            return Ok(total);
        }
        let total = match self.origin.clone() {
            Some((sql, params)) => self.count(&sql, &params)?,
            None => self.size()?,
        };
        self.total = Some(total);
        Ok(total)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// Rows modified by the statement, known once the records were walked to the end.
    pub fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    fn count(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut count = String::new();
        self.connection
            .driver()
            .sql_writer()
            .write_count(&mut count, &count_statement(sql));
        let Some(row) = fetch_first(self.connection, count, params)? else {
            return Ok(0);
        };
        match row.values.into_vec().into_iter().next() {
            Some(value) => Ok(u64::try_from_value(value)?),
            None => Ok(0),
        }
    }

    /// Restrict the results to page `page` (starting from 1) of `per_page` records.
    ///
    /// Statements that cannot be paged are returned unchanged and run whole.
    pub fn paged(self, page: u64, per_page: u64) -> Result<Results<'c, E, C>> {
        if page == 0 || per_page == 0 {
            return Err(Error::Usage(format!(
                "Invalid page {} of {} records, both start from 1",
                page, per_page
            )));
        }
        if self.taken || self.page.is_some() {
            return Err(Error::Usage(
                "Only fresh, not yet paged, results can be paged".into(),
            ));
        }
        let dialect = self.schema.dialect.ok_or_else(|| {
            Error::Configuration(format!(
                "No pagination dialect for {}, declare it in its TableDef",
                self.schema.type_name
            ))
        })?;
        let keys = self.schema.key_names();
        let paged = dialect.pager().paginate(&Page {
            sql: &self.sql,
            params: &self.params,
            keys: &keys,
            number: page,
            size: per_page,
        })?;
        let Some((sql, params)) = paged else {
            log::debug!(
                "`{}` cannot be paged, it runs whole",
                truncate_long!(self.sql)
            );
            return Ok(self);
        };
        Ok(Results {
            origin: Some((self.sql, self.params)),
            page: Some((page, per_page)),
            ..Results::new(
                self.connection,
                self.schema,
                sql,
                params,
                self.generated_keys,
            )
        })
    }
}

/// Statement without grouping, ordering and trailing semicolons, fit for a count.
fn count_statement(sql: &str) -> String {
    GROUPING
        .replace(sql, "")
        .trim()
        .trim_end_matches(';')
        .trim_end()
        .to_string()
}

/// Records on page `page` when the statement returns `total` records.
fn page_size(total: u64, page: u64, per_page: u64) -> u64 {
    let start = (page - 1) * per_page;
    if start >= total {
        0
    } else {
        per_page.min(total - start)
    }
}

/// Iterator over the records of [`Results`].
pub struct ResultsIter<'r, 'c, E: Entity, C: Connection> {
    results: &'r mut Results<'c, E, C>,
    query: Query<C::Driver>,
    /// Last record returned, target of [`ResultsIter::remove`].
    last: Option<Record<E>>,
    affected: u64,
    done: bool,
}

impl<'r, 'c, E: Entity, C: Connection> ResultsIter<'r, 'c, E, C> {
    /// Delete the record last returned.
    pub fn remove(&mut self) -> Result<u64> {
        let Some(mut record) = self.last.take() else {
            return Err(Error::Usage(
                "No record to remove, call next() first".into(),
            ));
        };
        record.delete(self.results.connection)
    }

    fn yielded(&mut self, record: Result<Record<E>>) -> Option<Result<Record<E>>> {
        if let Ok(record) = &record {
            self.last = Some(record.clone());
        }
        Some(record)
    }
}

impl<'r, 'c, E: Entity, C: Connection> Iterator for ResultsIter<'r, 'c, E, C> {
    type Item = Result<Record<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        let schema = self.results.schema.clone();
        while !self.done {
            let item = match self.results.connection.step(&mut self.query) {
                Ok(item) => item,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            match item {
                None => {
                    self.done = true;
                    self.results.update_count = Some(self.affected);
                }
                Some(QueryResult::Row(row)) => {
                    return self.yielded(Record::from_row(schema, row));
                }
                Some(QueryResult::Affected(affected)) => {
                    self.affected += affected.rows_affected;
                    let Some(id) = affected.last_affected_id else {
                        continue;
                    };
                    if !self.results.generated_keys {
                        continue;
                    }
                    if schema.keys.len() != 1 {
                        log::debug!(
                            "{} has {} key columns, the generated key {} is not read back",
                            schema.type_name,
                            schema.keys.len(),
                            id
                        );
                        continue;
                    }
                    match Record::load(self.results.connection, &schema, &[Value::Int64(Some(id))])
                    {
                        Ok(Some(record)) => return self.yielded(Ok(record)),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        }
        None
    }
}

/// Records read by [`Results::list`].
#[derive(Clone, Debug)]
pub struct List<E: Entity> {
    items: Vec<Record<E>>,
    total: u64,
}

impl<E: Entity> List<E> {
    /// Records of the statement before pagination, the length of the list when not paged.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn into_vec(self) -> Vec<Record<E>> {
        self.items
    }
}

impl<E: Entity> Deref for List<E> {
    type Target = [Record<E>];
    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<'a, E: Entity> IntoIterator for &'a List<E> {
    type Item = &'a Record<E>;
    type IntoIter = std::slice::Iter<'a, Record<E>>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
