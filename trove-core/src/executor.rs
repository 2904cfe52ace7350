use crate::{Driver, Query, QueryResult, RowLabeled, RowsAffected, Value, truncate_long};
use anyhow::Result;

/// Runs queries against a backend, one result item at a time.
///
/// Execution is pull based: every call to [`Executor::step`] advances the
/// query until it produces the next row or the effect of a modifying
/// statement. A script holding several statements yields the items of each
/// statement in order, then `None`. Between two steps the executor is free to
/// run other queries, a cursor uses that to reload records while it iterates.
pub trait Executor: Send + Sized {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    /// Compile `sql` into a statement handle ready for binding.
    fn prepare(&mut self, sql: String) -> Result<Query<Self::Driver>>;

    /// Advance `query` to its next item, `None` once every statement ran to completion.
    fn step(&mut self, query: &mut Query<Self::Driver>) -> Result<Option<QueryResult>>;

    /// Prepare `sql` and bind `params` positionally.
    fn prepare_with(&mut self, sql: String, params: &[Value]) -> Result<Query<Self::Driver>> {
        let mut query = self.prepare(sql)?;
        for value in params {
            query.bind(value.clone())?;
        }
        Ok(query)
    }

    /// Execute the query and returns the rows.
    fn fetch(&mut self, mut query: Query<Self::Driver>) -> Result<Vec<RowLabeled>> {
        let mut rows = Vec::new();
        while let Some(item) = self.step(&mut query)? {
            if let QueryResult::Row(row) = item {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(&mut self, mut query: Query<Self::Driver>) -> Result<RowsAffected> {
        let mut result = RowsAffected::default();
        while let Some(item) = self.step(&mut query)? {
            if let QueryResult::Affected(affected) = item {
                result += affected;
            }
        }
        Ok(result)
    }
}

/// Prepare, bind and run `sql` to completion, logging the statement.
pub(crate) fn execute<E: Executor>(
    executor: &mut E,
    sql: String,
    params: &[Value],
) -> crate::Result<RowsAffected> {
    log::debug!("{}", truncate_long!(sql));
    let query = executor.prepare_with(sql, params)?;
    Ok(executor.execute(query)?)
}

/// First row produced by `sql`, the rest of the statement is abandoned.
pub(crate) fn fetch_first<E: Executor>(
    executor: &mut E,
    sql: String,
    params: &[Value],
) -> crate::Result<Option<RowLabeled>> {
    log::debug!("{}", truncate_long!(sql));
    let mut query = executor.prepare_with(sql, params)?;
    while let Some(item) = executor.step(&mut query)? {
        if let QueryResult::Row(row) = item {
            return Ok(Some(row));
        }
    }
    Ok(None)
}
