use crate::{Driver, Prepared, Value, truncate_long};
use anyhow::{Error, Result};
use std::{
    fmt::{self, Display},
    ops::AddAssign,
    sync::Arc,
};

/// Statement handed to [`Executor::step`](crate::Executor::step).
///
/// `Raw` text is compiled by the driver on the first step.
#[derive(Debug)]
pub enum Query<D: Driver> {
    Raw(String),
    Prepared(D::Prepared),
}

impl<D: Driver> Query<D> {
    /// Append a positional parameter, raw text takes none.
    pub fn bind(&mut self, value: impl Into<Value>) -> Result<&mut Self> {
        match self {
            Query::Prepared(prepared) => {
                prepared.bind(value)?;
                Ok(self)
            }
            Query::Raw(..) => Err(Error::msg("Parameters need a prepared statement")),
        }
    }
}

impl<D: Driver> Display for Query<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Raw(sql) => f.write_str(&truncate_long!(sql)),
            Query::Prepared(prepared) => prepared.fmt(f),
        }
    }
}

/// Effect of one modifying statement.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
    /// Generated key, reported by inserts only.
    pub last_affected_id: Option<i64>,
}

/// Sums the counts, the latest generated key wins.
impl AddAssign for RowsAffected {
    fn add_assign(&mut self, other: RowsAffected) {
        self.rows_affected += other.rows_affected;
        if other.last_affected_id.is_some() {
            self.last_affected_id = other.last_affected_id;
        }
    }
}

/// Column labels of a statement, shared by all of its rows.
pub type RowNames = Arc<[String]>;
pub type Row = Box<[Value]>;

#[derive(Debug, Clone)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    /// Value of the column labeled `name`, compared ignoring ASCII case.
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }
}

/// Items produced while stepping a query, in statement order.
#[derive(Debug)]
pub enum QueryResult {
    Row(RowLabeled),
    Affected(RowsAffected),
}

impl From<RowLabeled> for QueryResult {
    fn from(value: RowLabeled) -> Self {
        QueryResult::Row(value)
    }
}

impl From<RowsAffected> for QueryResult {
    fn from(value: RowsAffected) -> Self {
        QueryResult::Affected(value)
    }
}
