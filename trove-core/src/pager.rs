use crate::{Error, Result, Value};
use regex::Regex;
use std::{fmt::Write, sync::LazyLock};

static SELECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bselect\b").expect("valid SELECT pattern"));
static MUTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s;](update|insert|delete)\s").expect("valid mutation pattern")
});
static FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\b").expect("valid FROM pattern"));
static WHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwhere\b").expect("valid WHERE pattern"));
static GROUP_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bgroup\s+by\b").expect("valid GROUP BY pattern"));
static ORDER_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\border\s+by\b").expect("valid ORDER BY pattern"));

/// SQL dialect family, decides how a query is split into pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    MsSql,
    Sqlite,
}

impl Dialect {
    /// Dialect of a database from the product name it reports.
    pub fn from_product_name(name: &str) -> Option<Dialect> {
        let name = name.to_lowercase();
        if name.contains("mysql") {
            Some(Dialect::MySql)
        } else if name.contains("microsoft") {
            Some(Dialect::MsSql)
        } else if name.contains("sqlite") {
            Some(Dialect::Sqlite)
        } else {
            None
        }
    }

    pub fn pager(&self) -> &'static dyn Pager {
        match self {
            Dialect::MySql | Dialect::Sqlite => &OffsetPager,
            Dialect::MsSql => &WindowPager,
        }
    }
}

/// A page request over a SELECT statement.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub sql: &'a str,
    pub params: &'a [Value],
    /// Key columns of the selected type, the default ordering.
    pub keys: &'a [&'a str],
    /// Starts from 1.
    pub number: u64,
    pub size: u64,
}

/// Rewrites a statement so that it returns a single page.
pub trait Pager: Send + Sync {
    /// The statement and parameters returning `page`, `None` when the statement cannot be paged and must run whole.
    fn paginate(&self, page: &Page) -> Result<Option<(String, Vec<Value>)>>;
}

/// Pieces of a single, non mutating SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectParts<'a> {
    /// The statement without trailing semicolons.
    pub statement: &'a str,
    pub fields: &'a str,
    pub table: &'a str,
    pub condition: &'a str,
    /// The full `ORDER BY ...` clause, empty when missing.
    pub order: &'a str,
}

impl<'a> SelectParts<'a> {
    /// Split `sql` into its clauses.
    ///
    /// Statements holding more than one SELECT, or any UPDATE, INSERT or DELETE,
    /// are not eligible and yield `None`. GROUP BY is refused with a usage error.
    pub fn parse(sql: &'a str) -> Result<Option<SelectParts<'a>>> {
        let padded = format!(" {} ", sql.replace(';', " "));
        if SELECT.find_iter(&padded).count() != 1 || MUTATION.is_match(&padded) {
            return Ok(None);
        }
        let statement = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
        let lower = statement.to_ascii_lowercase();
        let Some(select) = lower.find("select") else {
            return Ok(None);
        };
        let Some(from) = FROM.find_iter(statement).last().map(|m| m.start()) else {
            return Ok(None);
        };
        if from < select {
            return Ok(None);
        }
        let after = |re: &Regex| {
            re.find_iter(statement)
                .last()
                .map(|m| (m.start(), m.end()))
                .filter(|(start, _)| *start > from)
        };
        if after(&GROUP_BY).is_some() {
            return Err(Error::Usage(
                "Cannot paginate a query with a GROUP BY clause".into(),
            ));
        }
        let mut rest = statement;
        let mut order = "";
        if let Some((start, _)) = after(&ORDER_BY) {
            order = statement[start..].trim();
            rest = &statement[..start];
        }
        let mut condition = "";
        if let Some((start, end)) = after(&WHERE) {
            if start < rest.len() {
                condition = rest[end..].trim();
                rest = &rest[..start];
            }
        }
        Ok(Some(SelectParts {
            statement,
            fields: rest[select + "select".len()..from].trim(),
            table: rest[from + "from".len()..].trim(),
            condition,
            order,
        }))
    }
}

fn write_default_order(out: &mut String, keys: &[&str]) {
    out.push_str("ORDER BY ");
    if keys.is_empty() {
        out.push_str("id");
    } else {
        out.push_str(&keys.join(", "));
    }
}

/// `LIMIT offset,count` appended to the statement.
#[derive(Debug, Default, Clone, Copy)]
pub struct OffsetPager;

impl Pager for OffsetPager {
    fn paginate(&self, page: &Page) -> Result<Option<(String, Vec<Value>)>> {
        let Some(parts) = SelectParts::parse(page.sql)? else {
            return Ok(None);
        };
        let mut sql = parts.statement.to_string();
        if parts.order.is_empty() {
            sql.push(' ');
            write_default_order(&mut sql, page.keys);
        }
        let _ = write!(
            sql,
            " LIMIT {},{}",
            (page.number - 1) * page.size,
            page.size
        );
        Ok(Some((sql, page.params.to_vec())))
    }
}

/// `TOP n` select excluding, through a nested `TOP` select, the rows of the previous pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowPager;

impl Pager for WindowPager {
    fn paginate(&self, page: &Page) -> Result<Option<(String, Vec<Value>)>> {
        let Some(parts) = SelectParts::parse(page.sql)? else {
            return Ok(None);
        };
        let mut order = parts.order.to_string();
        if order.is_empty() {
            write_default_order(&mut order, page.keys);
        }
        let mut sql = String::new();
        let _ = write!(
            sql,
            "SELECT TOP {} {} FROM {}",
            page.size, parts.fields, parts.table
        );
        if page.number == 1 {
            if !parts.condition.is_empty() {
                let _ = write!(sql, " WHERE ({})", parts.condition);
            }
            let _ = write!(sql, " {}", order);
            return Ok(Some((sql, page.params.to_vec())));
        }
        let compare = match page.keys {
            [] => "id".to_string(),
            [key] => key.to_string(),
            keys => format!(
                "({})",
                keys.iter()
                    .map(|k| format!("CONVERT(varchar, {})", k))
                    .collect::<Vec<_>>()
                    .join(" + ' ' + ")
            ),
        };
        sql.push_str(" WHERE ");
        if !parts.condition.is_empty() {
            let _ = write!(sql, "({}) AND ", parts.condition);
        }
        let _ = write!(
            sql,
            "{} NOT IN ( SELECT TOP {} {} FROM {}",
            compare,
            (page.number - 1) * page.size,
            compare,
            parts.table
        );
        if !parts.condition.is_empty() {
            let _ = write!(sql, " WHERE ({})", parts.condition);
        }
        let _ = write!(sql, " {} ) {}", order, order);
        // The condition appears twice
        let params = page.params.iter().chain(page.params).cloned().collect();
        Ok(Some((sql, params)))
    }
}
