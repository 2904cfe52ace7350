use crate::{
    Connection, Dialect, Driver, Error, Executor, Many, Record, Result, Results, Schema, SqlWriter,
    Value, executor::execute, schema_for, separated_by,
};
use std::sync::Arc;

/// Table level metadata of a mapped type.
#[derive(Debug, Clone, Default)]
pub struct TableDef {
    /// Explicit table name, otherwise the type name with a trailing "s".
    pub name: Option<&'static str>,
    /// Connection string resolved by [`ConnectionResolver`](crate::ConnectionResolver).
    pub connection: &'static str,
    /// The application assigns key values itself, they are written on insert and never read back.
    pub save_keys: bool,
    /// Pagination dialect, derived from the product name when absent.
    pub dialect: Option<Dialect>,
    /// Fields in the order returned by [`Entity::row`].
    pub columns: Vec<ColumnDef>,
}

/// Field level metadata.
#[derive(Debug, Clone, Default)]
pub struct ColumnDef {
    pub name: &'static str,
    /// Maximum length of textual values.
    pub length: Option<u32>,
    pub not_null: bool,
    /// Native column type, overriding the catalog lookup.
    pub sql_type: Option<&'static str>,
    /// The field is not persisted.
    pub ignore: bool,
    pub key: bool,
    /// To-many relationships, only allowed on key columns.
    pub many: Vec<Many>,
}

impl ColumnDef {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }
    pub fn sql_type(mut self, sql_type: &'static str) -> Self {
        self.sql_type = Some(sql_type);
        self
    }
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }
    pub fn many(mut self, many: Many) -> Self {
        self.many.push(many);
        self
    }
}

/// A type mapped to a table.
///
/// Implementors describe their table through [`Entity::table`] and expose
/// their fields as [`Value`]s, in the same order as the declared columns.
/// Everything else is provided: the schema is built and cached on first use,
/// and the type level queries below return [`Record`]s or a lazy [`Results`]
/// cursor.
///
/// ```rust,ignore
/// #[derive(Default, Clone)]
/// struct Document {
///     id: Option<i64>,
///     title: Option<String>,
/// }
///
/// impl Entity for Document {
///     fn table() -> TableDef {
///         TableDef {
///             connection: "DOCUMENTS_DB",
///             columns: vec![
///                 ColumnDef::new("id").key(),
///                 ColumnDef::new("title").length(50),
///             ],
///             ..Default::default()
///         }
///     }
///     fn row(&self) -> Vec<Value> {
///         vec![self.id.as_value(), self.title.clone().as_value()]
///     }
///     fn set_field(&mut self, index: usize, value: Value) -> anyhow::Result<()> {
///         match index {
///             0 => self.id = AsValue::try_from_value(value)?,
///             1 => self.title = AsValue::try_from_value(value)?,
///             _ => {}
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Entity: Default + Clone + Send + 'static {
    fn table() -> TableDef;

    /// Current value of every declared field, ignored ones included.
    fn row(&self) -> Vec<Value>;

    /// Assign the field at `index` of [`Entity::row`].
    fn set_field(&mut self, index: usize, value: Value) -> anyhow::Result<()>;

    /// Called after the entity was reconstructed from a row.
    fn post_construct(&mut self) -> Result<()> {
        Ok(())
    }

    fn schema<C: Connection>(connection: &mut C) -> Result<Arc<Schema>> {
        schema_for::<Self, C>(connection)
    }

    /// Record with the given key values, a new record when no row matches.
    fn find<C: Connection>(connection: &mut C, keys: &[Value]) -> Result<Record<Self>> {
        let schema = Self::schema(connection)?;
        if keys.len() != schema.keys.len() {
            return Err(Error::Usage(format!(
                "{} has {} key columns but {} key values were given",
                schema.type_name,
                schema.keys.len(),
                keys.len()
            )));
        }
        Ok(Record::load(connection, &schema, keys)?.unwrap_or_else(|| Record::transient(schema)))
    }

    /// Rows matching every non null field of `example`.
    fn find_by_example<'c, C: Connection>(
        connection: &'c mut C,
        example: &Self,
    ) -> Result<Results<'c, Self, C>> {
        let schema = Self::schema(connection)?;
        let row = example.row();
        let mut params = Vec::new();
        let mut conditions = String::new();
        separated_by(
            &mut conditions,
            schema.columns.iter(),
            |out, column| {
                let value = &row[column.field];
                if !value.is_null() {
                    out.push_str(&column.name);
                    out.push_str(" = ?");
                    params.push(value.clone());
                }
            },
            " AND ",
        );
        Self::find_where(connection, &conditions, &params)
    }

    /// Rows matching `conditions`, a trusted SQL fragment placed after `WHERE`.
    fn find_where<'c, C: Connection>(
        connection: &'c mut C,
        conditions: &str,
        params: &[Value],
    ) -> Result<Results<'c, Self, C>> {
        let schema = Self::schema(connection)?;
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_select_where(&mut sql, &schema, conditions, false);
        Self::sql(connection, sql, params)
    }

    fn find_all<'c, C: Connection>(connection: &'c mut C) -> Result<Results<'c, Self, C>> {
        Self::find_where(connection, "", &[])
    }

    /// First row matching `conditions`, a new record when none does.
    fn find_first<C: Connection>(
        connection: &mut C,
        conditions: &str,
        params: &[Value],
    ) -> Result<Record<Self>> {
        let schema = Self::schema(connection)?;
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_select_where(&mut sql, &schema, conditions, false);
        Self::sql_first(connection, sql, params)
    }

    /// Row matching `conditions` with the highest key, a new record when none does.
    fn find_last<C: Connection>(
        connection: &mut C,
        conditions: &str,
        params: &[Value],
    ) -> Result<Record<Self>> {
        let schema = Self::schema(connection)?;
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_select_where(&mut sql, &schema, conditions, true);
        Self::sql_first(connection, sql, params)
    }

    /// Cursor over an arbitrary statement returning rows of this type.
    ///
    /// An `INSERT` enables the generated keys path: each inserted row is read
    /// back by its new key. `UPDATE` statements are rejected, use [`update`].
    fn sql<'c, C: Connection>(
        connection: &'c mut C,
        sql: impl Into<String>,
        params: &[Value],
    ) -> Result<Results<'c, Self, C>> {
        let sql = sql.into();
        let lower = format!(" {}", sql).to_lowercase();
        if lower.contains(" update ") || lower.contains(";update ") {
            return Err(Error::Usage(
                "Cannot return records from an UPDATE statement, only the update count is available: use trove::update".into(),
            ));
        }
        let generated_keys = lower.contains(" insert ") || lower.contains(";insert ");
        let schema = Self::schema(connection)?;
        Ok(Results::new(
            connection,
            schema,
            sql,
            params.to_vec(),
            generated_keys,
        ))
    }

    /// First record returned by `sql`, a new record when there is none.
    fn sql_first<C: Connection>(
        connection: &mut C,
        sql: impl Into<String>,
        params: &[Value],
    ) -> Result<Record<Self>> {
        let mut results = Self::sql(connection, sql, params)?;
        let schema = results.schema().clone();
        let first = results.iter()?.next();
        match first {
            Some(record) => record,
            None => Ok(Record::transient(schema)),
        }
    }

    /// Call a stored procedure, `call` is the invocation without the driver specific syntax: `archive(?)`.
    ///
    /// The cursor walks every result set the call produces and sums the update counts.
    fn exec<'c, C: Connection>(
        connection: &'c mut C,
        call: &str,
        params: &[Value],
    ) -> Result<Results<'c, Self, C>> {
        let schema = Self::schema(connection)?;
        let mut sql = String::new();
        connection.driver().sql_writer().write_call(&mut sql, call);
        Ok(Results::new(
            connection,
            schema,
            sql,
            params.to_vec(),
            false,
        ))
    }

    /// Delete the rows matching `conditions`, every row when empty.
    fn delete_all<C: Connection>(
        connection: &mut C,
        conditions: &str,
        params: &[Value],
    ) -> Result<u64> {
        let schema = Self::schema(connection)?;
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_delete_where(&mut sql, &schema, conditions);
        Ok(execute(connection, sql, params)?.rows_affected)
    }
}

/// Run statements that return no records, the result is the accumulated update count.
pub fn update<C: Connection>(connection: &mut C, sql: impl Into<String>, params: &[Value]) -> Result<u64> {
    Ok(execute(connection, sql.into(), params)?.rows_affected)
}
