use crate::{
    Column, Connection, Driver, Entity, Error, Relation, Result, Results, RowLabeled, Schema,
    SqlWriter, ValidationError, Value,
    executor::{execute, fetch_first},
};
use regex::Regex;
use std::{
    fmt::{self, Debug, Display},
    ops::{Deref, DerefMut},
    sync::{Arc, LazyLock},
};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w!#$%&'*+/=?^`{|}~-]+(\.[\w!#$%&'*+/=?^`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
        .expect("valid email pattern")
});

/// Whether `value` looks like an email address, meant for [`Record::validate`].
pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// An entity together with its persistence state.
///
/// The record keeps a snapshot of the values last read from or written to the
/// database. Comparing the entity with the snapshot tells which columns are
/// dirty, and the snapshot keys identify the row even after the key fields
/// were edited. A record is either new (not backed by any row) or persistent.
#[derive(Clone)]
pub struct Record<E: Entity> {
    entity: E,
    original: E,
    new: bool,
    /// Messages of failed caller checks, by column.
    declared: Vec<Option<String>>,
    /// Messages of the last validation pass, by column.
    failures: Vec<Option<String>>,
    schema: Arc<Schema>,
}

fn assign<E: Entity>(entity: &mut E, column: &Column, value: Value) -> Result<()> {
    entity
        .set_field(column.field, value)
        .map_err(|e| Error::Mapping {
            column: column.name.clone(),
            reason: format!("{e:#}"),
        })
}

impl<E: Entity> Record<E> {
    /// New record with default field values.
    pub fn new<C: Connection>(connection: &mut C) -> Result<Self> {
        Ok(Self::transient(E::schema(connection)?))
    }

    /// New record with the key fields assigned, nothing is read from the database.
    pub fn with_keys<C: Connection>(connection: &mut C, keys: &[Value]) -> Result<Self> {
        let mut record = Self::new(connection)?;
        if keys.len() != record.schema.keys.len() {
            return Err(Error::Usage(format!(
                "{} has {} key columns but {} key values were given",
                record.schema.type_name,
                record.schema.keys.len(),
                keys.len()
            )));
        }
        let schema = record.schema.clone();
        for (column, value) in schema.key_columns().zip(keys) {
            assign(&mut record.entity, column, value.clone())?;
        }
        Ok(record)
    }

    pub fn transient(schema: Arc<Schema>) -> Self {
        let len = schema.columns.len();
        Self {
            entity: E::default(),
            original: E::default(),
            new: true,
            declared: vec![None; len],
            failures: vec![None; len],
            schema,
        }
    }

    /// Persistent record built from a row, labels are matched to columns ignoring case and the unknown ones are skipped.
    pub fn from_row(schema: Arc<Schema>, row: RowLabeled) -> Result<Self> {
        let mut entity = E::default();
        let RowLabeled { labels, values } = row;
        for (label, value) in labels.iter().zip(values) {
            if let Some((_, column)) = schema.column(label) {
                assign(&mut entity, column, value)?;
            }
        }
        let original = entity.clone();
        entity.post_construct()?;
        let mut record = Self::transient(schema);
        record.entity = entity;
        record.original = original;
        record.new = false;
        Ok(record)
    }

    /// Record stored under `keys`, if any.
    pub fn load<C: Connection>(
        connection: &mut C,
        schema: &Arc<Schema>,
        keys: &[Value],
    ) -> Result<Option<Self>> {
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_select_by_keys(&mut sql, schema);
        fetch_first(connection, sql, keys)?
            .map(|row| Self::from_row(schema.clone(), row))
            .transpose()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is_new(&self) -> bool {
        self.new
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_inner(self) -> E {
        self.entity
    }

    /// Current values of the key columns.
    pub fn key_values(&self) -> Vec<Value> {
        Self::keys_of(&self.schema, &self.entity)
    }

    fn keys_of(schema: &Schema, entity: &E) -> Vec<Value> {
        let row = entity.row();
        schema
            .key_columns()
            .map(|c| row[c.field].clone())
            .collect()
    }

    /// Positions of the columns whose value differs from the snapshot.
    fn changed_columns(&self) -> Vec<usize> {
        let current = self.entity.row();
        let original = self.original.row();
        self.schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| current[c.field] != original[c.field])
            .map(|(i, _)| i)
            .collect()
    }

    pub fn locally_modified(&self) -> bool {
        !self.changed_columns().is_empty()
    }

    pub fn locally_modified_column(&self, column: &str) -> Result<bool> {
        let (_, column) = self.column(column)?;
        Ok(self.entity.row()[column.field] != self.original.row()[column.field])
    }

    fn column(&self, name: &str) -> Result<(usize, &Column)> {
        self.schema.column(name).ok_or_else(|| {
            Error::Configuration(format!(
                "{} has no column named {}",
                self.schema.type_name, name
            ))
        })
    }

    /// Whether the stored row differs from the snapshot, a missing row is not a modification.
    pub fn remotely_modified<C: Connection>(&self, connection: &mut C) -> Result<bool> {
        if self.new {
            return Ok(false);
        }
        let Some(stored) = Self::load(
            connection,
            &self.schema,
            &Self::keys_of(&self.schema, &self.original),
        )?
        else {
            return Ok(false);
        };
        let stored = stored.original.row();
        let original = self.original.row();
        Ok(self
            .schema
            .columns
            .iter()
            .any(|c| stored[c.field] != original[c.field]))
    }

    /// Write the changes to the database, returns the number of rows affected.
    ///
    /// A new record is inserted and takes the key generated by the database,
    /// unless the type saves its own keys. A persistent record updates the
    /// changed columns only.
    pub fn save<C: Connection>(&mut self, connection: &mut C) -> Result<u64> {
        let schema = self.schema.clone();
        let mut changed = self.changed_columns();
        if changed.is_empty() {
            return Ok(0);
        }
        if !self.new && !schema.save_keys && changed.iter().any(|&i| schema.is_key(i)) {
            let original = self.original.row();
            for column in schema.key_columns() {
                assign(&mut self.entity, column, original[column.field].clone())?;
            }
            log::warn!(
                "{} cannot change the key of a stored row, the key fields were restored",
                self
            );
            changed = self.changed_columns();
            if changed.is_empty() {
                return Ok(0);
            }
        }
        self.run_validation()?;
        let writer = connection.driver().sql_writer();
        let row = self.entity.row();
        let mut sql = String::new();
        let affected = if self.new {
            let columns: Vec<usize> = (0..schema.columns.len())
                .filter(|&i| schema.save_keys || !schema.is_key(i))
                .collect();
            writer.write_insert(&mut sql, &schema, &columns);
            let params: Vec<Value> = columns
                .iter()
                .map(|&i| row[schema.columns[i].field].clone())
                .collect();
            let result = execute(connection, sql, &params)?;
            if !schema.save_keys {
                match (result.last_affected_id, schema.key_columns().next()) {
                    (Some(id), Some(key)) => {
                        assign(&mut self.entity, key, Value::Int64(Some(id)))?;
                    }
                    (None, Some(..)) => log::debug!(
                        "No generated key was reported while inserting into {}",
                        schema.table
                    ),
                    _ => {}
                }
            }
            result.rows_affected
        } else {
            writer.write_update(&mut sql, &schema, &changed);
            let params: Vec<Value> = changed
                .iter()
                .map(|&i| row[schema.columns[i].field].clone())
                .chain(Self::keys_of(&schema, &self.original))
                .collect();
            execute(connection, sql, &params)?.rows_affected
        };
        self.original = self.entity.clone();
        self.new = false;
        Ok(affected)
    }

    /// Delete the stored row, the record becomes new with default values.
    pub fn delete<C: Connection>(&mut self, connection: &mut C) -> Result<u64> {
        if self.new {
            return Ok(0);
        }
        self.run_validation()?;
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_delete(&mut sql, &self.schema);
        let keys = Self::keys_of(&self.schema, &self.original);
        let affected = execute(connection, sql, &keys)?.rows_affected;
        self.clear();
        Ok(affected)
    }

    /// Read the row again, a record whose row disappeared is cleared.
    pub fn reload<C: Connection>(&mut self, connection: &mut C) -> Result<()> {
        if self.new {
            self.clear();
            return Ok(());
        }
        let keys = Self::keys_of(&self.schema, &self.original);
        match Self::load(connection, &self.schema, &keys)? {
            Some(stored) => {
                self.entity = stored.entity;
                self.original = stored.original;
                self.new = false;
            }
            None => self.clear(),
        }
        Ok(())
    }

    /// Discard the local changes.
    pub fn reset(&mut self) {
        self.entity = self.original.clone();
    }

    /// Default values in both the entity and the snapshot, the record becomes new.
    pub fn clear(&mut self) {
        self.entity = E::default();
        self.original = E::default();
        self.new = true;
        self.clear_validation();
    }

    /// Take the values, the snapshot and the state of `other`.
    pub fn set(&mut self, other: &Record<E>) {
        self.entity = other.entity.clone();
        self.original = other.original.clone();
        self.new = other.new;
    }

    /// New record holding the same values, saving it inserts a new row.
    pub fn duplicate(&self) -> Self {
        let mut record = Self::transient(self.schema.clone());
        record.entity = self.entity.clone();
        record
    }

    /// Record the outcome of a caller check on `column`, `test` is returned.
    ///
    /// A failed check makes the next save or delete fail until the check passes
    /// or [`Record::clear_validation`] is called.
    pub fn validate(&mut self, column: &str, test: bool, message: impl Into<String>) -> Result<bool> {
        let (index, _) = self.column(column)?;
        self.declared[index] = if test { None } else { Some(message.into()) };
        Ok(test)
    }

    pub fn invalid_messages(&self) -> Vec<&str> {
        self.failures
            .iter()
            .chain(&self.declared)
            .filter_map(|v| v.as_deref())
            .collect()
    }

    pub fn invalid_columns(&self) -> Vec<&str> {
        self.schema
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.failures[*i].is_some() || self.declared[*i].is_some())
            .map(|(_, c)| c.name.as_str())
            .collect()
    }

    pub fn clear_validation(&mut self) {
        self.declared.fill(None);
        self.failures.fill(None);
    }

    /// Check nullability and lengths, then collect the failed caller checks.
    fn run_validation(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        let row = self.entity.row();
        let mut error = ValidationError::default();
        for (i, column) in schema.columns.iter().enumerate() {
            let value = &row[column.field];
            // Generated by the database on insert
            let generated = self.new && !schema.save_keys && schema.is_key(i);
            let failure = if column.not_null && value.is_null() && !generated {
                Some(format!("{} cannot be null", column.name))
            } else {
                match (column.length, value.text_len()) {
                    (Some(max), Some(len)) if len > max as usize => Some(format!(
                        "{} cannot be longer than {}",
                        column.name, max
                    )),
                    _ => None,
                }
            };
            if let Some(message) = &failure {
                error.push(column.name.clone(), message.clone());
            }
            if let Some(message) = &self.declared[i] {
                error.push(column.name.clone(), message.clone());
            }
            self.failures[i] = failure;
        }
        if error.is_empty() {
            Ok(())
        } else {
            Err(error.into())
        }
    }

    /// Records of `T` related to this one through a to-many relationship on a key column.
    pub fn find_many<'c, T: Entity, C: Connection>(
        &self,
        connection: &'c mut C,
    ) -> Result<Results<'c, T, C>> {
        self.find_many_where(connection, "", &[])
    }

    /// Same as [`Record::find_many`], narrowed by `conditions`.
    pub fn find_many_where<'c, T: Entity, C: Connection>(
        &self,
        connection: &'c mut C,
        conditions: &str,
        params: &[Value],
    ) -> Result<Results<'c, T, C>> {
        let target = T::schema(connection)?;
        let relation = Relation::resolve(&self.schema, &target, conditions)?;
        let key = self.original.row()[self.schema.columns[relation.key].field].clone();
        let params: Vec<Value> = std::iter::once(key).chain(params.iter().cloned()).collect();
        T::sql(connection, relation.sql, &params)
    }
}

impl<E: Entity> Deref for Record<E> {
    type Target = E;
    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

impl<E: Entity> DerefMut for Record<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entity
    }
}

impl<E: Entity> Display for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.schema.type_name)?;
        if self.new {
            f.write_str("new")?;
        } else {
            for (i, key) in self.key_values().iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", key)?;
            }
        }
        f.write_str("]")
    }
}

impl<E: Entity> Debug for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.schema.type_name)
            .field("new", &self.new)
            .field("row", &self.entity.row())
            .field("original", &self.original.row())
            .finish()
    }
}

impl<E: Entity> PartialEq for Record<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key_values() == other.key_values()
            && self.entity.row() == other.entity.row()
            && self.original.row() == other.original.row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AsValue, ColumnDef, GenericSqlWriter, TableDef};

    #[derive(Default, Clone, Debug)]
    struct Contact {
        id: Option<i64>,
        name: Option<String>,
        email: Option<String>,
        visits: i32,
    }

    impl Entity for Contact {
        fn table() -> TableDef {
            TableDef {
                columns: vec![
                    ColumnDef::new("id").key(),
                    ColumnDef::new("name").not_null().length(10),
                    ColumnDef::new("email"),
                    ColumnDef::new("visits"),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![
                self.id.as_value(),
                self.name.clone().as_value(),
                self.email.clone().as_value(),
                self.visits.as_value(),
            ]
        }
        fn set_field(&mut self, index: usize, value: Value) -> anyhow::Result<()> {
            match index {
                0 => self.id = AsValue::try_from_value(value)?,
                1 => self.name = AsValue::try_from_value(value)?,
                2 => self.email = AsValue::try_from_value(value)?,
                _ => self.visits = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::declare::<Contact>(&GenericSqlWriter::new(), &[])
                .expect("Schema should be declared"),
        )
    }

    fn stored() -> Record<Contact> {
        Record::from_row(
            schema(),
            RowLabeled::new(
                ["ID", "name", "email", "visits", "extra"]
                    .map(String::from)
                    .into(),
                [
                    Value::Int64(Some(7)),
                    Value::Varchar(Some("Ada".into())),
                    Value::Varchar(None),
                    Value::Int64(Some(3)),
                    Value::Boolean(Some(true)),
                ]
                .into(),
            ),
        )
        .expect("Row should map")
    }

    #[test]
    fn transient_record() {
        let record = Record::<Contact>::transient(schema());
        assert!(record.is_new());
        assert!(!record.locally_modified());
        assert_eq!(record.to_string(), "Contact[new]");
        assert_eq!(record.key_values(), [Value::Int64(None)]);
    }

    #[test]
    fn record_from_row() {
        let record = stored();
        assert!(!record.is_new());
        assert_eq!(record.id, Some(7));
        assert_eq!(record.name.as_deref(), Some("Ada"));
        assert_eq!(record.visits, 3);
        assert!(!record.locally_modified());
        assert_eq!(record.to_string(), "Contact[7]");
    }

    #[test]
    fn mapping_failure() {
        let error = Record::<Contact>::from_row(
            schema(),
            RowLabeled::new(
                ["visits".to_string()].into(),
                [Value::Varchar(Some("many".into()))].into(),
            ),
        )
        .unwrap_err();
        assert!(matches!(error, Error::Mapping { ref column, .. } if column == "visits"));
    }

    #[test]
    fn dirty_tracking() {
        let mut record = stored();
        record.visits = 4;
        assert!(record.locally_modified());
        assert!(record.locally_modified_column("VISITS").unwrap());
        assert!(!record.locally_modified_column("name").unwrap());
        assert!(matches!(
            record.locally_modified_column("unknown"),
            Err(Error::Configuration(..))
        ));
        record.reset();
        assert!(!record.locally_modified());
        assert_eq!(record.visits, 3);
    }

    #[test]
    fn clear_and_duplicate() {
        let original = stored();
        let copy = original.duplicate();
        assert!(copy.is_new());
        assert_eq!(copy.name, original.name);
        assert!(copy.locally_modified());
        assert_ne!(copy, original);

        let mut other = Record::<Contact>::transient(schema());
        other.set(&original);
        assert_eq!(other, original);

        other.clear();
        assert!(other.is_new());
        assert_eq!(other.id, None);
        assert!(!other.locally_modified());
    }

    #[test]
    fn validation() {
        let mut record = Record::<Contact>::transient(schema());
        record.name = Some("A name longer than ten".into());
        let error = record.run_validation().unwrap_err();
        let failures = error.validation().unwrap();
        assert!(failures.cites("name"));
        assert!(!failures.cites("id"));
        assert_eq!(record.invalid_columns(), ["name"]);
        assert_eq!(
            record.invalid_messages(),
            ["name cannot be longer than 10"]
        );

        record.name = None;
        record.email = Some("not an email".into());
        let valid = is_email(record.email.as_deref().unwrap_or_default());
        assert!(!record.validate("email", valid, "email is not valid").unwrap());
        let error = record.run_validation().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Validation failed on save(), Reasons:\n * name cannot be null\n * email is not valid"
        );
        assert_eq!(record.invalid_columns(), ["name", "email"]);

        record.clear_validation();
        record.name = Some("Ada".into());
        assert!(record.run_validation().is_ok());
        assert!(record.invalid_messages().is_empty());
    }

    #[test]
    fn emails() {
        assert!(is_email("ada@example.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("ada@example"));
        assert!(!is_email("ada.example.com"));
        assert!(!is_email("ada@@example.com"));
    }
}
