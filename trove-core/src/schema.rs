use crate::{
    Connection, Dialect, Driver, Entity, Error, Executor, Many, Result, SqlWriter, TypeCategory,
    TypeInfo, Value, executor::execute, pluralize, simple_name,
};
use anyhow::Context;
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

static REGISTRY: LazyLock<Mutex<HashMap<TypeId, Arc<Schema>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Structural description of the table backing a mapped type.
///
/// Built once per type by [`schema_for`] and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub table: String,
    pub connection: &'static str,
    pub save_keys: bool,
    pub dialect: Option<Dialect>,
    /// Persisted columns, ignored fields excluded.
    pub columns: Vec<Column>,
    /// Positions in `columns` of the primary key, in key order.
    pub keys: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    /// Position of the field in [`Entity::row`].
    pub field: usize,
    pub sql_type: String,
    pub length: Option<u32>,
    pub not_null: bool,
    /// Value of the field in a defaulted instance.
    pub default: Value,
    pub many: Vec<Many>,
}

impl Schema {
    /// Schema derived from the declared metadata alone, `types` is the database type catalog.
    pub fn declare<E: Entity>(writer: &dyn SqlWriter, types: &[TypeInfo]) -> Result<Schema> {
        let definition = E::table();
        let type_name = simple_name::<E>();
        let defaults = E::default().row();
        if defaults.len() != definition.columns.len() {
            return Err(Error::Configuration(format!(
                "{}::row() returns {} values but {} columns are declared",
                type_name,
                defaults.len(),
                definition.columns.len()
            )));
        }
        let mut columns = Vec::new();
        let mut keys = Vec::new();
        for (field, (def, default)) in definition.columns.into_iter().zip(defaults).enumerate() {
            if def.ignore {
                continue;
            }
            if !def.many.is_empty() && !def.key {
                return Err(Error::Configuration(format!(
                    "{}.{} declares a to-many relationship but it is not a key column",
                    type_name, def.name
                )));
            }
            let catalog = default.category().and_then(|c| lookup_type(types, c));
            let sql_type = match (def.sql_type, catalog) {
                (Some(sql_type), _) => sql_type.to_string(),
                (None, Some(info)) => info.name.clone(),
                (None, None) => {
                    let mut sql_type = String::new();
                    writer.write_column_type(&mut sql_type, &default);
                    sql_type
                }
            };
            if def.key {
                keys.push(columns.len());
            }
            columns.push(Column {
                name: def.name.to_string(),
                field,
                sql_type,
                length: def.length.or(catalog.and_then(|v| v.precision)),
                not_null: def.not_null,
                default,
                many: def.many,
            });
        }
        Ok(Schema {
            type_id: TypeId::of::<E>(),
            type_name,
            table: definition
                .name
                .map(str::to_string)
                .unwrap_or_else(|| pluralize(type_name)),
            connection: definition.connection,
            save_keys: definition.save_keys,
            dialect: definition.dialect,
            columns,
            keys,
        })
    }

    /// Column named `name`, ignoring ASCII case, with its position.
    pub fn column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name.eq_ignore_ascii_case(name))
    }

    pub fn is_key(&self, index: usize) -> bool {
        self.keys.contains(&index)
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &Column> {
        self.keys.iter().map(|&i| &self.columns[i])
    }

    pub fn key_names(&self) -> Vec<&str> {
        self.key_columns().map(|c| c.name.as_str()).collect()
    }
}

/// First catalog type of `category`, widening integers and floats when the exact family is missing.
fn lookup_type(types: &[TypeInfo], category: TypeCategory) -> Option<&TypeInfo> {
    use TypeCategory::*;
    let candidates: &[TypeCategory] = match category {
        TinyInt => &[TinyInt, SmallInt, Integer, BigInt],
        SmallInt => &[SmallInt, Integer, BigInt],
        Integer => &[Integer, BigInt],
        Real => &[Real, Double],
        Char => &[Char, Varchar],
        TimestampWithTimezone => &[TimestampWithTimezone, Timestamp],
        _ => std::slice::from_ref(&category),
    };
    candidates
        .iter()
        .find_map(|c| types.iter().find(|t| t.category == *c))
}

/// Schema of `E`, built on first request and cached for the lifetime of the process.
///
/// The first build reads the type catalog through `connection` and creates the
/// table when it is missing. A failed build is not cached, the next call retries.
pub fn schema_for<E: Entity, C: Connection>(connection: &mut C) -> Result<Arc<Schema>> {
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(schema) = registry.get(&TypeId::of::<E>()) {
        return Ok(schema.clone());
    }
    let schema = Arc::new(build::<E, C>(connection)?);
    registry.insert(TypeId::of::<E>(), schema.clone());
    Ok(schema)
}

fn build<E: Entity, C: Connection>(connection: &mut C) -> Result<Schema> {
    let writer = connection.driver().sql_writer();
    let types = connection
        .type_info()
        .context("While reading the type catalog")?;
    let mut schema = Schema::declare::<E>(writer.as_dyn(), &types)?;
    if schema.dialect.is_none() {
        schema.dialect = Dialect::from_product_name(connection.product_name());
    }
    if connection.table_exists(&schema.table)? {
        reconcile(connection, &mut schema)?;
    } else {
        let mut sql = String::new();
        writer.write_create_table(&mut sql, &schema);
        log::info!("Creating table {} for {}", schema.table, schema.type_name);
        execute(connection, sql, &[])?;
        let mut sql = String::new();
        writer.write_add_primary_key(&mut sql, &schema);
        if !sql.is_empty() {
            execute(connection, sql, &[])?;
        }
    }
    Ok(schema)
}

/// Read the catalog of an existing table, adopting its primary key when none is declared.
fn reconcile<C: Connection>(connection: &mut C, schema: &mut Schema) -> Result<()> {
    let catalog = connection
        .columns(&schema.table)
        .with_context(|| format!("While reading the columns of {}", schema.table))?;
    for column in &schema.columns {
        if !catalog.iter().any(|c| c.name.eq_ignore_ascii_case(&column.name)) {
            log::warn!(
                "Column {}.{} is declared by {} but missing from the database",
                schema.table,
                column.name,
                schema.type_name
            );
        }
    }
    if schema.keys.is_empty() {
        let primary_keys = connection
            .primary_keys(&schema.table)
            .with_context(|| format!("While reading the primary key of {}", schema.table))?;
        schema.keys = primary_keys
            .iter()
            .filter_map(|name| schema.column(name).map(|(i, _)| i))
            .collect();
        if !schema.keys.is_empty() {
            log::debug!(
                "{} adopts the primary key ({}) of {}",
                schema.type_name,
                schema.key_names().join(", "),
                schema.table
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AsValue, ColumnDef, GenericSqlWriter, TableDef};

    #[derive(Default, Clone)]
    struct Address {
        id: Option<i32>,
        street: Option<String>,
        notes: String,
        cache: Option<String>,
    }

    impl Entity for Address {
        fn table() -> TableDef {
            TableDef {
                connection: "ADDRESS_DB",
                columns: vec![
                    ColumnDef::new("id").key(),
                    ColumnDef::new("street").not_null(),
                    ColumnDef::new("notes").length(200).sql_type("CLOB"),
                    ColumnDef::new("cache").ignore(),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![
                self.id.as_value(),
                self.street.clone().as_value(),
                self.notes.clone().as_value(),
                self.cache.clone().as_value(),
            ]
        }
        fn set_field(&mut self, index: usize, value: Value) -> anyhow::Result<()> {
            match index {
                0 => self.id = AsValue::try_from_value(value)?,
                1 => self.street = AsValue::try_from_value(value)?,
                2 => self.notes = AsValue::try_from_value(value)?,
                _ => self.cache = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct Broken {
        id: Option<i32>,
    }

    impl Entity for Broken {
        fn table() -> TableDef {
            TableDef {
                name: Some("broken_things"),
                columns: vec![
                    ColumnDef::new("id").key(),
                    ColumnDef::new("label").many(Many::of::<Address>()),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![self.id.as_value(), Value::Varchar(None)]
        }
        fn set_field(&mut self, _index: usize, value: Value) -> anyhow::Result<()> {
            self.id = AsValue::try_from_value(value)?;
            Ok(())
        }
    }

    #[test]
    fn derived_from_declaration() {
        let schema = Schema::declare::<Address>(&GenericSqlWriter::new(), &[]).unwrap();
        assert_eq!(schema.type_name, "Address");
        assert_eq!(schema.table, "Address");
        assert_eq!(schema.connection, "ADDRESS_DB");
        assert_eq!(schema.columns.len(), 3);
        assert_eq!(schema.keys, [0]);
        assert_eq!(schema.key_names(), ["id"]);
        let (index, notes) = schema.column("NOTES").unwrap();
        assert_eq!(index, 2);
        assert_eq!(notes.field, 2);
        assert_eq!(notes.sql_type, "CLOB");
        assert_eq!(notes.length, Some(200));
        assert_eq!(notes.default, Value::Varchar(Some("".into())));
        assert!(schema.column("cache").is_none());
        assert!(schema.columns[1].not_null);
        assert_eq!(schema.columns[0].sql_type, "INTEGER");
    }

    #[test]
    fn catalog_types() {
        let types = [
            TypeInfo::new("BIGINT", TypeCategory::BigInt, Some(19)),
            TypeInfo::new("VARCHAR", TypeCategory::Varchar, Some(255)),
            TypeInfo::new("LONGVARCHAR", TypeCategory::Varchar, None),
        ];
        let schema = Schema::declare::<Address>(&GenericSqlWriter::new(), &types).unwrap();
        // No INTEGER in the catalog, widened to BIGINT
        assert_eq!(schema.columns[0].sql_type, "BIGINT");
        assert_eq!(schema.columns[1].sql_type, "VARCHAR");
        assert_eq!(schema.columns[1].length, Some(255));
        assert_eq!(schema.columns[2].sql_type, "CLOB");
        assert_eq!(schema.columns[2].length, Some(200));
    }

    #[test]
    fn relationship_on_non_key() {
        let error = Schema::declare::<Broken>(&GenericSqlWriter::new(), &[]).unwrap_err();
        assert!(matches!(error, Error::Configuration(..)));
        assert!(error.to_string().contains("Broken.label"));
    }
}
