use crate::{Entity, Error, Result, Schema, simple_name};
use std::any::TypeId;

/// To-many relationship declared on a key column.
///
/// Rows of `target` reference the key through a foreign column, either
/// directly or through a join table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Many {
    pub target: TypeId,
    pub target_name: &'static str,
    /// Foreign column, defaults to the lowercase source type name followed by `Id`.
    pub column: Option<&'static str>,
    pub join_table: Option<&'static str>,
    /// Column of the join table holding the target key, defaults to the lowercase target type name followed by `Id`.
    pub join_column: Option<&'static str>,
}

impl Many {
    pub fn of<T: Entity>() -> Self {
        Self {
            target: TypeId::of::<T>(),
            target_name: simple_name::<T>(),
            column: None,
            join_table: None,
            join_column: None,
        }
    }
    pub fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }
    pub fn join_table(mut self, join_table: &'static str) -> Self {
        self.join_table = Some(join_table);
        self
    }
    pub fn join_column(mut self, join_column: &'static str) -> Self {
        self.join_column = Some(join_column);
        self
    }
}

/// Statement selecting the `target` rows related to one key of `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Column of `source` whose value is bound first.
    pub key: usize,
    pub sql: String,
}

impl Relation {
    /// Resolve the relationship from `source` to `target`, `conditions` is a trusted SQL fragment ANDed to the filter.
    pub fn resolve(source: &Schema, target: &Schema, conditions: &str) -> Result<Relation> {
        let Some((key, many)) = source.keys.iter().find_map(|&key| {
            source.columns[key]
                .many
                .iter()
                .find(|many| many.target == target.type_id)
                .map(|many| (key, many))
        }) else {
            return Err(Error::Configuration(format!(
                "Cannot find {} records from {}: none of its key columns declares a relationship to {}",
                target.type_name, source.type_name, target.type_name
            )));
        };
        let foreign = many
            .column
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}Id", source.type_name.to_lowercase()));
        let join_table = match many.join_table {
            Some(table) => Some(table.to_string()),
            None if target.column(&foreign).is_none() => Some(
                if target.table < source.table {
                    format!("{}{}", target.table, source.table)
                } else {
                    format!("{}{}", source.table, target.table)
                },
            ),
            None => None,
        };
        let mut sql = format!("SELECT T1.* FROM {} T1", target.table);
        if let Some(join_table) = join_table {
            let join_column = many
                .join_column
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}Id", target.type_name.to_lowercase()));
            let target_key = target
                .keys
                .first()
                .map(|&k| target.columns[k].name.as_str())
                .unwrap_or("id");
            sql.push_str(&format!(
                " JOIN {} T2 ON T1.{} = T2.{}",
                join_table, target_key, join_column
            ));
        }
        sql.push_str(&format!(" WHERE {} = ?", foreign));
        if !conditions.trim().is_empty() {
            sql.push_str(&format!(" AND ({})", conditions));
        }
        Ok(Relation { key, sql })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AsValue, ColumnDef, GenericSqlWriter, TableDef, Value};

    #[derive(Default, Clone)]
    struct DocType {
        id: Option<i64>,
    }
    #[derive(Default, Clone)]
    struct Document {
        id: Option<i64>,
        type_id: Option<i64>,
    }
    #[derive(Default, Clone)]
    struct Tag {
        id: Option<i64>,
    }

    impl Entity for DocType {
        fn table() -> TableDef {
            TableDef {
                columns: vec![
                    ColumnDef::new("id")
                        .key()
                        .many(Many::of::<Document>().column("typeId"))
                        .many(Many::of::<Tag>()),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![self.id.as_value()]
        }
        fn set_field(&mut self, _index: usize, value: Value) -> anyhow::Result<()> {
            self.id = AsValue::try_from_value(value)?;
            Ok(())
        }
    }

    impl Entity for Document {
        fn table() -> TableDef {
            TableDef {
                columns: vec![ColumnDef::new("id").key(), ColumnDef::new("typeId")],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![self.id.as_value(), self.type_id.as_value()]
        }
        fn set_field(&mut self, index: usize, value: Value) -> anyhow::Result<()> {
            match index {
                0 => self.id = AsValue::try_from_value(value)?,
                _ => self.type_id = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    impl Entity for Tag {
        fn table() -> TableDef {
            TableDef {
                columns: vec![ColumnDef::new("id").key()],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![self.id.as_value()]
        }
        fn set_field(&mut self, _index: usize, value: Value) -> anyhow::Result<()> {
            self.id = AsValue::try_from_value(value)?;
            Ok(())
        }
    }

    fn schema<E: Entity>() -> Schema {
        Schema::declare::<E>(&GenericSqlWriter::new(), &[]).expect("Schema should be declared")
    }

    #[test]
    fn direct_foreign_key() {
        let relation =
            Relation::resolve(&schema::<DocType>(), &schema::<Document>(), "").unwrap();
        assert_eq!(relation.key, 0);
        assert_eq!(relation.sql, "SELECT T1.* FROM Documents T1 WHERE typeId = ?");
    }

    #[test]
    fn extra_conditions() {
        let relation =
            Relation::resolve(&schema::<DocType>(), &schema::<Document>(), "id > ?").unwrap();
        assert_eq!(
            relation.sql,
            "SELECT T1.* FROM Documents T1 WHERE typeId = ? AND (id > ?)"
        );
    }

    #[test]
    fn implicit_join_table() {
        let relation = Relation::resolve(&schema::<DocType>(), &schema::<Tag>(), "").unwrap();
        assert_eq!(
            relation.sql,
            "SELECT T1.* FROM Tags T1 JOIN DocTypesTags T2 ON T1.id = T2.tagId WHERE doctypeId = ?"
        );
    }

    #[test]
    fn missing_relationship() {
        let error =
            Relation::resolve(&schema::<Document>(), &schema::<DocType>(), "").unwrap_err();
        assert!(matches!(error, Error::Configuration(..)));
    }
}
