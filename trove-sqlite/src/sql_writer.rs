use std::fmt::Write;
use trove_core::{Column, Schema, SqlWriter, Value, separated_by};

pub struct SqliteSqlWriter {}

impl SqliteSqlWriter {
    /// A single integer key becomes the rowid alias, sqlite generates its values.
    fn rowid_key<'s>(&self, schema: &'s Schema) -> Option<&'s Column> {
        match schema.keys.as_slice() {
            [key] if schema.columns[*key].sql_type.eq_ignore_ascii_case("INTEGER") => {
                Some(&schema.columns[*key])
            }
            _ => None,
        }
    }
}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', "\"\"");
        out.push('"');
    }

    fn write_column_type(&self, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..)
            | Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => out.push_str("INTEGER"),
            Value::Float32(..) | Value::Float64(..) => out.push_str("REAL"),
            Value::Decimal(..) => out.push_str("NUMERIC"),
            Value::Blob(..) => out.push_str("BLOB"),
            _ => out.push_str("TEXT"),
        }
    }

    fn write_create_table(&self, out: &mut String, schema: &Schema) {
        out.push_str("CREATE TABLE ");
        self.write_identifier(out, &schema.table);
        out.push_str(" (\n");
        separated_by(
            out,
            &schema.columns,
            |out, column| self.write_create_table_column_fragment(out, schema, column),
            ",\n",
        );
        if !schema.keys.is_empty() && self.rowid_key(schema).is_none() {
            out.push_str(",\nPRIMARY KEY (");
            separated_by(
                out,
                schema.key_columns(),
                |out, column| self.write_identifier(out, &column.name),
                ", ",
            );
            out.push(')');
        }
        out.push_str("\n)");
    }

    fn write_create_table_column_fragment(&self, out: &mut String, schema: &Schema, column: &Column) {
        if self
            .rowid_key(schema)
            .is_some_and(|key| std::ptr::eq(key, column))
        {
            self.write_identifier(out, &column.name);
            out.push_str(" INTEGER PRIMARY KEY");
            return;
        }
        self.write_identifier(out, &column.name);
        out.push(' ');
        out.push_str(&column.sql_type);
        if let Some(length) = column.length {
            if !column.sql_type.contains('(') {
                let _ = write!(out, "({})", length);
            }
        }
        let key = schema.key_columns().any(|k| std::ptr::eq(k, column));
        if column.not_null || key {
            out.push_str(" NOT NULL");
        }
        if !key && !column.default.is_null() {
            out.push_str(" DEFAULT ");
            self.write_value(out, &column.default);
        }
    }

    /// Keys are declared inside `CREATE TABLE`, sqlite cannot add them later.
    fn write_add_primary_key(&self, _out: &mut String, _schema: &Schema) {}

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push(['0', '1'][value as usize]);
    }

    /// Sqlite has no procedures, the call is run as a plain statement.
    fn write_call(&self, out: &mut String, call: &str) {
        out.push_str(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_core::{AsValue, ColumnDef, Entity, TableDef, TypeCategory, TypeInfo};

    #[derive(Default, Clone)]
    struct Note {
        id: Option<i64>,
        text: Option<String>,
        pinned: bool,
    }

    impl Entity for Note {
        fn table() -> TableDef {
            TableDef {
                columns: vec![
                    ColumnDef::new("id").key(),
                    ColumnDef::new("text").length(50).not_null(),
                    ColumnDef::new("pinned"),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![
                self.id.as_value(),
                self.text.clone().as_value(),
                self.pinned.as_value(),
            ]
        }
        fn set_field(&mut self, index: usize, value: Value) -> trove_core::anyhow::Result<()> {
            match index {
                0 => self.id = AsValue::try_from_value(value)?,
                1 => self.text = AsValue::try_from_value(value)?,
                _ => self.pinned = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct Tag {
        note: Option<i64>,
        label: Option<String>,
    }

    impl Entity for Tag {
        fn table() -> TableDef {
            TableDef {
                name: Some("note \"tags\""),
                columns: vec![ColumnDef::new("note").key(), ColumnDef::new("label").key()],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![self.note.as_value(), self.label.clone().as_value()]
        }
        fn set_field(&mut self, index: usize, value: Value) -> trove_core::anyhow::Result<()> {
            match index {
                0 => self.note = AsValue::try_from_value(value)?,
                _ => self.label = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    fn types() -> Vec<TypeInfo> {
        vec![
            TypeInfo::new("INTEGER", TypeCategory::Boolean, None),
            TypeInfo::new("INTEGER", TypeCategory::BigInt, None),
            TypeInfo::new("TEXT", TypeCategory::Varchar, None),
        ]
    }

    #[test]
    fn rowid_key() {
        let writer = SqliteSqlWriter {};
        let schema = Schema::declare::<Note>(&writer, &types()).unwrap();
        let mut out = String::new();
        writer.write_create_table(&mut out, &schema);
        assert_eq!(
            out,
            "CREATE TABLE \"Notes\" (\n\"id\" INTEGER PRIMARY KEY,\n\"text\" TEXT(50) NOT NULL,\n\"pinned\" INTEGER DEFAULT 0\n)"
        );
        let mut out = String::new();
        writer.write_add_primary_key(&mut out, &schema);
        assert!(out.is_empty());
    }

    #[test]
    fn composite_key() {
        let writer = SqliteSqlWriter {};
        let schema = Schema::declare::<Tag>(&writer, &types()).unwrap();
        let mut out = String::new();
        writer.write_create_table(&mut out, &schema);
        assert_eq!(
            out,
            "CREATE TABLE \"note \"\"tags\"\"\" (\n\"note\" INTEGER NOT NULL,\n\"label\" TEXT NOT NULL,\nPRIMARY KEY (\"note\", \"label\")\n)"
        );
        let mut out = String::new();
        writer.write_delete(&mut out, &schema);
        assert_eq!(
            out,
            "DELETE FROM \"note \"\"tags\"\"\" WHERE \"note\" = ? AND \"label\" = ?"
        );
    }

    #[test]
    fn values() {
        let writer = SqliteSqlWriter {};
        let mut out = String::new();
        writer.write_value(&mut out, &true.into());
        out.push(' ');
        writer.write_value(&mut out, &vec![0xCAu8, 0xFE].as_value());
        out.push(' ');
        writer.write_value(&mut out, &"it's".into());
        assert_eq!(out, "1 X'CAFE' 'it''s'");
        let mut out = String::new();
        writer.write_column_type(&mut out, &Value::Decimal(None, 10, 2));
        assert_eq!(out, "NUMERIC");
        let mut out = String::new();
        writer.write_call(&mut out, "SELECT 1");
        assert_eq!(out, "SELECT 1");
    }
}
