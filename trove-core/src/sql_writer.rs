use crate::{Column, Schema, Value, separated_by};
use std::fmt::Write;
use time::{Date, Time};

/// Renders the statements the engine needs, drivers override the pieces their dialect does differently.
///
/// Every value travels as a positional `?` parameter, the only literals written
/// are column defaults inside `CREATE TABLE`.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push_str(value);
    }

    /// Fallback column type, used when neither the declaration nor the catalog provides one.
    fn write_column_type(&self, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int8(..) => out.push_str("TINYINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::UInt8(..) => out.push_str("SMALLINT"),
            Value::UInt16(..) => out.push_str("INTEGER"),
            Value::UInt32(..) => out.push_str("BIGINT"),
            Value::UInt64(..) => out.push_str("DECIMAL(20,0)"),
            Value::Float32(..) => out.push_str("FLOAT"),
            Value::Float64(..) => out.push_str("DOUBLE"),
            Value::Decimal(.., precision, scale) => {
                out.push_str("DECIMAL");
                if (precision, scale) != (&0, &0) {
                    let _ = write!(out, "({},{})", precision, scale);
                }
            }
            Value::Char(..) => out.push_str("CHAR(1)"),
            Value::Null | Value::Varchar(..) => out.push_str("VARCHAR"),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::TimestampWithTimezone(..) => out.push_str("TIMESTAMP WITH TIME ZONE"),
            Value::Uuid(..) => out.push_str("UUID"),
        };
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(out),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Char(Some(v)) => {
                let mut buffer = [0; 4];
                self.write_value_string(out, v.encode_utf8(&mut buffer));
            }
            Value::Varchar(Some(v)) => self.write_value_string(out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v),
            Value::Date(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, v);
                out.push('\'');
            }
            Value::Time(Some(v)) => {
                out.push('\'');
                self.write_value_time(out, v);
                out.push('\'');
            }
            Value::Timestamp(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, &v.date());
                out.push(' ');
                self.write_value_time(out, &v.time());
                out.push('\'');
            }
            Value::TimestampWithTimezone(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, &v.date());
                out.push(' ');
                self.write_value_time(out, &v.time());
                let offset = v.offset();
                let _ = write!(
                    out,
                    " {}{:02}:{:02}:{:02}",
                    if offset.is_negative() { '-' } else { '+' },
                    offset.whole_hours().abs(),
                    offset.minutes_past_hour().abs(),
                    offset.seconds_past_minute().abs()
                );
                out.push('\'');
            }
            Value::Uuid(Some(v)) => {
                let _ = write!(out, "'{}'", v);
            }
            // Numbers print as themselves
            v => {
                let _ = write!(out, "{}", v);
            }
        }
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL")
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize])
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        for b in value {
            let _ = write!(out, "{:02X}", b);
        }
        out.push('\'');
    }

    fn write_value_date(&self, out: &mut String, value: &Date) {
        let _ = write!(
            out,
            "{:04}-{:02}-{:02}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    fn write_value_time(&self, out: &mut String, value: &Time) {
        let _ = write!(
            out,
            "{:02}:{:02}:{:02}",
            value.hour(),
            value.minute(),
            value.second()
        );
        let mut subsecond = value.nanosecond();
        if subsecond != 0 {
            let mut width = 9;
            while subsecond % 10 == 0 {
                subsecond /= 10;
                width -= 1;
            }
            let _ = write!(out, ".{:0width$}", subsecond);
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
        out.push_str("\n)");
    }

    fn write_create_table_column_fragment(&self, out: &mut String, schema: &Schema, column: &Column) {
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

    /// Primary key constraint added after the table is created, nothing when the table declares it inline.
    fn write_add_primary_key(&self, out: &mut String, schema: &Schema) {
        if schema.keys.is_empty() {
            return;
        }
        out.push_str("ALTER TABLE ");
        self.write_identifier(out, &schema.table);
        out.push_str(" ADD PRIMARY KEY (");
        separated_by(
            out,
            schema.key_columns(),
            |out, column| self.write_identifier(out, &column.name),
            ", ",
        );
        out.push(')');
    }

    /// Condition on every key column, in key order.
    fn write_key_condition(&self, out: &mut String, schema: &Schema) {
        separated_by(
            out,
            schema.key_columns(),
            |out, column| {
                self.write_identifier(out, &column.name);
                out.push_str(" = ?");
            },
            " AND ",
        );
    }

    /// Insert of the columns at `columns`, parameters follow the same order.
    fn write_insert(&self, out: &mut String, schema: &Schema, columns: &[usize]) {
        out.push_str("INSERT INTO ");
        self.write_identifier(out, &schema.table);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            columns,
            |out, &i| self.write_identifier(out, &schema.columns[i].name),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(out, columns, |out, _| out.push('?'), ", ");
        out.push(')');
    }

    /// Update of the columns at `columns` followed by the key condition, parameters follow the same order.
    fn write_update(&self, out: &mut String, schema: &Schema, columns: &[usize]) {
        out.push_str("UPDATE ");
        self.write_identifier(out, &schema.table);
        out.push_str(" SET ");
        separated_by(
            out,
            columns,
            |out, &i| {
                self.write_identifier(out, &schema.columns[i].name);
                out.push_str(" = ?");
            },
            ", ",
        );
        out.push_str(" WHERE ");
        self.write_key_condition(out, schema);
    }

    fn write_delete(&self, out: &mut String, schema: &Schema) {
        out.push_str("DELETE FROM ");
        self.write_identifier(out, &schema.table);
        out.push_str(" WHERE ");
        self.write_key_condition(out, schema);
    }

    fn write_delete_where(&self, out: &mut String, schema: &Schema, conditions: &str) {
        out.push_str("DELETE FROM ");
        self.write_identifier(out, &schema.table);
        if !conditions.trim().is_empty() {
            out.push_str(" WHERE ");
            out.push_str(conditions);
        }
    }

    fn write_select_by_keys(&self, out: &mut String, schema: &Schema) {
        out.push_str("SELECT * FROM ");
        self.write_identifier(out, &schema.table);
        out.push_str(" WHERE ");
        self.write_key_condition(out, schema);
    }

    /// Select of every row matching `conditions`, `descending` orders by the key columns from the last one inserted.
    fn write_select_where(&self, out: &mut String, schema: &Schema, conditions: &str, descending: bool) {
        out.push_str("SELECT * FROM ");
        self.write_identifier(out, &schema.table);
        if !conditions.trim().is_empty() {
            out.push_str(" WHERE ");
            out.push_str(conditions);
        }
        if descending && !schema.keys.is_empty() {
            out.push_str(" ORDER BY ");
            separated_by(
                out,
                schema.key_columns(),
                |out, column| {
                    self.write_identifier(out, &column.name);
                    out.push_str(" DESC");
                },
                ", ",
            );
        }
    }

    /// Row count of the statement `sql`.
    fn write_count(&self, out: &mut String, sql: &str) {
        out.push_str("SELECT COUNT(*) FROM (");
        out.push_str(sql);
        out.push_str(") trove_count");
    }

    /// Stored procedure invocation.
    fn write_call(&self, out: &mut String, call: &str) {
        out.push_str("{call ");
        out.push_str(call);
        out.push('}');
    }
}

pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for GenericSqlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AsValue, ColumnDef, Entity, TableDef};
    use indoc::indoc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[derive(Default, Clone)]
    struct Invoice {
        number: Option<i64>,
        year: Option<i32>,
        customer: Option<String>,
        amount: Option<Decimal>,
        paid: bool,
    }

    impl Entity for Invoice {
        fn table() -> TableDef {
            TableDef {
                columns: vec![
                    ColumnDef::new("number").key(),
                    ColumnDef::new("year").key(),
                    ColumnDef::new("customer").length(80).not_null(),
                    ColumnDef::new("amount"),
                    ColumnDef::new("paid"),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![
                self.number.as_value(),
                self.year.as_value(),
                self.customer.clone().as_value(),
                self.amount.as_value(),
                self.paid.as_value(),
            ]
        }
        fn set_field(&mut self, index: usize, value: Value) -> anyhow::Result<()> {
            match index {
                0 => self.number = AsValue::try_from_value(value)?,
                1 => self.year = AsValue::try_from_value(value)?,
                2 => self.customer = AsValue::try_from_value(value)?,
                3 => self.amount = AsValue::try_from_value(value)?,
                _ => self.paid = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    fn schema() -> Schema {
        Schema::declare::<Invoice>(&GenericSqlWriter::new(), &[]).unwrap()
    }

    #[test]
    fn create_table() {
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        writer.write_create_table(&mut out, &schema());
        assert_eq!(
            out,
            indoc! {"
                CREATE TABLE Invoices (
                number BIGINT NOT NULL,
                year INTEGER NOT NULL,
                customer VARCHAR(80) NOT NULL,
                amount DECIMAL,
                paid BOOLEAN DEFAULT false
                )"
            }
        );
        let mut out = String::new();
        writer.write_add_primary_key(&mut out, &schema());
        assert_eq!(out, "ALTER TABLE Invoices ADD PRIMARY KEY (number, year)");
    }

    #[test]
    fn crud_statements() {
        let writer = GenericSqlWriter::new();
        let schema = schema();
        let mut out = String::new();
        writer.write_insert(&mut out, &schema, &[2, 3]);
        assert_eq!(out, "INSERT INTO Invoices (customer, amount) VALUES (?, ?)");
        let mut out = String::new();
        writer.write_insert(&mut out, &schema, &[]);
        assert_eq!(out, "INSERT INTO Invoices DEFAULT VALUES");
        let mut out = String::new();
        writer.write_update(&mut out, &schema, &[4]);
        assert_eq!(out, "UPDATE Invoices SET paid = ? WHERE number = ? AND year = ?");
        let mut out = String::new();
        writer.write_delete(&mut out, &schema);
        assert_eq!(out, "DELETE FROM Invoices WHERE number = ? AND year = ?");
        let mut out = String::new();
        writer.write_select_by_keys(&mut out, &schema);
        assert_eq!(out, "SELECT * FROM Invoices WHERE number = ? AND year = ?");
    }

    #[test]
    fn select_statements() {
        let writer = GenericSqlWriter::new();
        let schema = schema();
        let mut out = String::new();
        writer.write_select_where(&mut out, &schema, "", false);
        assert_eq!(out, "SELECT * FROM Invoices");
        let mut out = String::new();
        writer.write_select_where(&mut out, &schema, "paid = ?", true);
        assert_eq!(
            out,
            "SELECT * FROM Invoices WHERE paid = ? ORDER BY number DESC, year DESC"
        );
        let mut out = String::new();
        writer.write_delete_where(&mut out, &schema, " ");
        assert_eq!(out, "DELETE FROM Invoices");
        let mut out = String::new();
        writer.write_count(&mut out, "SELECT * FROM Invoices WHERE paid = ?");
        assert_eq!(
            out,
            "SELECT COUNT(*) FROM (SELECT * FROM Invoices WHERE paid = ?) trove_count"
        );
        let mut out = String::new();
        writer.write_call(&mut out, "archive(?)");
        assert_eq!(out, "{call archive(?)}");
    }

    #[test]
    fn literals() {
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        writer.write_value(&mut out, &Value::from("it's"));
        out.push(' ');
        writer.write_value(&mut out, &Decimal::from_str("12.50").unwrap().as_value());
        out.push(' ');
        writer.write_value(&mut out, &Value::Int32(None));
        out.push(' ');
        writer.write_value(&mut out, &vec![0x0Au8, 0xFF].as_value());
        out.push(' ');
        writer.write_value(
            &mut out,
            &time::Time::from_hms_milli(8, 5, 3, 250).unwrap().as_value(),
        );
        assert_eq!(out, "'it''s' 12.50 NULL X'0AFF' '08:05:03.25'");
    }
}
