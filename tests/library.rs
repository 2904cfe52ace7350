#[cfg(test)]
mod tests {
    use indoc::indoc;
    use time::Date;
    use trove::{
        AsValue, ColumnDef, Dialect, Entity, GenericSqlWriter, Many, Page, Relation, Schema,
        SqlWriter, TableDef, Value,
    };

    #[derive(Default, Clone)]
    struct Book {
        id: Option<i64>,
        title: Option<String>,
    }

    #[derive(Default, Clone)]
    struct Member {
        id: Option<i64>,
        name: Option<String>,
    }

    #[derive(Default, Clone)]
    struct Loan {
        book_id: i64,
        member_id: i64,
        due: Option<Date>,
    }

    impl Entity for Book {
        fn table() -> TableDef {
            TableDef {
                columns: vec![
                    ColumnDef::new("id").key(),
                    ColumnDef::new("title").length(120).not_null(),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![self.id.as_value(), self.title.clone().as_value()]
        }
        fn set_field(&mut self, index: usize, value: Value) -> trove::anyhow::Result<()> {
            match index {
                0 => self.id = AsValue::try_from_value(value)?,
                _ => self.title = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    impl Entity for Member {
        fn table() -> TableDef {
            TableDef {
                columns: vec![
                    ColumnDef::new("id").key().many(
                        Many::of::<Book>()
                            .column("memberId")
                            .join_table("loans")
                            .join_column("bookId"),
                    ),
                    ColumnDef::new("name"),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![self.id.as_value(), self.name.clone().as_value()]
        }
        fn set_field(&mut self, index: usize, value: Value) -> trove::anyhow::Result<()> {
            match index {
                0 => self.id = AsValue::try_from_value(value)?,
                _ => self.name = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    impl Entity for Loan {
        fn table() -> TableDef {
            TableDef {
                name: Some("loans"),
                save_keys: true,
                dialect: Some(Dialect::MsSql),
                columns: vec![
                    ColumnDef::new("bookId").key(),
                    ColumnDef::new("memberId").key(),
                    ColumnDef::new("due").sql_type("DATE"),
                ],
                ..Default::default()
            }
        }
        fn row(&self) -> Vec<Value> {
            vec![
                self.book_id.as_value(),
                self.member_id.as_value(),
                self.due.as_value(),
            ]
        }
        fn set_field(&mut self, index: usize, value: Value) -> trove::anyhow::Result<()> {
            match index {
                0 => self.book_id = AsValue::try_from_value(value)?,
                1 => self.member_id = AsValue::try_from_value(value)?,
                _ => self.due = AsValue::try_from_value(value)?,
            }
            Ok(())
        }
    }

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    fn schema<E: Entity>() -> Schema {
        Schema::declare::<E>(&WRITER, &[]).expect("Schema should be declared")
    }

    #[test]
    fn statements() {
        let loans = schema::<Loan>();
        assert!(loans.save_keys);
        assert_eq!(loans.dialect, Some(Dialect::MsSql));
        assert_eq!(loans.key_names(), ["bookId", "memberId"]);
        {
            let mut out = String::new();
            WRITER.write_create_table(&mut out, &loans);
            assert_eq!(
                out,
                indoc! {"
                    CREATE TABLE loans (
                    bookId BIGINT NOT NULL,
                    memberId BIGINT NOT NULL,
                    due DATE
                    )
                "}
                .trim()
            );
        }
        {
            let mut out = String::new();
            WRITER.write_insert(&mut out, &loans, &[0, 1, 2]);
            assert_eq!(
                out,
                "INSERT INTO loans (bookId, memberId, due) VALUES (?, ?, ?)"
            );
        }
        {
            let mut out = String::new();
            WRITER.write_update(&mut out, &loans, &[2]);
            assert_eq!(
                out,
                "UPDATE loans SET due = ? WHERE bookId = ? AND memberId = ?"
            );
        }
        {
            let mut out = String::new();
            WRITER.write_select_where(&mut out, &loans, "memberId = ?", true);
            assert_eq!(
                out,
                "SELECT * FROM loans WHERE memberId = ? ORDER BY bookId DESC, memberId DESC"
            );
        }
        {
            let mut out = String::new();
            WRITER.write_insert(&mut out, &schema::<Book>(), &[]);
            assert_eq!(out, "INSERT INTO Books DEFAULT VALUES");
        }
    }

    #[test]
    fn windowed_pages() {
        let loans = schema::<Loan>();
        let keys = loans.key_names();
        let params = [Value::Int64(Some(8))];
        let pager = loans.dialect.expect("Loans declare their dialect").pager();
        let (sql, bound) = pager
            .paginate(&Page {
                sql: "SELECT * FROM loans WHERE memberId = ?",
                params: &params,
                keys: &keys,
                number: 2,
                size: 10,
            })
            .unwrap()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT TOP 10 * FROM loans WHERE (memberId = ?) AND \
            (CONVERT(varchar, bookId) + ' ' + CONVERT(varchar, memberId)) NOT IN ( \
            SELECT TOP 10 (CONVERT(varchar, bookId) + ' ' + CONVERT(varchar, memberId)) \
            FROM loans WHERE (memberId = ?) ORDER BY bookId, memberId ) ORDER BY bookId, memberId"
        );
        assert_eq!(bound, [Value::Int64(Some(8)), Value::Int64(Some(8))]);
    }

    #[test]
    fn explicit_join_table() {
        let relation = Relation::resolve(&schema::<Member>(), &schema::<Book>(), "").unwrap();
        assert_eq!(
            relation.sql,
            "SELECT T1.* FROM Books T1 JOIN loans T2 ON T1.id = T2.bookId WHERE memberId = ?"
        );
    }
}
