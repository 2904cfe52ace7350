use time::Date;
use trove::{AsValue, ColumnDef, Entity, Many, TableDef, Value};

#[derive(Default, Clone, Debug, PartialEq)]
pub struct DocType {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl Entity for DocType {
    fn table() -> TableDef {
        TableDef {
            columns: vec![
                ColumnDef::new("id")
                    .key()
                    .many(Many::of::<Document>().column("typeId")),
                ColumnDef::new("name").length(30).not_null(),
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

#[derive(Default, Clone, Debug, PartialEq)]
pub struct Document {
    pub id: Option<i64>,
    pub type_id: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub issued: Option<Date>,
    pub rating: Option<f64>,
    pub views: Option<i32>,
    /// Not persisted, derived from the title.
    pub slug: String,
}

impl Document {
    pub fn titled(type_id: Option<i64>, title: &str) -> Self {
        Self {
            type_id,
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

impl Entity for Document {
    fn table() -> TableDef {
        TableDef {
            columns: vec![
                ColumnDef::new("id").key(),
                ColumnDef::new("typeId"),
                ColumnDef::new("title").length(50).not_null(),
                ColumnDef::new("body"),
                ColumnDef::new("issued"),
                ColumnDef::new("rating"),
                ColumnDef::new("views"),
                ColumnDef::new("slug").ignore(),
            ],
            ..Default::default()
        }
    }
    fn row(&self) -> Vec<Value> {
        vec![
            self.id.as_value(),
            self.type_id.as_value(),
            self.title.clone().as_value(),
            self.body.clone().as_value(),
            self.issued.as_value(),
            self.rating.as_value(),
            self.views.as_value(),
            self.slug.clone().as_value(),
        ]
    }
    fn set_field(&mut self, index: usize, value: Value) -> trove::anyhow::Result<()> {
        match index {
            0 => self.id = AsValue::try_from_value(value)?,
            1 => self.type_id = AsValue::try_from_value(value)?,
            2 => self.title = AsValue::try_from_value(value)?,
            3 => self.body = AsValue::try_from_value(value)?,
            4 => self.issued = AsValue::try_from_value(value)?,
            5 => self.rating = AsValue::try_from_value(value)?,
            6 => self.views = AsValue::try_from_value(value)?,
            _ => self.slug = AsValue::try_from_value(value)?,
        }
        Ok(())
    }
    fn post_construct(&mut self) -> trove::Result<()> {
        self.slug = self
            .title
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .replace(' ', "-");
        Ok(())
    }
}

/// Empty both tables.
pub fn delete_all<C: trove::Connection>(connection: &mut C) {
    Document::delete_all(connection, "", &[]).expect("Failed to clear the Documents table");
    DocType::delete_all(connection, "", &[]).expect("Failed to clear the DocTypes table");
}

/// Stored document type named `name`, returns its generated id.
pub fn doc_type<C: trove::Connection>(connection: &mut C, name: &str) -> i64 {
    let mut kind = trove::Record::<DocType>::new(connection).expect("Failed to create a DocType");
    kind.name = Some(name.into());
    assert_eq!(kind.save(connection).expect("Failed to save the DocType"), 1);
    kind.id.expect("The DocType did not receive its generated key")
}
