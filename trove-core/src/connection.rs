use crate::{Executor, TypeCategory};
use anyhow::Result;

/// A live session with a database, plus the catalog introspection the schema registry reads.
pub trait Connection: Executor {
    /// Open a connection to `url`, whose scheme must be the driver's [`NAME`](crate::Driver::NAME).
    fn connect(url: &str) -> Result<Self>;

    /// Whether the session can still run statements.
    fn is_alive(&mut self) -> bool;

    /// Product name reported by the database, used to choose a [`Dialect`](crate::Dialect).
    fn product_name(&self) -> &str;

    /// Native types supported by the database, in order of preference within a category.
    fn type_info(&mut self) -> Result<Vec<TypeInfo>>;

    fn table_exists(&mut self, table: &str) -> Result<bool>;

    /// Columns of `table` in declaration order.
    fn columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>>;

    /// Names of the columns in the primary key of `table`, in key order.
    fn primary_keys(&mut self, table: &str) -> Result<Vec<String>>;
}

/// One entry of the database type catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub category: TypeCategory,
    pub precision: Option<u32>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, category: TypeCategory, precision: Option<u32>) -> Self {
        Self {
            name: name.into(),
            category,
            precision,
        }
    }
}

/// A column as the database catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: String,
    pub type_name: String,
    pub length: Option<u32>,
    pub not_null: bool,
}
