use crate::Value;
use anyhow::Result;
use std::fmt::Display;

/// A parameterized, backend-prepared query handle.
///
/// `Prepared` enables drivers to pre-parse SQL statements and later bind
/// positional parameters. Values are converted via `Into<Value>`, which every
/// [`AsValue`](crate::AsValue) type provides.
///
/// # Binding Semantics
/// * `bind` appends a value (driver chooses actual placeholder numbering).
/// * `bind_index` sets the parameter at `index` (from 0).
/// * A handle holding a script of several statements hands the bound values
///   out to each statement in order of appearance.
///
/// Methods return `&mut Self` for fluent chaining:
/// ```rust,ignore
/// prepared.bind(42)?.bind("hello")?;
/// ```
pub trait Prepared: Send + Display {
    /// Remove all the previously bound values.
    fn clear_bindings(&mut self) -> Result<&mut Self>;
    /// Append a parameter value.
    fn bind<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self>;
    /// Bind a value at a specific index.
    fn bind_index<V: Into<Value>>(&mut self, value: V, index: u64) -> Result<&mut Self>;
}
