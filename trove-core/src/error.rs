use std::fmt::{self, Display};

/// Failure of an engine operation.
///
/// Driver level code works with [`anyhow::Error`]; once such an error crosses
/// into the engine it becomes [`Error::Execution`] and keeps the full context chain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrong or missing metadata, unknown column, unresolvable connection.
    #[error("{0}")]
    Configuration(String),
    /// Every violation found before a write, reported together.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The database or the driver refused the statement.
    #[error("{0:#}")]
    Execution(#[from] anyhow::Error),
    /// A returned column does not fit the field it maps to.
    #[error("Column `{column}` cannot be mapped: {reason}")]
    Mapping { column: String, reason: String },
    /// The operation is not supported in the way it was called.
    #[error("{0}")]
    Usage(String),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(..))
    }

    /// The validation failure, if that is what this is.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// Compound validation failure, one entry per violated column.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub failures: Vec<ValidationFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub column: String,
    pub message: String,
}

impl ValidationError {
    pub fn push(&mut self, column: impl Into<String>, message: impl Into<String>) {
        self.failures.push(ValidationFailure {
            column: column.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|v| v.column.as_str())
    }

    pub fn cites(&self, column: &str) -> bool {
        self.columns().any(|v| v == column)
    }
}

impl std::error::Error for ValidationError {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validation failed on save(), Reasons:")?;
        for failure in &self.failures {
            write!(f, "\n * {}", failure.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use indoc::indoc;

    #[test]
    fn validation_message() {
        let mut error = ValidationError::default();
        error.push("title", "title cannot be longer than 50");
        error.push("author", "author cannot be null");
        let error = Error::from(error);
        assert!(error.is_validation());
        assert_eq!(
            error.to_string(),
            indoc! {"
                Validation failed on save(), Reasons:
                 * title cannot be longer than 50
                 * author cannot be null"
            }
        );
        let validation = error.validation().unwrap();
        assert!(validation.cites("title"));
        assert!(!validation.cites("id"));
    }

    #[test]
    fn execution_keeps_context() {
        let cause: anyhow::Result<()> = Err(anyhow::Error::msg("no such table: Documents"));
        let error: Error = cause
            .context("While executing the query:\nSELECT * FROM Documents")
            .unwrap_err()
            .into();
        assert!(matches!(error, Error::Execution(..)));
        assert_eq!(
            error.to_string(),
            "While executing the query:\nSELECT * FROM Documents: no such table: Documents"
        );
    }

    #[test]
    fn mapping_names_column() {
        let error = Error::Mapping {
            column: "title".into(),
            reason: "Cannot convert Int64(Some(3)) to bool".into(),
        };
        assert!(error.to_string().starts_with("Column `title` cannot be mapped"));
    }
}
