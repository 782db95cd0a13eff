use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which numeric column of a line item failed to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemField {
    Quantity,
    Rate,
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemField::Quantity => write!(f, "quantity"),
            ItemField::Rate => write!(f, "rate"),
        }
    }
}

#[derive(Debug, Error)]
pub enum QuotationError {
    #[error("item {row}: {field} {value:?} is not a valid number")]
    InvalidNumber { row: usize, field: ItemField, value: String },
    #[error("at least one line item is required")]
    EmptyItems,
    #[error("{section}: {field} is required")]
    MissingField { section: String, field: &'static str },
    #[error("identifier {0:?} must not contain path separators")]
    InvalidIdentifier(String),
    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("'typst' is not installed or not on PATH")]
    TypstUnavailable,
    #[error("typst compilation failed: {0}")]
    Compile(String),
}

impl QuotationError {
    pub(crate) fn missing(section: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField { section: section.into(), field }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem { path: path.into(), source }
    }

    /// True for errors caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidNumber { .. }
                | Self::EmptyItems
                | Self::MissingField { .. }
                | Self::InvalidIdentifier(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(String),
}

pub type Result<T, E = QuotationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_number_names_row_and_field() {
        let err = QuotationError::InvalidNumber {
            row: 3,
            field: ItemField::Rate,
            value: "abc".to_owned(),
        };
        assert_eq!(err.to_string(), "item 3: rate \"abc\" is not a valid number");
        assert!(err.is_validation());
    }

    #[test]
    fn filesystem_errors_are_not_validation() {
        let err = QuotationError::fs(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("filesystem error at /nope"));
    }
}
