use super::container::ElementKind;
use super::property::PropertyDataType;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("A data object with identifier '{0}' already exists in the collection")]
    DuplicateIdentifier(String),

    #[error("Data object '{0}' not found in the collection")]
    ObjectNotFound(String),

    #[error("The data collection contains no {kind} container")]
    MissingContainer { kind: ElementKind },

    #[error("Property '{name}' has {found} elements, but its container holds {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Property '{name}' must be of type {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: PropertyDataType,
        found: PropertyDataType,
    },

    #[error("'{0}' is not a standard property name")]
    UnknownStandardProperty(String),
}
