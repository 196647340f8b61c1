use thiserror::Error;

/// Errors raised by engine mutation and evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// `add_variable` was called with a name that is already defined.
    #[error("variable already exists: {0}")]
    NameConflict(String),
    /// The named variable is not part of the model.
    #[error("variable not found: {0}")]
    NotFound(String),
    /// Strict mode only: a definition references a variable that does not exist.
    #[error("unresolved reference `{reference}` in definition of `{variable}`")]
    UnresolvedReference { variable: String, reference: String },
}

/// Errors produced while building or loading a model definition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate variable in model: {0}")]
    DuplicateVariable(String),
    #[error("invalid model definition: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ModelError {
    fn from(e: serde_yaml::Error) -> Self {
        ModelError::Invalid(e.to_string())
    }
}
