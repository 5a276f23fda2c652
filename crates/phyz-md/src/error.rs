//! Error types for phyz-md.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairError {
    #[error("species '{0}' is already registered")]
    DuplicateSpecies(String),

    #[error("unknown species: {0}")]
    UnknownSpecies(String),

    #[error("unknown parameter field: {0}")]
    UnknownField(String),

    #[error("invalid species handle: {0:?}")]
    InvalidHandle(String),

    #[error("invalid value {value} for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: f64,
        reason: &'static str,
    },

    #[error("species '{species}' is missing required field {field}")]
    MissingField { species: String, field: String },

    #[error("no species registered")]
    NoSpecies,

    #[error("unknown pair style: {0}")]
    UnknownStyle(String),

    #[error("fix is not prepared for a run (state: {0})")]
    NotPrepared(&'static str),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("restart chunk: {0}")]
    Restart(#[from] RestartFormatError),
}

impl PairError {
    /// True for errors raised while configuring or preparing the table.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PairError::DuplicateSpecies(_)
                | PairError::UnknownSpecies(_)
                | PairError::UnknownField(_)
                | PairError::InvalidHandle(_)
                | PairError::InvalidValue { .. }
                | PairError::MissingField { .. }
                | PairError::NoSpecies
                | PairError::UnknownStyle(_)
        )
    }

    /// True for malformed restart chunks.
    pub fn is_restart(&self) -> bool {
        matches!(self, PairError::Restart(_))
    }
}

/// Malformed or arity-mismatched restart chunk.
#[derive(Debug, Error, PartialEq)]
pub enum RestartFormatError {
    #[error("missing header line")]
    MissingHeader,

    #[error("unsupported potential tag '{0}'")]
    UnsupportedTag(String),

    #[error("unknown number format '{0}'")]
    UnknownFormat(String),

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unknown field '{name}'")]
    UnknownField { line: usize, name: String },

    #[error("line {line}: expected field '{expected}', found '{found}'")]
    FieldOrder {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: '{text}' is not a number")]
    BadNumber { line: usize, text: String },

    #[error("header declares {declared} species, chunk contains {found}")]
    SpeciesCount { declared: usize, found: usize },

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, PairError>;
