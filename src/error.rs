//! Error types for csvtag
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Converters report the narrower [`ConvertError`], which the row codec lifts
//! into [`Error`] together with the row, column and field it happened in.

use thiserror::Error;

/// Boxed error returned by custom marshal/unmarshal hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for csvtag
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Type Errors
    // ============================================================================
    #[error("Invalid target type '{type_name}': {message}")]
    InvalidTargetType {
        type_name: &'static str,
        message: String,
    },

    #[error("Unsupported type '{type_name}' for field '{field}'")]
    UnsupportedFieldType {
        field: String,
        type_name: &'static str,
    },

    #[error("Cannot materialize '{type_name}': target is not settable")]
    CannotMaterialize { type_name: &'static str },

    // ============================================================================
    // Field Errors
    // ============================================================================
    #[error("Failed to convert field '{field}' at row {row}, column {column} (value {value:?}): {source}")]
    FieldParse {
        row: u64,
        column: usize,
        field: String,
        value: String,
        #[source]
        source: ConvertError,
    },

    #[error("Custom codec for field '{field}' failed: {source}")]
    CustomCodec {
        field: String,
        #[source]
        source: BoxError,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("Record stream closed by receiver")]
    StreamClosed,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid target type error
    pub fn invalid_target(type_name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidTargetType {
            type_name,
            message: message.into(),
        }
    }

    /// Name of the field the error is attributed to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::UnsupportedFieldType { field, .. }
            | Error::FieldParse { field, .. }
            | Error::CustomCodec { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result type alias for csvtag
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Converter Errors
// ============================================================================

/// Failure reported by a single field converter
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("no converter for type '{type_name}'")]
    Unsupported { type_name: &'static str },

    #[error("{0}")]
    Parse(BoxError),

    #[error("value {value} out of range for '{type_name}'")]
    OutOfRange {
        value: String,
        type_name: &'static str,
    },

    #[error("invalid format layout '{layout}'")]
    Format { layout: String },

    #[error("cannot materialize '{type_name}'")]
    CannotMaterialize { type_name: &'static str },

    #[error(transparent)]
    Custom(BoxError),
}

impl ConvertError {
    /// Create a parse error from any error type
    pub fn parse(err: impl Into<BoxError>) -> Self {
        Self::Parse(err.into())
    }

    /// Create a custom hook error from any error type
    pub fn custom(err: impl Into<BoxError>) -> Self {
        Self::Custom(err.into())
    }
}

/// Where in the stream a converter ran
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldContext<'a> {
    pub row: u64,
    pub column: usize,
    pub field: &'a str,
    pub value: &'a str,
}

impl ConvertError {
    /// Lift into a session-level error carrying the field context
    pub(crate) fn in_field(self, ctx: FieldContext<'_>) -> Error {
        match self {
            ConvertError::Unsupported { type_name } => Error::UnsupportedFieldType {
                field: ctx.field.to_string(),
                type_name,
            },
            ConvertError::CannotMaterialize { type_name } => Error::CannotMaterialize { type_name },
            ConvertError::Custom(source) => Error::CustomCodec {
                field: ctx.field.to_string(),
                source,
            },
            other => Error::FieldParse {
                row: ctx.row,
                column: ctx.column,
                field: ctx.field.to_string(),
                value: ctx.value.to_string(),
                source: other,
            },
        }
    }
}
