//! Synthesis errors.
use std::fmt;

use apollo_compiler::InvalidNameError;
use apollo_compiler::Name;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use displaydoc::Display;
use thiserror::Error;

/// Boxed error returned by data stores.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building the type registry or synthesizing the resolver map.
///
/// These are fatal: no partially synthesized schema is ever produced.
#[derive(Error, Display, Debug, PartialEq)]
#[non_exhaustive]
pub enum SchemaError {
    /// type '{type_name}' is defined more than once
    DuplicateType { type_name: Name },

    /// field '{type_name}.{field_name}' is defined more than once
    DuplicateField { type_name: Name, field_name: Name },

    /// field '{type_name}.{field_name}' references undefined type '{target}'
    UndefinedReference {
        type_name: Name,
        field_name: Name,
        target: Name,
    },

    /// type name '{type_name}' is reserved for root operation types
    ReservedTypeName { type_name: Name },

    /// field '{type_name}.{field_name}' has type '{target}' which is neither a scalar nor an object type
    UnsupportedFieldType {
        type_name: Name,
        field_name: Name,
        target: Name,
    },

    /// synthesized field '{field_name}' is derived from both '{first}' and '{second}'
    FieldNameCollision {
        field_name: Name,
        first: Name,
        second: Name,
    },

    /// generated input type '{type_name}' collides with a declared type
    GeneratedTypeCollision { type_name: Name },

    /// invalid type definitions: {message}
    InvalidSdl { message: String },

    /// synthesized schema failed validation: {message}
    InvalidGeneratedSchema { message: String },

    /// {0}
    InvalidName(#[from] InvalidNameError),

    /// could not read schema file: {message}
    Io { message: String },
}

/// Errors raised while compiling field arguments into a predicate, or decompiling one.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompileError {
    /// filter on '{field}.{nested}' nests deeper than one level
    UnsupportedNestingDepth { field: String, nested: String },

    /// value for '{path}' contains the reserved separator '&'
    ReservedSeparator { path: String },

    /// value for '{path}' is not a scalar
    NonScalarValue { path: String },

    /// nested filter on '{field}' has no entries
    EmptyNestedFilter { field: String },

    /// '{name}' is not a valid field name
    InvalidFieldName { name: String },

    /// malformed predicate term '{term}'
    MalformedPredicate { term: String },
}

impl CompileError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedNestingDepth { .. } => "UNSUPPORTED_NESTING_DEPTH",
            Self::ReservedSeparator { .. } => "RESERVED_SEPARATOR",
            Self::NonScalarValue { .. } => "NON_SCALAR_VALUE",
            Self::EmptyNestedFilter { .. } => "EMPTY_NESTED_FILTER",
            Self::InvalidFieldName { .. } => "INVALID_FIELD_NAME",
            Self::MalformedPredicate { .. } => "MALFORMED_PREDICATE",
        }
    }
}

/// A failure signaled by a [`DataAccess`](crate::store::DataAccess) implementation.
///
/// The wrapped error is propagated as-is; its message becomes the field error message.
#[derive(Debug)]
pub struct StoreError(BoxError);

impl StoreError {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(error.into())
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<BoxError> for StoreError {
    fn from(error: BoxError) -> Self {
        Self(error)
    }
}

/// Errors raised by a single resolver binding invocation.
///
/// These surface as field errors; sibling fields are unaffected.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ResolveError {
    /// {0}
    Compile(#[from] CompileError),

    /// {0}
    Store(#[from] StoreError),

    /// '{argument}' is not a filterable field of '{type_name}'
    UnknownArgument { type_name: Name, argument: String },

    /// invalid input for '{type_name}': {reason}
    InvalidInput { type_name: Name, reason: String },
}

impl ResolveError {
    /// The `extensions.code` reported in GraphQL errors.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compile(error) => error.code(),
            Self::Store(_) => "STORE_ERROR",
            Self::UnknownArgument { .. } => "UNKNOWN_ARGUMENT",
            Self::InvalidInput { .. } => "INVALID_INPUT",
        }
    }

    pub(crate) fn extensions(&self) -> JsonMap {
        let mut extensions = JsonMap::new();
        extensions.insert("code", JsonValue::String(self.code().into()));
        extensions
    }
}

/// Errors loading [`Configuration`](crate::Configuration).
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not parse configuration: {0}
    Yaml(#[from] serde_yaml::Error),

    /// could not read configuration file: {0}
    Io(#[from] std::io::Error),
}
