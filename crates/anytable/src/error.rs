use anytable_config::ConfigError;
use anytable_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let message = match &err.table {
            Some(table) => format!("[{table}] {}", err.message),
            None => err.message,
        };

        Self::new(err.class.into(), err.origin.into(), message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Invalid, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// No loaded adapter claimed the table identifier.
    NoAdapterFound,

    /// A value could not move between its adapter and engine forms.
    TypeConversion,

    /// The adapter lacks the operation and nothing can stand in for it.
    Unsupported,

    /// Two implementations were registered under one adapter name.
    DuplicateAdapterName,

    /// The resource behind an adapter failed.
    AdapterIo,

    /// Bad statement, argument or configuration.
    Invalid,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::AdapterIo => Self::AdapterIo,
            ErrorClass::DuplicateAdapterName => Self::DuplicateAdapterName,
            ErrorClass::Internal => Self::Internal,
            ErrorClass::InvalidArgument => Self::Invalid,
            ErrorClass::NoAdapterFound => Self::NoAdapterFound,
            ErrorClass::TypeConversion => Self::TypeConversion,
            ErrorClass::Unsupported => Self::Unsupported,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Adapter,
    Config,
    Dml,
    Field,
    Filter,
    Marshal,
    Planner,
    Registry,
    Session,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Adapter => Self::Adapter,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Dml => Self::Dml,
            CoreErrorOrigin::Field => Self::Field,
            CoreErrorOrigin::Filter => Self::Filter,
            CoreErrorOrigin::Marshal => Self::Marshal,
            CoreErrorOrigin::Planner => Self::Planner,
            CoreErrorOrigin::Registry => Self::Registry,
            CoreErrorOrigin::Session => Self::Session,
        }
    }
}

///
/// TESTS
///
