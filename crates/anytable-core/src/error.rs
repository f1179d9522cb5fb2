use derive_more::Display;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// `table` is filled in once the error crosses a virtual-table boundary
/// so callers can tell which resource failed.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
    pub table: Option<String>,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            table: None,
            detail: None,
        }
    }

    /// Attach the table identifier, keeping the first one recorded.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        if self.table.is_none() {
            self.table = Some(table.into());
        }

        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// No loaded adapter claimed the identifier.
    pub fn no_adapter_found(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();

        Self::new(
            ErrorClass::NoAdapterFound,
            ErrorOrigin::Registry,
            format!("no adapter found for table '{identifier}'"),
        )
        .with_detail(ErrorDetail::NoAdapterFound { identifier })
    }

    /// Two different implementations share one adapter name.
    pub fn duplicate_adapter_name(name: impl Into<String>) -> Self {
        let name = name.into();

        Self::new(
            ErrorClass::DuplicateAdapterName,
            ErrorOrigin::Registry,
            format!("multiple adapters registered under the name '{name}'"),
        )
    }

    /// The adapter cannot perform the mutation and no fallback exists.
    pub fn unsupported_operation(operation: &'static str) -> Self {
        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Dml,
            format!("adapter does not support {operation}"),
        )
        .with_detail(ErrorDetail::UnsupportedOperation { operation })
    }

    /// A table lookup miss; the session reacts by running discovery.
    pub fn no_such_table(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();

        Self::new(
            ErrorClass::InvalidArgument,
            ErrorOrigin::Session,
            format!("no such table: {identifier}"),
        )
        .with_detail(ErrorDetail::NoSuchTable { identifier })
    }

    /// Wrap a failure raised inside an adapter.
    pub fn adapter_io(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::AdapterIo, ErrorOrigin::Adapter, message)
    }

    pub(crate) fn planner_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Planner, message)
    }

    pub(crate) fn planner_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Planner, message)
    }

    pub(crate) fn session_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Session, message)
    }

    pub(crate) fn marshal_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Marshal, message)
    }

    pub(crate) fn filter_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Filter, message)
    }

    /// Invalid constructor arguments or configuration handed to an adapter.
    pub fn adapter_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Adapter, message)
    }

    #[must_use]
    pub const fn is_no_such_table(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::NoSuchTable { .. }))
    }

    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self.class, ErrorClass::Unsupported)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        match &self.table {
            Some(table) => format!("{}:{}: [{table}] {}", self.origin, self.class, self.message),
            None => format!("{}:{}: {}", self.origin, self.class, self.message),
        }
    }
}

impl From<TypeConversionError> for InternalError {
    fn from(err: TypeConversionError) -> Self {
        Self::new(ErrorClass::TypeConversion, ErrorOrigin::Field, err.to_string())
            .with_detail(ErrorDetail::TypeConversion(err))
    }
}

///
/// TypeConversionError
///
/// A value could not be converted between its adapter and engine forms.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("cannot convert {value} in column '{column}': expected {expected}")]
pub struct TypeConversionError {
    pub column: String,
    pub value: String,
    pub expected: String,
}

///
/// ErrorDetail
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorDetail {
    NoAdapterFound { identifier: String },
    NoSuchTable { identifier: String },
    TypeConversion(TypeConversionError),
    UnsupportedOperation { operation: &'static str },
}

///
/// ErrorClass
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorClass {
    #[display("adapter_io")]
    AdapterIo,
    #[display("duplicate_adapter_name")]
    DuplicateAdapterName,
    #[display("internal")]
    Internal,
    #[display("invalid_argument")]
    InvalidArgument,
    #[display("no_adapter_found")]
    NoAdapterFound,
    #[display("type_conversion")]
    TypeConversion,
    #[display("unsupported")]
    Unsupported,
}

///
/// ErrorOrigin
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorOrigin {
    #[display("adapter")]
    Adapter,
    #[display("config")]
    Config,
    #[display("dml")]
    Dml,
    #[display("field")]
    Field,
    #[display("filter")]
    Filter,
    #[display("marshal")]
    Marshal,
    #[display("planner")]
    Planner,
    #[display("registry")]
    Registry,
    #[display("session")]
    Session,
}

///
/// TESTS
///
