//! Error types and status chains for numtab
//!
//! Every fallible operation returns [`Result`]. Validation passes build a
//! [`Status`] that collects several independent failures before any numeric
//! work starts; a non-ok status converts into [`Error::Failed`].
//!
//! ```
//! use numtab_core::error::{ErrorKind, ErrorRecord, Status};
//!
//! let mut status = Status::ok();
//! status |= Status::ok();
//! status |= ErrorRecord::new(ErrorKind::ParameterOutOfRange).with_argument("sigma");
//! assert!(!status.is_ok());
//! assert!(status.contains(ErrorKind::ParameterOutOfRange));
//! assert!(status.into_result().is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use thiserror::Error;

/// Closed set of failure conditions reported by the library
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A dynamic allocation could not be satisfied
    #[error("Memory allocation failed")]
    MemoryAllocationFailed,

    /// A required input table was not provided
    #[error("Input numeric table is not set")]
    NullInputNumericTable,

    /// Table storage has not been allocated
    #[error("Numeric table storage is not allocated")]
    NullNumericTable,

    /// A result was requested before it was computed
    #[error("Result is not available")]
    NullResult,

    /// A partial result was requested before any chunk was processed
    #[error("Partial result is not available")]
    NullPartialResult,

    #[error("Incorrect number of rows")]
    IncorrectNumberOfRows,

    #[error("Incorrect number of columns")]
    IncorrectNumberOfColumns,

    /// A buffer length disagrees with the declared shape
    #[error("Incorrect size of array")]
    IncorrectSizeOfArray,

    /// The stored object's dynamic type is not the one the algorithm expects
    #[error("Incorrect type of input object")]
    IncorrectTypeOfInput,

    /// A feature's semantic kind is not supported by the algorithm
    #[error("Incorrect feature kind")]
    IncorrectFeatureKind,

    #[error("Numeric table is read-only")]
    ReadOnlyNumericTable,

    #[error("Incorrect sparse column indices")]
    IncorrectSparseIndices,

    #[error("Incorrect sparse row offsets")]
    IncorrectRowOffsets,

    #[error("Parameter is out of range")]
    ParameterOutOfRange,

    #[error("Incorrect parameter")]
    IncorrectParameter,

    /// Raw argument index outside the collection's identifier enumeration
    #[error("Argument identifier is not defined for this collection")]
    UndefinedArgumentId,

    #[error("Not enough observations")]
    NotEnoughObservations,

    #[error("Feature has zero variance")]
    ZeroVarianceFeature,

    #[error("Non-finite value encountered")]
    NonFiniteValue,

    /// No kernel is registered for any tier at or below the selected one
    #[error("No kernel registered")]
    KernelNotRegistered,

    #[error("CPU feature not available")]
    CpuFeatureNotAvailable,

    /// Failure that does not originate from a status chain
    #[error("Internal error")]
    Internal,
}

/// Coarse classification used to decide whether a failure is recoverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Fatal: the current computation is aborted
    Allocation,
    /// Recoverable: the caller can fix inputs or parameters and retry
    Validation,
    /// Something was requested before it exists
    NotReady,
    /// Raised from inside a kernel
    Numeric,
    Internal,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::MemoryAllocationFailed => ErrorCategory::Allocation,
            Self::NullResult | Self::NullPartialResult => ErrorCategory::NotReady,
            Self::ZeroVarianceFeature | Self::NonFiniteValue => ErrorCategory::Numeric,
            Self::KernelNotRegistered | Self::CpuFeatureNotAvailable | Self::Internal => {
                ErrorCategory::Internal
            }
            _ => ErrorCategory::Validation,
        }
    }

    /// Whether the caller may fix its inputs and call again
    pub fn is_recoverable(self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::NotReady | ErrorCategory::Numeric
        )
    }
}

/// One failure: kind, the argument that triggered it, and free-form detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    kind: ErrorKind,
    argument: Option<String>,
    detail: Option<String>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            argument: None,
            detail: None,
        }
    }

    /// Name the parameter or table that triggered the failure
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(argument) = &self.argument {
            write!(f, " (argument '{argument}')")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// Composable chain of zero or more error records; ok iff empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    records: Vec<ErrorRecord>,
}

impl Status {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        ErrorRecord::new(kind).into()
    }

    /// Build a status that fails with `record` unless `condition` holds
    pub fn ensure(condition: bool, record: impl FnOnce() -> ErrorRecord) -> Self {
        if condition {
            Self::ok()
        } else {
            record().into()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.records.iter().any(|r| r.kind == kind)
    }

    pub fn find(&self, kind: ErrorKind) -> Option<&ErrorRecord> {
        self.records.iter().find(|r| r.kind == kind)
    }

    pub fn first(&self) -> Option<&ErrorRecord> {
        self.records.first()
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::Failed(self))
        }
    }
}

impl From<ErrorRecord> for Status {
    fn from(record: ErrorRecord) -> Self {
        Self {
            records: vec![record],
        }
    }
}

impl From<ErrorKind> for Status {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

impl BitOrAssign for Status {
    fn bitor_assign(&mut self, rhs: Status) {
        self.records.extend(rhs.records);
    }
}

impl BitOrAssign<ErrorRecord> for Status {
    fn bitor_assign(&mut self, rhs: ErrorRecord) {
        self.records.push(rhs);
    }
}

/// Fold a fallible step into the chain
impl BitOrAssign<Result<()>> for Status {
    fn bitor_assign(&mut self, rhs: Result<()>) {
        if let Err(err) = rhs {
            *self |= Status::from(err);
        }
    }
}

impl BitOr for Status {
    type Output = Status;

    fn bitor(mut self, rhs: Status) -> Status {
        self |= rhs;
        self
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.records.is_empty() {
            return f.write_str("ok");
        }
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Failed(status) => status,
            other => ErrorRecord::new(ErrorKind::Internal)
                .with_detail(other.to_string())
                .into(),
        }
    }
}

/// Core error type for numtab operations
#[derive(Error, Debug)]
pub enum Error {
    /// One or more recorded failures
    #[error("{0}")]
    Failed(Status),

    /// Snapshot (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::Failed(status)
    }
}

impl From<ErrorRecord> for Error {
    fn from(record: ErrorRecord) -> Self {
        Self::Failed(record.into())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::Failed(Status::from_kind(kind))
    }
}

// Helper functions for common error patterns

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        kind.into()
    }

    pub fn with_argument(kind: ErrorKind, argument: impl Into<String>) -> Self {
        ErrorRecord::new(kind).with_argument(argument).into()
    }

    pub fn with_detail(
        kind: ErrorKind,
        argument: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        ErrorRecord::new(kind)
            .with_argument(argument)
            .with_detail(detail)
            .into()
    }

    /// Required input table missing
    pub fn null_input(argument: &str) -> Self {
        Self::with_argument(ErrorKind::NullInputNumericTable, argument)
    }

    /// Allocation failure with a description of the request
    pub fn allocation(detail: impl Into<String>) -> Self {
        ErrorRecord::new(ErrorKind::MemoryAllocationFailed)
            .with_detail(detail)
            .into()
    }

    pub fn parameter_out_of_range(argument: &str, detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::ParameterOutOfRange, argument, detail)
    }

    /// Stored object did not narrow to the expected type
    pub fn incorrect_type(argument: &str, expected: &str) -> Self {
        Self::with_detail(
            ErrorKind::IncorrectTypeOfInput,
            argument,
            format!("expected {expected}"),
        )
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::with_detail(
            ErrorKind::IncorrectSizeOfArray,
            context,
            format!("expected {expected} elements, got {actual}"),
        )
    }

    /// The status chain, if this error carries one
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Failed(status) => Some(status),
            _ => None,
        }
    }

    /// First recorded kind; `Internal` for errors without a status chain
    pub fn kind(&self) -> ErrorKind {
        self.status()
            .and_then(|s| s.first())
            .map_or(ErrorKind::Internal, |r| r.kind())
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.status().is_some_and(|s| s.contains(kind))
    }

    /// Argument name attached to the first record
    pub fn argument(&self) -> Option<&str> {
        self.status()
            .and_then(|s| s.first())
            .and_then(|r| r.argument())
    }
}
