//! VM error types

use crate::object::PropertyKey;
use crate::value::Value;
use thiserror::Error;

/// VM execution errors
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g., calling non-function)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Range error
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Length argument or assignment is not a valid uint32
    #[error("RangeError: Invalid array length")]
    InvalidLength,

    /// Storage could not be allocated
    #[error("OutOfMemory")]
    OutOfMemory,

    /// A non-configurable property refused deletion in strict mode
    #[error("TypeError: property {key} is non-configurable and can't be deleted")]
    NotConfigurable {
        /// The refusing key
        key: PropertyKey,
    },

    /// Thrown JS exception
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),

    /// Execution was interrupted at a checkpoint
    #[error("Execution interrupted")]
    Interrupted,

    /// Stack overflow
    #[error("RangeError: Maximum call stack size exceeded")]
    StackOverflow,

    /// Internal error
    #[error("InternalError: {0}")]
    InternalError(String),
}

/// Coarse classification of a [`VmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Storage growth or conversion could not allocate
    AllocationFailure,
    /// Length outside the uint32 range
    InvalidLength,
    /// A user callback, getter or conversion failed
    CallbackFailure,
    /// Invalid receiver or argument type
    TypeError,
    /// Deletion refused by a non-configurable property
    NotConfigurable,
    /// An interrupt checkpoint or the call depth limit tripped
    OperationLimitExceeded,
    /// Engine bug
    Internal,
}

/// A thrown JavaScript value
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// The thrown value (as a string representation)
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create an interrupted error
    pub fn interrupted() -> Self {
        Self::Interrupted
    }

    /// Create a non-configurable deletion error
    pub fn not_configurable(key: PropertyKey) -> Self {
        Self::NotConfigurable { key }
    }

    /// Create an exception from a thrown JS value
    pub fn exception(value: Value) -> Self {
        let message = match value.as_string() {
            Some(s) => s.to_string(),
            None => format!("{:?}", value),
        };
        Self::Exception(Box::new(ThrownValue { message, value }))
    }

    /// The thrown value, if this error carries one
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Self::Exception(thrown) => Some(&thrown.value),
            _ => None,
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfMemory => ErrorKind::AllocationFailure,
            Self::InvalidLength => ErrorKind::InvalidLength,
            Self::Exception(_) | Self::RangeError(_) => ErrorKind::CallbackFailure,
            Self::TypeError(_) => ErrorKind::TypeError,
            Self::NotConfigurable { .. } => ErrorKind::NotConfigurable,
            Self::Interrupted | Self::StackOverflow => ErrorKind::OperationLimitExceeded,
            Self::InternalError(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for VM operations
pub type VmResult<T> = Result<T, VmError>;
