//! Exception and initialization error types

use std::fmt;

/// Result type for runtime operations
pub type RtResult<T> = Result<T, Exception>;

/// Exception classes raised by the runtime and by native entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Wrong argument count or argument kind
    TypeError,
    /// Internal failure of a native extension
    RuntimeError,
    /// Missing or read-only attribute
    AttributeError,
    /// Missing mapping key
    KeyError,
    /// Sequence index out of range
    IndexError,
    /// Right kind, wrong value
    ValueError,
    /// Unknown module
    ImportError,
    /// Broken runtime invariant
    SystemError,
}

impl ExceptionKind {
    /// Class name as seen by runtime code
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::ImportError => "ImportError",
            ExceptionKind::SystemError => "SystemError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raised runtime exception
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Exception {
    /// Exception class
    pub kind: ExceptionKind,
    /// Human readable message
    pub message: String,
}

impl Exception {
    /// Create an exception of the given class
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `TypeError`
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    /// Shorthand for a `RuntimeError`
    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::RuntimeError, message)
    }

    /// Shorthand for an `AttributeError`
    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::AttributeError, message)
    }

    /// Shorthand for a `KeyError`
    pub fn key_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::KeyError, message)
    }

    /// Shorthand for an `IndexError`
    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::IndexError, message)
    }

    /// Shorthand for a `ValueError`
    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::ValueError, message)
    }

    /// Whether this exception belongs to `kind`
    pub fn is(&self, kind: ExceptionKind) -> bool {
        self.kind == kind
    }
}

/// Errors from [`crate::Interpreter::initialize`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InitError {
    /// The calling thread already owns a live interpreter
    #[error("an interpreter is already bound to this thread")]
    AlreadyInitialized,

    /// A variable listed in `required_env` is absent from the process environment
    #[error("required environment variable `{0}` is not set")]
    MissingEnv(String),
}
