//! Bridge error types

use thiserror::Error;

use tether_runtime::Exception;

/// A runtime object could not be converted into a host value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The object has the wrong kind
    #[error("expected {expected}, got '{got}'")]
    Mismatch {
        /// Expected host kind
        expected: String,
        /// Runtime type name of the object
        got: String,
    },

    /// The number does not fit the destination
    #[error("{value} is out of range for {target}")]
    OutOfRange {
        /// Rendered value
        value: String,
        /// Destination type
        target: &'static str,
    },

    /// A wrapper of an unregistered or different bridged type
    #[error("'{got}' is not a bridged {expected}")]
    WrongWrapper {
        /// Expected host type
        expected: &'static str,
        /// Runtime type name of the wrapper
        got: String,
    },

    /// Failure inside a container element or struct field
    #[error("{path}: {source}")]
    Nested {
        /// Element index, map key or field name
        path: String,
        /// Underlying failure
        #[source]
        source: Box<ConversionError>,
    },

    /// The runtime raised while the object was inspected
    #[error(transparent)]
    Runtime(#[from] Exception),
}

impl ConversionError {
    pub(crate) fn mismatch(expected: impl Into<String>, got: &tether_runtime::Object) -> Self {
        ConversionError::Mismatch {
            expected: expected.into(),
            got: got.type_name(),
        }
    }

    pub(crate) fn at(self, path: impl Into<String>) -> Self {
        ConversionError::Nested {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// Failure seen by host code driving the bridge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Value conversion failed
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// The runtime raised an exception
    #[error(transparent)]
    Runtime(#[from] Exception),
}
