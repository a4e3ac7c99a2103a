//! Error types for connection building

use conngen_kernel::KernelError;
use thiserror::Error;

/// Result type for connection building
pub type Result<T> = std::result::Result<T, ConnError>;

/// Errors raised while constructing or running a connection builder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnError {
    /// Invalid connection or synapse specification
    #[error("Bad property: {reason}")]
    BadProperty {
        /// Reason the property is invalid
        reason: String,
    },

    /// Requested feature is not supported by this rule
    #[error("Not implemented: {reason}")]
    NotImplemented {
        /// Unsupported feature
        reason: String,
    },

    /// Synapse model name not registered
    #[error("Unknown synapse type: {name}")]
    UnknownSynapseType {
        /// Name that failed to resolve
        name: String,
    },

    /// Paired populations differ in size
    #[error("Dimension mismatch: {reason} (sources: {sources}, targets: {targets})")]
    DimensionMismatch {
        /// Description of the mismatch
        reason: String,
        /// Number of sources
        sources: usize,
        /// Number of targets
        targets: usize,
    },

    /// Edge is not allowed between the given endpoints
    #[error("Illegal connection: {reason}")]
    IllegalConnection {
        /// Reason the edge is illegal
        reason: String,
    },

    /// Edge to be removed does not exist
    #[error("Inexistent connection: {reason}")]
    InexistentConnection {
        /// Description of the missing edge
        reason: String,
    },

    /// Source or target collection is not usable
    #[error("Invalid node collection: {reason}")]
    InvalidNodeCollection {
        /// Reason the collection is invalid
        reason: String,
    },

    /// An array parameter ran out of values
    #[error("Parameter values exhausted.")]
    ParameterExhausted,

    /// Parameter read with the wrong numeric type
    #[error("Invalid parameter type: {reason}")]
    InvalidParameterType {
        /// Description of the mismatch
        reason: String,
    },

    /// Builder used in a way its state does not allow
    #[error("Internal error: {reason}")]
    Internal {
        /// Reason for the failure
        reason: String,
    },

    /// Other kernel service failure
    #[error("Kernel error: {source}")]
    Kernel {
        /// Source kernel error
        #[source]
        source: KernelError,
    },

    /// A worker thread failed during the parallel phase
    #[error("Worker thread {thread} failed: {source}")]
    WorkerFailed {
        /// Index of the failing thread
        thread: usize,
        /// Failure raised on that thread
        #[source]
        source: Box<ConnError>,
    },
}

impl ConnError {
    /// Create a bad property error
    pub fn bad_property(reason: impl Into<String>) -> Self {
        Self::BadProperty {
            reason: reason.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented(reason: impl Into<String>) -> Self {
        Self::NotImplemented {
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(reason: impl Into<String>, sources: usize, targets: usize) -> Self {
        Self::DimensionMismatch {
            reason: reason.into(),
            sources,
            targets,
        }
    }

    /// Create an illegal connection error
    pub fn illegal_connection(reason: impl Into<String>) -> Self {
        Self::IllegalConnection {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter type error
    pub fn invalid_parameter_type(reason: impl Into<String>) -> Self {
        Self::InvalidParameterType {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// The underlying failure, looking through worker wrappers
    pub fn root_cause(&self) -> &ConnError {
        match self {
            Self::WorkerFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<KernelError> for ConnError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::UnknownSynapseType { name } => Self::UnknownSynapseType { name },
            KernelError::BadProperty { reason } => Self::BadProperty { reason },
            KernelError::IllegalConnection { reason } => Self::IllegalConnection { reason },
            KernelError::InvalidNodeCollection { reason } => Self::InvalidNodeCollection { reason },
            err @ KernelError::InexistentConnection { .. } => Self::InexistentConnection {
                reason: err.to_string(),
            },
            source => Self::Kernel { source },
        }
    }
}
