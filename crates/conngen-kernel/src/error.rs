//! Error types for the kernel services

use thiserror::Error;

/// Result type for kernel operations
pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors that can occur in the kernel services
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Synapse model name not registered
    #[error("Unknown synapse type: {name}")]
    UnknownSynapseType {
        /// Name that failed to resolve
        name: String,
    },

    /// Synapse model id not registered
    #[error("Unknown synapse model id: {id}")]
    UnknownSynapseModel {
        /// Id that failed to resolve
        id: usize,
    },

    /// Node id not present in the registry
    #[error("Node {id} does not exist")]
    UnknownNode {
        /// Id that failed to resolve
        id: u64,
    },

    /// Thread index outside the configured range
    #[error("Thread {thread} is not a local thread (local threads: {num_threads})")]
    UnknownThread {
        /// Requested thread index
        thread: usize,
        /// Number of configured local threads
        num_threads: usize,
    },

    /// Requested edge does not exist
    #[error("No connection from {source_id} to {target_id} with synapse model {model}")]
    InexistentConnection {
        /// Source node id
        source_id: u64,
        /// Target node id
        target_id: u64,
        /// Synapse model name
        model: String,
    },

    /// Edge cannot be created between the given endpoints
    #[error("Illegal connection: {reason}")]
    IllegalConnection {
        /// Reason the edge is illegal
        reason: String,
    },

    /// Invalid property value
    #[error("Bad property: {reason}")]
    BadProperty {
        /// Reason the property is invalid
        reason: String,
    },

    /// Invalid node collection
    #[error("Invalid node collection: {reason}")]
    InvalidNodeCollection {
        /// Reason the collection is invalid
        reason: String,
    },

    /// Invalid kernel configuration
    #[error("Invalid kernel configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration file error: {reason}")]
    ConfigFile {
        /// Reason the file was rejected
        reason: String,
    },

    /// Random distribution rejected its parameters
    #[error("Invalid distribution parameters: {reason}")]
    Distribution {
        /// Reason reported by the distribution
        reason: String,
    },
}

impl KernelError {
    /// Create a bad property error
    pub fn bad_property(reason: impl Into<String>) -> Self {
        Self::BadProperty {
            reason: reason.into(),
        }
    }

    /// Create an illegal connection error
    pub fn illegal_connection(reason: impl Into<String>) -> Self {
        Self::IllegalConnection {
            reason: reason.into(),
        }
    }

    /// Create an invalid node collection error
    pub fn invalid_collection(reason: impl Into<String>) -> Self {
        Self::InvalidNodeCollection {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create a configuration file error
    pub fn config_file(reason: impl Into<String>) -> Self {
        Self::ConfigFile {
            reason: reason.into(),
        }
    }

    /// Create a distribution error
    pub fn distribution(reason: impl Into<String>) -> Self {
        Self::Distribution {
            reason: reason.into(),
        }
    }
}
