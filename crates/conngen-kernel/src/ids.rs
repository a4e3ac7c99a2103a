//! ID types for nodes and synapse models

use core::fmt;

/// Global identifier of a node (neuron or device)
///
/// Ids are assigned consecutively starting at 1; 0 never names a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new node ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Invalid node ID constant
    pub const INVALID: Self = Self(0);

    /// Check if this is a valid node ID
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a registered synapse model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SynapseModelId(pub usize);

impl SynapseModelId {
    /// Create a new synapse model ID
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SynapseModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}
