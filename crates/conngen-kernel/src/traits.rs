//! Service interfaces consumed by the connection builders

use crate::{
    config::KernelConfig,
    dict::ParamDict,
    error::Result,
    ids::{NodeId, SynapseModelId},
    node_collection::NodeCollection,
    rng::RngManager,
    vp::VirtualProcessMap,
};

/// A node as seen from one thread
///
/// For nodes owned by another thread or rank the handle describes a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    /// Global id
    pub id: NodeId,
    /// Thread the handle belongs to
    pub thread: usize,
    /// Whether this is a stand-in for a node owned elsewhere
    pub is_proxy: bool,
    /// Whether the node is represented by proxies on other threads.
    /// Devices are replicated on every thread instead.
    pub has_proxies: bool,
}

/// Registry of all nodes known to the kernel
pub trait NodeRegistry: Send + Sync {
    /// Total number of nodes, local and remote
    fn num_nodes(&self) -> usize;

    /// Virtual-process layout
    fn vp_map(&self) -> VirtualProcessMap;

    /// Node as seen from thread `tid`, or a proxy if another thread owns it
    fn node_or_proxy(&self, id: NodeId, tid: usize) -> Result<NodeHandle>;

    /// Whether the node is owned by this rank
    fn is_local_node_id(&self, id: NodeId) -> bool {
        self.vp_map().is_local_node(id)
    }

    /// Nodes materialized on thread `tid`, in ascending id order
    fn local_nodes(&self, tid: usize) -> Result<Vec<NodeHandle>>;

    /// Check that every member of the collection exists
    fn validate_collection(&self, nodes: &NodeCollection) -> Result<()>;

    /// Adjust the named synaptic-element counter of a node by `delta`
    fn connect_synaptic_element(&self, id: NodeId, name: &str, delta: i32) -> Result<()>;

    /// Current value of the named synaptic-element counter
    fn synaptic_elements(&self, id: NodeId, name: &str) -> i64;
}

/// Capabilities of a synapse model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProperties {
    /// Registered name
    pub name: String,
    /// Model may only be used on symmetric topologies
    pub requires_symmetric: bool,
    /// Weight is shared by all edges and cannot be set per edge
    pub homogeneous_weight: bool,
}

/// Registry of synapse models
pub trait ModelRegistry: Send + Sync {
    /// Resolve a model name
    fn synapse_model_id(&self, name: &str) -> Result<SynapseModelId>;

    /// Capability flags of a model
    fn model_properties(&self, id: SynapseModelId) -> Result<ModelProperties>;

    /// Default parameter values of a model, including `weight` and `delay`
    fn connector_defaults(&self, id: SynapseModelId) -> Result<ParamDict>;

    /// Check that all named parameters may be set on edges of this model
    fn check_synapse_params(&self, id: SynapseModelId, names: &[&str]) -> Result<()>;
}

/// Which of weight and delay are given explicitly for an edge
///
/// Anything not given falls back to the model default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeValues {
    /// Weight and delay both from the model defaults
    ModelDefaults,
    /// Explicit delay, default weight
    Delay(f64),
    /// Explicit weight, default delay
    Weight(f64),
    /// Both explicit
    WeightAndDelay {
        /// Edge weight
        weight: f64,
        /// Edge delay in milliseconds
        delay: f64,
    },
}

impl EdgeValues {
    /// Build from optional explicit values
    pub fn from_parts(weight: Option<f64>, delay: Option<f64>) -> Self {
        match (weight, delay) {
            (None, None) => Self::ModelDefaults,
            (None, Some(delay)) => Self::Delay(delay),
            (Some(weight), None) => Self::Weight(weight),
            (Some(weight), Some(delay)) => Self::WeightAndDelay { weight, delay },
        }
    }

    /// Explicit weight, if any
    pub fn weight(&self) -> Option<f64> {
        match *self {
            Self::Weight(w) | Self::WeightAndDelay { weight: w, .. } => Some(w),
            _ => None,
        }
    }

    /// Explicit delay, if any
    pub fn delay(&self) -> Option<f64> {
        match *self {
            Self::Delay(d) | Self::WeightAndDelay { delay: d, .. } => Some(d),
            _ => None,
        }
    }
}

/// Low-level edge storage
///
/// Implementations may assume that concurrent calls for different `tid`
/// values touch disjoint targets.
pub trait EdgeStore: Send + Sync {
    /// Store an edge from `source` to `target` on thread `tid`
    fn connect(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        model: SynapseModelId,
        params: &ParamDict,
        values: EdgeValues,
    ) -> Result<()>;

    /// Fail `InexistentConnection` unless an edge from `source` to `target`
    /// of the given model is stored on thread `tid`
    fn check_edge(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        model: SynapseModelId,
    ) -> Result<()>;

    /// Remove one edge from `source` to `target` of the given model
    fn disconnect(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        model: SynapseModelId,
    ) -> Result<()>;
}

/// Facade bundling all services a connection builder needs
pub trait Kernel: NodeRegistry + ModelRegistry + EdgeStore {
    /// Kernel configuration
    fn config(&self) -> &KernelConfig;

    /// Random number streams
    fn rngs(&self) -> &RngManager;

    /// Number of local worker threads
    fn num_threads(&self) -> usize {
        self.config().local_num_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_values_from_parts() {
        assert_eq!(EdgeValues::from_parts(None, None), EdgeValues::ModelDefaults);
        assert_eq!(EdgeValues::from_parts(None, Some(2.0)).delay(), Some(2.0));
        assert_eq!(EdgeValues::from_parts(Some(0.5), None).weight(), Some(0.5));
        let both = EdgeValues::from_parts(Some(0.5), Some(2.0));
        assert_eq!(both.weight(), Some(0.5));
        assert_eq!(both.delay(), Some(2.0));
    }
}
