//! In-memory kernel backend
//!
//! `MemoryKernel` is a complete, single-rank view of a possibly multi-rank
//! run. Running one instance per rank with the same configuration (apart
//! from `rank`) and the same node creation calls reproduces a distributed
//! run; the union of the instances' edges is the global graph.

use crate::{
    config::KernelConfig,
    dict::{ParamDict, ParamScalar, DELAY, WEIGHT},
    error::{KernelError, Result},
    ids::{NodeId, SynapseModelId},
    node_collection::NodeCollection,
    rng::RngManager,
    traits::{EdgeStore, EdgeValues, Kernel, ModelProperties, ModelRegistry, NodeHandle, NodeRegistry},
    vp::VirtualProcessMap,
};

use parking_lot::Mutex;
use std::collections::HashMap;

/// Kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Owned by exactly one virtual process, proxied everywhere else
    Neuron,
    /// Replicated on every thread, never proxied
    Device,
}

/// Definition of a synapse model
#[derive(Debug, Clone, PartialEq)]
pub struct SynapseModel {
    /// Registered name
    pub name: String,
    /// Model may only be used on symmetric topologies
    pub requires_symmetric: bool,
    /// Weight is shared by all edges
    pub homogeneous_weight: bool,
    /// Default parameter values, including `weight` and `delay`
    pub defaults: ParamDict,
}

impl SynapseModel {
    /// Model with unit weight and delay
    pub fn new(name: impl Into<String>) -> Self {
        let mut defaults = ParamDict::new();
        defaults.insert(WEIGHT.to_string(), ParamScalar::Double(1.0));
        defaults.insert(DELAY.to_string(), ParamScalar::Double(1.0));
        Self {
            name: name.into(),
            requires_symmetric: false,
            homogeneous_weight: false,
            defaults,
        }
    }

    /// Add or replace a default parameter
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<ParamScalar>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Mark the model as requiring symmetric topology
    pub fn requiring_symmetric(mut self) -> Self {
        self.requires_symmetric = true;
        self
    }

    /// Mark the weight as shared by all edges
    pub fn with_homogeneous_weight(mut self) -> Self {
        self.homogeneous_weight = true;
        self
    }

    fn properties(&self) -> ModelProperties {
        ModelProperties {
            name: self.name.clone(),
            requires_symmetric: self.requires_symmetric,
            homogeneous_weight: self.homogeneous_weight,
        }
    }
}

/// Models every kernel starts with
pub fn builtin_synapse_models() -> Vec<SynapseModel> {
    vec![
        SynapseModel::new("static_synapse").with_default("receptor_type", 0i64),
        SynapseModel::new("static_synapse_hom_w")
            .with_default("receptor_type", 0i64)
            .with_homogeneous_weight(),
        SynapseModel::new("stdp_synapse")
            .with_default("receptor_type", 0i64)
            .with_default("tau_plus", 20.0)
            .with_default("lambda", 0.01)
            .with_default("alpha", 1.0)
            .with_default("mu_plus", 1.0)
            .with_default("mu_minus", 1.0)
            .with_default("Wmax", 100.0),
        SynapseModel::new("gap_junction").requiring_symmetric(),
    ]
}

/// A stored edge
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Synapse model
    pub model: SynapseModelId,
    /// Weight
    pub weight: f64,
    /// Delay in milliseconds
    pub delay: f64,
    /// Remaining model parameters
    pub params: ParamDict,
    /// Thread that stores the edge
    pub thread: usize,
}

/// In-memory implementation of all kernel services
#[derive(Debug)]
pub struct MemoryKernel {
    config: KernelConfig,
    vp_map: VirtualProcessMap,
    nodes: Vec<NodeKind>,
    models: Vec<SynapseModel>,
    model_index: HashMap<String, SynapseModelId>,
    /// Edges, partitioned by storing thread
    edges: Vec<Mutex<Vec<Edge>>>,
    /// Synaptic-element counters, partitioned by owning thread
    elements: Vec<Mutex<HashMap<(NodeId, String), i64>>>,
    rngs: RngManager,
}

impl MemoryKernel {
    /// Create an empty kernel with the built-in synapse models
    pub fn new(config: KernelConfig) -> Result<Self> {
        config.validate()?;
        let num_threads = config.local_num_threads;
        let mut kernel = Self {
            vp_map: config.vp_map(),
            rngs: RngManager::new(&config),
            config,
            nodes: Vec::new(),
            models: Vec::new(),
            model_index: HashMap::new(),
            edges: (0..num_threads).map(|_| Mutex::new(Vec::new())).collect(),
            elements: (0..num_threads).map(|_| Mutex::new(HashMap::new())).collect(),
        };
        for model in builtin_synapse_models() {
            kernel.register_synapse_model(model)?;
        }
        Ok(kernel)
    }

    /// Register an additional synapse model
    pub fn register_synapse_model(&mut self, model: SynapseModel) -> Result<SynapseModelId> {
        if self.model_index.contains_key(&model.name) {
            return Err(KernelError::bad_property(format!(
                "Synapse model {} is already registered",
                model.name
            )));
        }
        for key in [WEIGHT, DELAY] {
            if !model.defaults.contains_key(key) {
                return Err(KernelError::bad_property(format!(
                    "Synapse model {} has no default {}",
                    model.name, key
                )));
            }
        }
        let id = SynapseModelId::new(self.models.len());
        log::debug!("Registered synapse model {} as {}", model.name, id);
        self.model_index.insert(model.name.clone(), id);
        self.models.push(model);
        Ok(id)
    }

    /// Create `n` neurons
    pub fn create_neurons(&mut self, n: usize) -> Result<NodeCollection> {
        self.create(n, NodeKind::Neuron)
    }

    /// Create `n` devices
    pub fn create_devices(&mut self, n: usize) -> Result<NodeCollection> {
        self.create(n, NodeKind::Device)
    }

    fn create(&mut self, n: usize, kind: NodeKind) -> Result<NodeCollection> {
        let first = NodeId::new(self.nodes.len() as u64 + 1);
        self.nodes.extend(std::iter::repeat(kind).take(n));
        log::debug!("Created {} {:?} nodes starting at {}", n, kind, first);
        NodeCollection::range(first, n)
    }

    /// Kind of an existing node
    pub fn node_kind(&self, id: NodeId) -> Result<NodeKind> {
        id.raw()
            .checked_sub(1)
            .and_then(|idx| self.nodes.get(idx as usize))
            .copied()
            .ok_or(KernelError::UnknownNode { id: id.raw() })
    }

    /// Snapshot of all stored edges, ordered by source, target and model
    pub fn edges(&self) -> Vec<Edge> {
        let mut all: Vec<Edge> = self
            .edges
            .iter()
            .flat_map(|slot| slot.lock().clone())
            .collect();
        all.sort_by_key(|e| (e.source, e.target, e.model));
        all
    }

    /// Stored edges from `source` to `target`
    pub fn connections(&self, source: NodeId, target: NodeId) -> Vec<Edge> {
        self.edges()
            .into_iter()
            .filter(|e| e.source == source && e.target == target)
            .collect()
    }

    /// Number of stored edges
    pub fn num_edges(&self) -> usize {
        self.edges.iter().map(|slot| slot.lock().len()).sum()
    }

    /// Remove all edges
    pub fn clear_edges(&mut self) {
        for slot in &self.edges {
            slot.lock().clear();
        }
    }

    fn model(&self, id: SynapseModelId) -> Result<&SynapseModel> {
        self.models
            .get(id.raw())
            .ok_or(KernelError::UnknownSynapseModel { id: id.raw() })
    }

    fn check_thread(&self, tid: usize) -> Result<()> {
        if tid < self.config.local_num_threads {
            Ok(())
        } else {
            Err(KernelError::UnknownThread {
                thread: tid,
                num_threads: self.config.local_num_threads,
            })
        }
    }

    /// Whether a neuron is materialized on `tid` of this rank
    fn owned_by(&self, id: NodeId, tid: usize) -> bool {
        self.vp_map.is_local_node(id) && self.vp_map.node_to_thread(id) == tid
    }

    /// Edges onto devices are kept by the thread that owns the source
    fn stores_device_edge(&self, source: NodeId, tid: usize) -> Result<bool> {
        Ok(match self.node_kind(source)? {
            NodeKind::Neuron => self.owned_by(source, tid),
            NodeKind::Device => tid == 0,
        })
    }

    fn element_slot(&self, id: NodeId) -> Result<Option<usize>> {
        match self.node_kind(id)? {
            NodeKind::Device => Err(KernelError::bad_property(format!(
                "Device {} has no synaptic elements",
                id
            ))),
            NodeKind::Neuron if self.vp_map.is_local_node(id) => {
                Ok(Some(self.vp_map.node_to_thread(id)))
            }
            NodeKind::Neuron => Ok(None),
        }
    }
}

impl NodeRegistry for MemoryKernel {
    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn vp_map(&self) -> VirtualProcessMap {
        self.vp_map
    }

    fn is_local_node_id(&self, id: NodeId) -> bool {
        match self.node_kind(id) {
            Ok(NodeKind::Device) => true,
            Ok(NodeKind::Neuron) => self.vp_map.is_local_node(id),
            Err(_) => false,
        }
    }

    fn node_or_proxy(&self, id: NodeId, tid: usize) -> Result<NodeHandle> {
        self.check_thread(tid)?;
        Ok(match self.node_kind(id)? {
            NodeKind::Neuron => NodeHandle {
                id,
                thread: self.vp_map.node_to_thread(id),
                is_proxy: !self.owned_by(id, tid),
                has_proxies: true,
            },
            NodeKind::Device => NodeHandle {
                id,
                thread: tid,
                is_proxy: false,
                has_proxies: false,
            },
        })
    }

    fn local_nodes(&self, tid: usize) -> Result<Vec<NodeHandle>> {
        self.check_thread(tid)?;
        let handles = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, kind)| (NodeId::new(idx as u64 + 1), *kind))
            .filter(|&(id, kind)| kind == NodeKind::Device || self.owned_by(id, tid))
            .map(|(id, kind)| NodeHandle {
                id,
                thread: tid,
                is_proxy: false,
                has_proxies: kind == NodeKind::Neuron,
            })
            .collect();
        Ok(handles)
    }

    fn validate_collection(&self, nodes: &NodeCollection) -> Result<()> {
        match nodes.get(nodes.len().saturating_sub(1)) {
            Some(last) if last.raw() as usize > self.nodes.len() => {
                Err(KernelError::invalid_collection(format!(
                    "node {} does not exist (network has {} nodes)",
                    last,
                    self.nodes.len()
                )))
            }
            _ => Ok(()),
        }
    }

    fn connect_synaptic_element(&self, id: NodeId, name: &str, delta: i32) -> Result<()> {
        let slot = self.element_slot(id)?.ok_or_else(|| {
            KernelError::illegal_connection(format!("Node {} is not local to this rank", id))
        })?;
        let mut counters = self.elements[slot].lock();
        *counters.entry((id, name.to_string())).or_insert(0) += i64::from(delta);
        Ok(())
    }

    fn synaptic_elements(&self, id: NodeId, name: &str) -> i64 {
        match self.element_slot(id) {
            Ok(Some(slot)) => self.elements[slot]
                .lock()
                .get(&(id, name.to_string()))
                .copied()
                .unwrap_or(0),
            _ => 0,
        }
    }
}

impl ModelRegistry for MemoryKernel {
    fn synapse_model_id(&self, name: &str) -> Result<SynapseModelId> {
        self.model_index
            .get(name)
            .copied()
            .ok_or_else(|| KernelError::UnknownSynapseType {
                name: name.to_string(),
            })
    }

    fn model_properties(&self, id: SynapseModelId) -> Result<ModelProperties> {
        Ok(self.model(id)?.properties())
    }

    fn connector_defaults(&self, id: SynapseModelId) -> Result<ParamDict> {
        Ok(self.model(id)?.defaults.clone())
    }

    fn check_synapse_params(&self, id: SynapseModelId, names: &[&str]) -> Result<()> {
        let model = self.model(id)?;
        for &name in names {
            if name == WEIGHT && model.homogeneous_weight {
                return Err(KernelError::bad_property(format!(
                    "Weight cannot be specified since it needs to be equal for all connections when {} is used.",
                    model.name
                )));
            }
            if !model.defaults.contains_key(name) {
                return Err(KernelError::bad_property(format!(
                    "{} is not a parameter of synapse model {}",
                    name, model.name
                )));
            }
        }
        Ok(())
    }
}

impl EdgeStore for MemoryKernel {
    fn connect(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        model: SynapseModelId,
        params: &ParamDict,
        values: EdgeValues,
    ) -> Result<()> {
        self.check_thread(tid)?;
        let synapse = self.model(model)?;
        self.node_kind(source)?;
        if target.is_proxy {
            return Err(KernelError::illegal_connection(format!(
                "Cannot store a connection on a proxy of node {}",
                target.id
            )));
        }
        match self.node_kind(target.id)? {
            NodeKind::Neuron if !self.owned_by(target.id, tid) => {
                return Err(KernelError::illegal_connection(format!(
                    "Node {} is not owned by thread {}",
                    target.id, tid
                )));
            }
            NodeKind::Device if !self.stores_device_edge(source, tid)? => return Ok(()),
            _ => {}
        }

        let default = |key: &str| synapse.defaults.get(key).map(ParamScalar::as_f64).unwrap_or(0.0);
        let weight = values.weight().unwrap_or_else(|| default(WEIGHT));
        let delay = values.delay().unwrap_or_else(|| default(DELAY));

        if !weight.is_finite() {
            return Err(KernelError::bad_property(format!("Weight {} is not finite", weight)));
        }
        if delay < self.config.resolution_ms - f64::EPSILON || !delay.is_finite() {
            return Err(KernelError::bad_property(format!(
                "Delay must be greater than or equal to resolution ({} ms), got {}",
                self.config.resolution_ms, delay
            )));
        }

        let mut edge_params: ParamDict = synapse
            .defaults
            .iter()
            .filter(|(key, _)| key.as_str() != WEIGHT && key.as_str() != DELAY)
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        for (key, value) in params {
            edge_params.insert(key.clone(), *value);
        }

        self.edges[tid].lock().push(Edge {
            source,
            target: target.id,
            model,
            weight,
            delay,
            params: edge_params,
            thread: tid,
        });
        Ok(())
    }

    fn check_edge(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        model: SynapseModelId,
    ) -> Result<()> {
        self.check_thread(tid)?;
        let synapse = self.model(model)?;
        if self.node_kind(target.id)? == NodeKind::Device && !self.stores_device_edge(source, tid)? {
            return Ok(());
        }
        let edges = self.edges[tid].lock();
        if edges
            .iter()
            .any(|e| e.source == source && e.target == target.id && e.model == model)
        {
            Ok(())
        } else {
            Err(KernelError::InexistentConnection {
                source_id: source.raw(),
                target_id: target.id.raw(),
                model: synapse.name.clone(),
            })
        }
    }

    fn disconnect(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        model: SynapseModelId,
    ) -> Result<()> {
        self.check_thread(tid)?;
        let synapse = self.model(model)?;
        if self.node_kind(target.id)? == NodeKind::Device && !self.stores_device_edge(source, tid)? {
            return Ok(());
        }
        let mut edges = self.edges[tid].lock();
        match edges
            .iter()
            .position(|e| e.source == source && e.target == target.id && e.model == model)
        {
            Some(idx) => {
                edges.remove(idx);
                Ok(())
            }
            None => Err(KernelError::InexistentConnection {
                source_id: source.raw(),
                target_id: target.id.raw(),
                model: synapse.name.clone(),
            }),
        }
    }
}

impl Kernel for MemoryKernel {
    fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn rngs(&self) -> &RngManager {
        &self.rngs
    }
}
